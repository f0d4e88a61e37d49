//! Session configuration for talking to the review API.
//!
//! A [`SessionConfig`] is built once per session and handed to the store
//! constructor, so several reviews can be open side by side without any
//! process-wide state.

use thiserror::Error;

use crate::models::ReviewId;

/// Environment variable holding the API base URL.
pub const API_URL_VAR: &str = "SYSREV_API_URL";
/// Environment variable holding the active review ID.
pub const REVIEW_ID_VAR: &str = "SYSREV_REVIEW_ID";
/// Environment variable holding the API token.
pub const TOKEN_VAR: &str = "SYSREV_TOKEN";

/// Base URL used when neither the builder nor the environment provides one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Errors raised while assembling a [`SessionConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no review selected: pass --review or set {REVIEW_ID_VAR}")]
    MissingReviewId,

    #[error("invalid review id: {0}")]
    InvalidReviewId(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Connection details for one review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    base_url: String,
    review_id: ReviewId,
    token: Option<String>,
}

impl SessionConfig {
    /// Creates a config without an auth token.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{ReviewId, SessionConfig};
    ///
    /// let config = SessionConfig::new("http://localhost:8000/", ReviewId::new(2));
    /// assert_eq!(config.base_url(), "http://localhost:8000");
    /// assert_eq!(config.review_id(), ReviewId::new(2));
    /// ```
    pub fn new(base_url: impl Into<String>, review_id: ReviewId) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            review_id,
            token: None,
        }
    }

    /// Attaches an API token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the review the session is scoped to.
    pub fn review_id(&self) -> ReviewId {
        self.review_id
    }

    /// Returns the API token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Builder for [`SessionConfig`] with environment fallback.
///
/// Each setting is resolved as: builder value, then environment variable,
/// then default. The review ID has no default.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    base_url: Option<String>,
    review_id: Option<i64>,
    token: Option<String>,
}

impl SessionConfigBuilder {
    /// Creates a builder with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API base URL (e.g. "http://127.0.0.1:8000").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the review ID.
    pub fn review_id(mut self, id: i64) -> Self {
        self.review_id = Some(id);
        self
    }

    /// Sets the API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Resolves every setting and validates the URL.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingReviewId`] if no review ID was given anywhere
    /// - [`ConfigError::InvalidReviewId`] if the environment value is not an integer
    /// - [`ConfigError::InvalidUrl`] if the base URL does not parse
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(API_URL_VAR).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        reqwest::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?;

        let review_id = match self.review_id {
            Some(id) => id,
            None => {
                let raw = std::env::var(REVIEW_ID_VAR).map_err(|_| ConfigError::MissingReviewId)?;
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::InvalidReviewId(raw.clone()))?
            }
        };

        let token = self
            .token
            .or_else(|| std::env::var(TOKEN_VAR).ok())
            .filter(|t| !t.trim().is_empty());

        let mut config = SessionConfig::new(base_url, ReviewId::new(review_id));
        config.token = token;
        Ok(config)
    }
}
