//! HTTP implementation of [`TagStore`] against the review API.
//!
//! Requests are blocking, single-attempt, and scoped to the session's review
//! through the `review_id` query parameter.

use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{StoreError, TagStore};
use crate::config::SessionConfig;
use crate::models::{MoveTag, NewTag, ParentTarget, Tag, TagCount, TagId, TagPatch};

/// Longest rejection body kept in [`StoreError::Rejected`].
const MAX_ERROR_BODY: usize = 200;

/// Builder for constructing [`HttpTagStore`] instances.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sysrev::{HttpTagStoreBuilder, ReviewId, SessionConfig};
///
/// let config = SessionConfig::new("http://localhost:8000", ReviewId::new(1));
/// let store = HttpTagStoreBuilder::new(config)
///     .timeout(Duration::from_secs(10))
///     .build()
///     .expect("Failed to create store");
/// assert_eq!(store.config().review_id(), ReviewId::new(1));
/// ```
#[derive(Debug)]
pub struct HttpTagStoreBuilder {
    config: SessionConfig,
    timeout: Duration,
    connect_timeout: Duration,
}

impl HttpTagStoreBuilder {
    /// Creates a builder with the default timeouts (30s request, 5s connect).
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the total request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidUrl`] if the configured base URL does not
    /// parse, or [`StoreError::Network`] if the HTTP client cannot be created.
    pub fn build(self) -> Result<HttpTagStore, StoreError> {
        let base_url = self.config.base_url();
        reqwest::Url::parse(base_url)
            .map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(StoreError::Network)?;

        Ok(HttpTagStore {
            client,
            config: self.config,
        })
    }
}

/// Blocking HTTP client for the `/api/tags/` endpoints.
pub struct HttpTagStore {
    client: Client,
    config: SessionConfig,
}

impl HttpTagStore {
    /// Returns the session this store is bound to.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Builds the URL for a path below `/api/tags/`.
    ///
    /// `path` is either empty (the collection) or ends with a slash.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/api/tags/{}", self.config.base_url(), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        tracing::debug!(%method, %url, review = %self.config.review_id(), "tag store request");

        let mut request = self
            .client
            .request(method, url)
            .query(&[("review_id", self.config.review_id().get())]);
        if let Some(token) = self.config.token() {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }
        request
    }

    /// Sends a request and turns non-2xx answers into rejections.
    fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(e)
            } else {
                StoreError::Network(e)
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = summarize_body(&body, status.canonical_reason().unwrap_or("error"));
        tracing::warn!(status = status.as_u16(), %message, "tag store rejected request");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self.send(request)?;
        let body = response.text().map_err(StoreError::Network)?;
        serde_json::from_str(&body).map_err(StoreError::Decode)
    }
}

/// Trims a rejection body to something fit for a notification.
fn summarize_body(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

impl TagStore for HttpTagStore {
    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.send_json(self.request(Method::GET, ""))
    }

    fn create_tag(&self, name: &str, parent: ParentTarget) -> Result<Tag, StoreError> {
        let body = NewTag::new(name, parent);
        self.send_json(self.request(Method::POST, "").json(&body))
    }

    fn delete_tag(&self, id: TagId) -> Result<(), StoreError> {
        // 204 No Content: there is no body to decode.
        self.send(self.request(Method::DELETE, &format!("{id}/")))?;
        Ok(())
    }

    fn move_tag(&self, id: TagId, new_parent: ParentTarget) -> Result<Tag, StoreError> {
        let body = MoveTag::new(id, new_parent);
        self.send_json(self.request(Method::PUT, "").json(&body))
    }

    fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, StoreError> {
        let body = TagPatch::Name(name.to_string());
        self.send_json(self.request(Method::PATCH, &format!("{id}/")).json(&body))
    }

    fn set_description(&self, id: TagId, description: &str) -> Result<Tag, StoreError> {
        let body = TagPatch::Description(description.to_string());
        self.send_json(self.request(Method::PATCH, &format!("{id}/")).json(&body))
    }

    fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        self.send_json(self.request(Method::GET, "count/"))
    }
}
