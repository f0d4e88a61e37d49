//! Remote tag store: the typed operations the tree controller relies on.
//!
//! [`HttpTagStore`] talks to the review API over JSON/HTTP. [`LocalTagStore`]
//! keeps the same contract on top of SQLite for offline use and tests.
//! Every operation is a single attempt; nothing here touches local tree
//! state.

mod http;
mod local;

use thiserror::Error;

use crate::models::{ParentTarget, Tag, TagCount, TagId};

pub use http::{HttpTagStore, HttpTagStoreBuilder};
pub use local::LocalTagStore;

/// Errors that can occur when talking to a tag store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request could not be sent or the connection failed.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request did not complete before the client deadline.
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Server rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The configured base URL is not usable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The local SQLite store failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Returns `true` for a reachable server refusing the request, as opposed
    /// to a transport or decoding failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, StoreError::Rejected { .. })
    }

    /// Returns the HTTP status of a rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn not_found(id: TagId) -> Self {
        StoreError::Rejected {
            status: 404,
            message: format!("tag {id} does not exist"),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        StoreError::Rejected {
            status: 400,
            message: message.into(),
        }
    }
}

/// Operations on a review's tag collection.
///
/// This trait enables swapping the HTTP client for the local store or a
/// test double.
pub trait TagStore {
    /// Fetches the whole forest: root tags with nested children.
    fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;

    /// Creates a tag named `name` under `parent`, returning the stored record.
    fn create_tag(&self, name: &str, parent: ParentTarget) -> Result<Tag, StoreError>;

    /// Deletes a tag and, by contract, its whole subtree.
    fn delete_tag(&self, id: TagId) -> Result<(), StoreError>;

    /// Re-parents `id` under `new_parent`.
    fn move_tag(&self, id: TagId, new_parent: ParentTarget) -> Result<Tag, StoreError>;

    /// Updates only the tag's name.
    fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, StoreError>;

    /// Updates only the tag's description.
    fn set_description(&self, id: TagId, description: &str) -> Result<Tag, StoreError>;

    /// Fetches how many studies use each tag.
    fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError>;
}

impl<T: TagStore + ?Sized> TagStore for Box<T> {
    fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        (**self).list_tags()
    }

    fn create_tag(&self, name: &str, parent: ParentTarget) -> Result<Tag, StoreError> {
        (**self).create_tag(name, parent)
    }

    fn delete_tag(&self, id: TagId) -> Result<(), StoreError> {
        (**self).delete_tag(id)
    }

    fn move_tag(&self, id: TagId, new_parent: ParentTarget) -> Result<Tag, StoreError> {
        (**self).move_tag(id, new_parent)
    }

    fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, StoreError> {
        (**self).rename_tag(id, name)
    }

    fn set_description(&self, id: TagId, description: &str) -> Result<Tag, StoreError> {
        (**self).set_description(id, description)
    }

    fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
        (**self).tag_counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn rejection_reports_status() {
        let err = StoreError::Rejected {
            status: 409,
            message: "conflict".into(),
        };

        assert!(err.is_rejection());
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn network_error_is_not_a_rejection() {
        let reqwest_error = reqwest::blocking::Client::new()
            .get("not-a-valid-url")
            .build()
            .unwrap_err();
        let err = StoreError::Network(reqwest_error);

        assert!(!err.is_rejection());
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("Network error"));
    }

    #[test]
    fn decode_error_chains_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::Decode(json_error);
        assert!(err.source().is_some());
    }

    #[test]
    fn not_found_helper_is_a_404_rejection() {
        let err = StoreError::not_found(TagId::new(8));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("tag 8"));
    }

    #[test]
    fn trait_can_be_implemented_by_mock_struct() {
        struct EmptyStore;

        impl TagStore for EmptyStore {
            fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
                Ok(Vec::new())
            }
            fn create_tag(&self, name: &str, _: ParentTarget) -> Result<Tag, StoreError> {
                Ok(Tag::new(TagId::new(1), name))
            }
            fn delete_tag(&self, id: TagId) -> Result<(), StoreError> {
                Err(StoreError::not_found(id))
            }
            fn move_tag(&self, id: TagId, _: ParentTarget) -> Result<Tag, StoreError> {
                Err(StoreError::not_found(id))
            }
            fn rename_tag(&self, id: TagId, _: &str) -> Result<Tag, StoreError> {
                Err(StoreError::not_found(id))
            }
            fn set_description(&self, id: TagId, _: &str) -> Result<Tag, StoreError> {
                Err(StoreError::not_found(id))
            }
            fn tag_counts(&self) -> Result<Vec<TagCount>, StoreError> {
                Ok(Vec::new())
            }
        }

        let boxed: Box<dyn TagStore> = Box::new(EmptyStore);
        assert!(boxed.list_tags().unwrap().is_empty());
        assert_eq!(
            boxed.create_tag("A", ParentTarget::Root).unwrap().name(),
            "A"
        );
        assert!(boxed.delete_tag(TagId::new(3)).unwrap_err().is_rejection());
    }
}
