use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tag.
///
/// Wraps the server-assigned integer ID to provide type safety and prevent
/// accidental mixing with review IDs or raw drop-target values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(i64);

impl TagId {
    /// Creates a new tag ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of the systematic review a tag taxonomy belongs to.
///
/// Every tag endpoint is scoped by this value through the `review_id`
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(i64);

impl ReviewId {
    /// Creates a new review ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying ID value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a moved or created tag should be attached.
///
/// Tree widgets report "no parent" with the sentinel value `0`; that value is
/// normalized to [`ParentTarget::Root`] here so it can never reach the wire
/// as a real parent ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentTarget {
    /// Attach at the top level of the forest.
    Root,
    /// Attach as a child of the given tag.
    Tag(TagId),
}

impl ParentTarget {
    /// Sentinel used by drag-and-drop targets to denote the root.
    pub const ROOT_SENTINEL: i64 = 0;

    /// Normalizes a raw drop-target value, mapping the sentinel to `Root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{ParentTarget, TagId};
    ///
    /// assert_eq!(ParentTarget::from_raw(0), ParentTarget::Root);
    /// assert_eq!(ParentTarget::from_raw(7), ParentTarget::Tag(TagId::new(7)));
    /// ```
    pub fn from_raw(raw: i64) -> Self {
        if raw == Self::ROOT_SENTINEL {
            ParentTarget::Root
        } else {
            ParentTarget::Tag(TagId::new(raw))
        }
    }

    /// Returns the value transmitted as `parent_tag`: `None` for the root.
    pub fn as_wire(self) -> Option<TagId> {
        match self {
            ParentTarget::Root => None,
            ParentTarget::Tag(id) => Some(id),
        }
    }
}

impl From<Option<TagId>> for ParentTarget {
    fn from(parent: Option<TagId>) -> Self {
        match parent {
            Some(id) if id.get() != Self::ROOT_SENTINEL => ParentTarget::Tag(id),
            _ => ParentTarget::Root,
        }
    }
}

impl fmt::Display for ParentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentTarget::Root => write!(f, "root"),
            ParentTarget::Tag(id) => write!(f, "{id}"),
        }
    }
}
