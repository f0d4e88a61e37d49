use serde::{Deserialize, Serialize};

use super::{ParentTarget, TagId};

/// Placeholder shown in place of an empty description.
pub const DESCRIPTION_PLACEHOLDER: &str = "Create a description for this tag";

/// A node of the review's tag taxonomy as returned by the tag endpoint.
///
/// Tags arrive as a forest: the list endpoint returns the root tags and each
/// node carries its subtree in `children`. `parent_tag` is `None` for roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parent_tag: Option<TagId>,
    #[serde(default)]
    children: Vec<Tag>,
}

impl Tag {
    /// Creates a new root tag with no description and no children.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "Methods");
    /// assert_eq!(tag.id(), TagId::new(1));
    /// assert_eq!(tag.name(), "Methods");
    /// assert!(tag.parent_tag().is_none());
    /// assert!(tag.children().is_empty());
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            parent_tag: None,
            children: Vec::new(),
        }
    }

    /// Sets the description, returning the tag for chaining.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the parent reference, returning the tag for chaining.
    pub fn with_parent(mut self, parent: TagId) -> Self {
        self.parent_tag = Some(parent);
        self
    }

    /// Appends `child` to this tag's children, fixing up its parent reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{Tag, TagId};
    ///
    /// let root = Tag::new(TagId::new(1), "Design")
    ///     .with_child(Tag::new(TagId::new(2), "RCT"));
    /// assert_eq!(root.children()[0].parent_tag(), Some(TagId::new(1)));
    /// ```
    pub fn with_child(mut self, child: Tag) -> Self {
        self.children.push(child.with_parent(self.id));
        self
    }

    /// Returns the tag's unique identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the tag's label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, treating an empty string as absent.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    /// Returns the description as shown to users, falling back to a placeholder.
    pub fn display_description(&self) -> &str {
        self.description().unwrap_or(DESCRIPTION_PLACEHOLDER)
    }

    /// Returns the parent tag reference, `None` for roots.
    ///
    /// A wire `parent_tag` of `0` is the root sentinel and reads as `None`.
    pub fn parent_tag(&self) -> Option<TagId> {
        self.parent_tag
            .filter(|parent| parent.get() != ParentTarget::ROOT_SENTINEL)
    }

    /// Returns the direct children in display order.
    pub fn children(&self) -> &[Tag] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.children
    }

    /// Replaces the label in place.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replaces the description in place.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }
}

/// Number of studies currently classified under a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub id: TagId,
    pub study_count: u64,
}
