use serde::Serialize;

use super::{ParentTarget, TagId};

/// Label given to tags created from the tree toolbar.
pub const DEFAULT_TAG_NAME: &str = "New Tag";

/// Maximum number of characters accepted by the name editor.
pub const NAME_MAX_CHARS: usize = 45;

/// Body of `POST /api/tags/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTag {
    pub name: String,
    pub description: String,
    pub parent_tag: Option<TagId>,
}

impl NewTag {
    /// Creates a request for a tag with an empty description under `parent`.
    pub fn new(name: impl Into<String>, parent: ParentTarget) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parent_tag: parent.as_wire(),
        }
    }
}

/// Body of `PUT /api/tags/`, re-parenting tag `id`.
///
/// `parent_tag` serializes as `null` when the target is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveTag {
    pub id: TagId,
    pub parent_tag: Option<TagId>,
}

impl MoveTag {
    pub fn new(id: TagId, target: ParentTarget) -> Self {
        Self {
            id,
            parent_tag: target.as_wire(),
        }
    }
}

/// Body of `PATCH /api/tags/{id}/`; exactly one field is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagPatch {
    Name(String),
    Description(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_tag_at_root_sends_null_parent() {
        let body = serde_json::to_value(NewTag::new(DEFAULT_TAG_NAME, ParentTarget::Root)).unwrap();
        assert_eq!(
            body,
            json!({"name": "New Tag", "description": "", "parent_tag": null})
        );
    }

    #[test]
    fn move_to_sentinel_root_sends_null_parent() {
        let body =
            serde_json::to_value(MoveTag::new(TagId::new(5), ParentTarget::from_raw(0))).unwrap();
        assert_eq!(body, json!({"id": 5, "parent_tag": null}));
    }

    #[test]
    fn move_under_tag_sends_numeric_parent() {
        let body = serde_json::to_value(MoveTag::new(
            TagId::new(5),
            ParentTarget::Tag(TagId::new(2)),
        ))
        .unwrap();
        assert_eq!(body, json!({"id": 5, "parent_tag": 2}));
    }

    #[test]
    fn patch_carries_a_single_field() {
        assert_eq!(
            serde_json::to_value(TagPatch::Name("Cohort".into())).unwrap(),
            json!({"name": "Cohort"})
        );
        assert_eq!(
            serde_json::to_value(TagPatch::Description(String::new())).unwrap(),
            json!({"description": ""})
        );
    }
}
