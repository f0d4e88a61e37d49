//! In-memory model of a review's tag forest.
//!
//! The tree is never patched structurally: [`TagTree::load`] swaps in a freshly
//! fetched forest after every successful mutation. Everything else is a
//! read-only query, including the move guard that keeps a tag from being
//! re-parented under its own subtree.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{ParentTarget, Tag, TagId};

/// Structural problems detected in a forest or in a requested edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The same ID appears more than once in a fetched forest.
    #[error("tag {0} appears more than once in the tree")]
    DuplicateId(TagId),

    /// A node's `parent_tag` disagrees with the node it is nested under.
    #[error("tag {tag} is nested under {expected} but claims parent {found}")]
    ParentMismatch {
        tag: TagId,
        expected: ParentTarget,
        found: ParentTarget,
    },

    /// The referenced tag is not part of the current tree.
    #[error("tag {0} does not exist")]
    UnknownTag(TagId),

    /// A tag cannot become its own parent.
    #[error("tag {0} cannot be moved under itself")]
    SelfParent(TagId),

    /// The target parent lies inside the moved tag's subtree.
    #[error("moving tag {tag} under {target} would create a cycle")]
    WouldCycle { tag: TagId, target: TagId },
}

/// The last-fetched tag forest plus a parent index for ancestry queries.
#[derive(Debug, Clone, Default)]
pub struct TagTree {
    roots: Vec<Tag>,
    parents: HashMap<TagId, Option<TagId>>,
}

impl TagTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from a fetched forest.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] if the forest is not well formed.
    pub fn from_forest(forest: Vec<Tag>) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        tree.load(forest)?;
        Ok(tree)
    }

    /// Replaces the whole tree with `forest`.
    ///
    /// The forest is validated first: IDs must be unique and every nested
    /// node's `parent_tag`, when present, must name the node containing it.
    /// On error the current tree is left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{Tag, TagId, TagTree};
    ///
    /// let mut tree = TagTree::new();
    /// tree.load(vec![Tag::new(TagId::new(1), "Design")
    ///     .with_child(Tag::new(TagId::new(2), "RCT"))])
    ///     .unwrap();
    ///
    /// assert_eq!(tree.len(), 2);
    /// assert!(tree.is_descendant_of(TagId::new(2), TagId::new(1)));
    /// ```
    pub fn load(&mut self, forest: Vec<Tag>) -> Result<(), TreeError> {
        let mut parents = HashMap::new();
        for root in &forest {
            index_subtree(root, None, &mut parents)?;
        }

        self.roots = forest;
        self.parents = parents;
        Ok(())
    }

    /// Returns the root tags in display order.
    pub fn roots(&self) -> &[Tag] {
        &self.roots
    }

    /// Returns the number of tags in the forest.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns `true` if the forest has no tags.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns `true` if a tag with `id` is present.
    pub fn contains(&self, id: TagId) -> bool {
        self.parents.contains_key(&id)
    }

    /// Depth-first search for the tag with `id`.
    pub fn find_by_id(&self, id: TagId) -> Option<&Tag> {
        if !self.contains(id) {
            return None;
        }
        find_in(&self.roots, id)
    }

    pub(crate) fn find_by_id_mut(&mut self, id: TagId) -> Option<&mut Tag> {
        if !self.contains(id) {
            return None;
        }
        find_in_mut(&mut self.roots, id)
    }

    /// Returns where `id` is attached, or `None` if the tag is unknown.
    pub fn parent_of(&self, id: TagId) -> Option<ParentTarget> {
        self.parents.get(&id).map(|parent| ParentTarget::from(*parent))
    }

    /// Returns the ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: TagId) -> Vec<TagId> {
        let mut chain = Vec::new();
        let mut current = self.parents.get(&id).copied().flatten();
        while let Some(parent) = current {
            chain.push(parent);
            current = self.parents.get(&parent).copied().flatten();
        }
        chain
    }

    /// Returns `true` if `node` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, node: TagId, ancestor: TagId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    /// Returns `id` and every tag below it, in depth-first order.
    pub fn subtree_ids(&self, id: TagId) -> Vec<TagId> {
        self.find_by_id(id)
            .map(|tag| {
                let mut ids = Vec::new();
                collect_ids(tag, &mut ids);
                ids
            })
            .unwrap_or_default()
    }

    /// Checks that `target` can receive a new child.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UnknownTag`] if the target tag is not in the tree.
    pub fn check_parent(&self, target: ParentTarget) -> Result<(), TreeError> {
        match target {
            ParentTarget::Root => Ok(()),
            ParentTarget::Tag(id) if self.contains(id) => Ok(()),
            ParentTarget::Tag(id) => Err(TreeError::UnknownTag(id)),
        }
    }

    /// Checks that re-parenting `tag` under `target` keeps the forest acyclic.
    ///
    /// # Errors
    ///
    /// - [`TreeError::UnknownTag`] if either tag is missing
    /// - [`TreeError::SelfParent`] if `target` is `tag` itself
    /// - [`TreeError::WouldCycle`] if `target` is a descendant of `tag`
    pub fn check_move(&self, tag: TagId, target: ParentTarget) -> Result<(), TreeError> {
        if !self.contains(tag) {
            return Err(TreeError::UnknownTag(tag));
        }
        self.check_parent(target)?;

        if let ParentTarget::Tag(target) = target {
            if target == tag {
                return Err(TreeError::SelfParent(tag));
            }
            if self.is_descendant_of(target, tag) {
                return Err(TreeError::WouldCycle { tag, target });
            }
        }
        Ok(())
    }

    /// Iterates every tag depth-first, yielding `(depth, tag)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Tag)> {
        self.visible(|_| true).into_iter()
    }

    /// Flattens the forest into display rows, descending only into tags for
    /// which `is_open` returns `true`.
    pub fn visible(&self, is_open: impl Fn(TagId) -> bool) -> Vec<(usize, &Tag)> {
        let mut rows = Vec::with_capacity(self.len());
        let mut stack: Vec<(usize, &Tag)> = self.roots.iter().rev().map(|t| (0, t)).collect();

        while let Some((depth, tag)) = stack.pop() {
            rows.push((depth, tag));
            if is_open(tag.id()) {
                stack.extend(tag.children().iter().rev().map(|c| (depth + 1, c)));
            }
        }
        rows
    }

    /// Returns the set of all tag IDs.
    pub fn ids(&self) -> HashSet<TagId> {
        self.parents.keys().copied().collect()
    }
}

fn index_subtree(
    tag: &Tag,
    parent: Option<TagId>,
    parents: &mut HashMap<TagId, Option<TagId>>,
) -> Result<(), TreeError> {
    // A missing parent_tag is accepted anywhere; null and 0 both name the root.
    if let Some(claimed) = tag.parent_tag() {
        let expected = ParentTarget::from(parent);
        let found = ParentTarget::Tag(claimed);
        if found != expected {
            return Err(TreeError::ParentMismatch {
                tag: tag.id(),
                expected,
                found,
            });
        }
    }

    if parents.insert(tag.id(), parent).is_some() {
        return Err(TreeError::DuplicateId(tag.id()));
    }

    for child in tag.children() {
        index_subtree(child, Some(tag.id()), parents)?;
    }
    Ok(())
}

fn find_in(tags: &[Tag], id: TagId) -> Option<&Tag> {
    for tag in tags {
        if tag.id() == id {
            return Some(tag);
        }
        if let Some(found) = find_in(tag.children(), id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut(tags: &mut [Tag], id: TagId) -> Option<&mut Tag> {
    for tag in tags {
        if tag.id() == id {
            return Some(tag);
        }
        if let Some(found) = find_in_mut(tag.children_mut(), id) {
            return Some(found);
        }
    }
    None
}

fn collect_ids(tag: &Tag, ids: &mut Vec<TagId>) {
    ids.push(tag.id());
    for child in tag.children() {
        collect_ids(child, ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: i64) -> TagId {
        TagId::new(n)
    }

    /// 1 Design
    /// ├── 2 RCT
    /// │   └── 4 Crossover
    /// └── 3 Cohort
    /// 5 Outcome
    fn sample() -> TagTree {
        TagTree::from_forest(vec![
            Tag::new(id(1), "Design")
                .with_child(Tag::new(id(2), "RCT").with_child(Tag::new(id(4), "Crossover")))
                .with_child(Tag::new(id(3), "Cohort")),
            Tag::new(id(5), "Outcome"),
        ])
        .unwrap()
    }

    #[test]
    fn load_indexes_every_node() {
        let tree = sample();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.roots().len(), 2);
        assert!(tree.contains(id(4)));
        assert!(!tree.contains(id(9)));
    }

    #[test]
    fn empty_forest_is_valid() {
        let tree = TagTree::from_forest(Vec::new()).unwrap();
        assert!(tree.is_empty());
        assert!(tree.iter().next().is_none());
    }

    #[test]
    fn find_by_id_searches_nested_levels() {
        let tree = sample();
        assert_eq!(tree.find_by_id(id(4)).map(Tag::name), Some("Crossover"));
        assert_eq!(tree.find_by_id(id(5)).map(Tag::name), Some("Outcome"));
        assert!(tree.find_by_id(id(42)).is_none());
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let tree = sample();
        assert_eq!(tree.ancestors(id(4)), vec![id(2), id(1)]);
        assert!(tree.ancestors(id(1)).is_empty());
        assert_eq!(tree.parent_of(id(4)), Some(ParentTarget::Tag(id(2))));
        assert_eq!(tree.parent_of(id(5)), Some(ParentTarget::Root));
        assert_eq!(tree.parent_of(id(42)), None);
    }

    #[test]
    fn descendant_check_is_strict() {
        let tree = sample();
        assert!(tree.is_descendant_of(id(4), id(1)));
        assert!(!tree.is_descendant_of(id(1), id(1)));
        assert!(!tree.is_descendant_of(id(1), id(4)));
        assert!(!tree.is_descendant_of(id(5), id(1)));
    }

    #[test]
    fn subtree_ids_include_the_node_itself() {
        let tree = sample();
        assert_eq!(tree.subtree_ids(id(1)), vec![id(1), id(2), id(4), id(3)]);
        assert_eq!(tree.subtree_ids(id(5)), vec![id(5)]);
        assert!(tree.subtree_ids(id(42)).is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected_and_old_tree_kept() {
        let mut tree = sample();
        let result = tree.load(vec![
            Tag::new(id(1), "A"),
            Tag::new(id(2), "B").with_child(Tag::new(id(1), "A again")),
        ]);

        assert_eq!(result, Err(TreeError::DuplicateId(id(1))));
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.find_by_id(id(3)).map(Tag::name), Some("Cohort"));
    }

    #[test]
    fn mismatched_parent_reference_is_rejected() {
        let bad_child = Tag::new(id(2), "RCT").with_parent(id(7));
        let mut parent = Tag::new(id(1), "Design");
        parent.children_mut().push(bad_child);

        let result = TagTree::from_forest(vec![parent]);

        assert_eq!(
            result.unwrap_err(),
            TreeError::ParentMismatch {
                tag: id(2),
                expected: ParentTarget::Tag(id(1)),
                found: ParentTarget::Tag(id(7)),
            }
        );
    }

    #[test]
    fn root_claiming_a_parent_is_rejected() {
        let result = TagTree::from_forest(vec![Tag::new(id(2), "Orphan").with_parent(id(1))]);
        assert!(matches!(result, Err(TreeError::ParentMismatch { .. })));
    }

    #[test]
    fn root_with_zero_parent_loads_as_root() {
        let forest: Vec<Tag> = serde_json::from_str(
            r#"[{"id": 1, "name": "Design", "description": "", "parent_tag": 0, "children": [
                {"id": 2, "name": "RCT", "parent_tag": 1, "children": []}
            ]}]"#,
        )
        .unwrap();

        let tree = TagTree::from_forest(forest).unwrap();

        assert_eq!(tree.parent_of(id(1)), Some(ParentTarget::Root));
        assert_eq!(tree.parent_of(id(2)), Some(ParentTarget::Tag(id(1))));
        assert_eq!(tree.find_by_id(id(1)).and_then(Tag::parent_tag), None);
    }

    #[test]
    fn move_onto_descendant_would_cycle() {
        let tree = sample();
        assert_eq!(
            tree.check_move(id(1), ParentTarget::Tag(id(4))),
            Err(TreeError::WouldCycle {
                tag: id(1),
                target: id(4)
            })
        );
    }

    #[test]
    fn move_onto_self_is_rejected() {
        let tree = sample();
        assert_eq!(
            tree.check_move(id(2), ParentTarget::Tag(id(2))),
            Err(TreeError::SelfParent(id(2)))
        );
    }

    #[test]
    fn move_of_unknown_tag_or_to_unknown_parent_is_rejected() {
        let tree = sample();
        assert_eq!(
            tree.check_move(id(9), ParentTarget::Root),
            Err(TreeError::UnknownTag(id(9)))
        );
        assert_eq!(
            tree.check_move(id(2), ParentTarget::Tag(id(9))),
            Err(TreeError::UnknownTag(id(9)))
        );
    }

    #[test]
    fn legal_moves_pass_the_guard() {
        let tree = sample();
        assert!(tree.check_move(id(4), ParentTarget::Root).is_ok());
        assert!(tree.check_move(id(2), ParentTarget::Tag(id(5))).is_ok());
        assert!(tree.check_move(id(4), ParentTarget::Tag(id(3))).is_ok());
        // Ancestor onto an unrelated branch is fine; only descendants are forbidden.
        assert!(tree.check_move(id(1), ParentTarget::Tag(id(5))).is_ok());
    }

    #[test]
    fn visible_rows_respect_collapsed_nodes() {
        let tree = sample();

        let all: Vec<(usize, i64)> = tree.iter().map(|(d, t)| (d, t.id().get())).collect();
        assert_eq!(all, vec![(0, 1), (1, 2), (2, 4), (1, 3), (0, 5)]);

        let only_root_open: Vec<i64> = tree
            .visible(|tag| tag == id(1))
            .into_iter()
            .map(|(_, t)| t.id().get())
            .collect();
        assert_eq!(only_root_open, vec![1, 2, 3, 5]);
    }

    #[test]
    fn find_by_id_mut_patches_nested_node() {
        let mut tree = sample();
        tree.find_by_id_mut(id(4)).unwrap().set_name("Cross-over");
        assert_eq!(tree.find_by_id(id(4)).map(Tag::name), Some("Cross-over"));
    }
}
