//! Selection and inline-edit state for the tag tree.
//!
//! Selection is held by ID, never by node reference, so it survives a tree
//! reload as long as the tag still exists. Only one field can be edited at a
//! time: [`EditState`] makes that structural.

use std::collections::HashSet;

use crate::models::{NAME_MAX_CHARS, TagId};
use crate::tree::TagTree;

/// Field of the selected tag that can be edited inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Name,
    Description,
}

/// Inline editor state for the selected tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    /// No editor open.
    #[default]
    Viewing,
    /// Name editor open with its pending buffer.
    EditingName(String),
    /// Description editor open with its pending buffer.
    EditingDescription(String),
}

impl EditState {
    /// Returns the field being edited, if any.
    pub fn field(&self) -> Option<EditField> {
        match self {
            EditState::Viewing => None,
            EditState::EditingName(_) => Some(EditField::Name),
            EditState::EditingDescription(_) => Some(EditField::Description),
        }
    }

    /// Returns the pending buffer, if an editor is open.
    pub fn buffer(&self) -> Option<&str> {
        match self {
            EditState::Viewing => None,
            EditState::EditingName(buf) | EditState::EditingDescription(buf) => Some(buf),
        }
    }

    /// Returns `true` if an editor is open.
    pub fn is_editing(&self) -> bool {
        !matches!(self, EditState::Viewing)
    }

    fn buffer_mut(&mut self) -> Option<&mut String> {
        match self {
            EditState::Viewing => None,
            EditState::EditingName(buf) | EditState::EditingDescription(buf) => Some(buf),
        }
    }
}

/// Which tag is selected, which editor is open, and which nodes are expanded.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<TagId>,
    edit: EditState,
    expanded: HashSet<TagId>,
}

impl Selection {
    /// Creates an empty selection with every node collapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the selected tag ID.
    pub fn selected(&self) -> Option<TagId> {
        self.selected
    }

    /// Returns `true` if `id` is the selected tag.
    pub fn is_selected(&self, id: TagId) -> bool {
        self.selected == Some(id)
    }

    /// Returns the current editor state.
    pub fn edit_state(&self) -> &EditState {
        &self.edit
    }

    /// Handles a click on a node row.
    ///
    /// Clicking the selected node deselects it; clicking any other node
    /// selects it. Either way an open editor is closed without saving, so
    /// callers that want blur-to-save must commit first.
    ///
    /// Returns the selection after the click.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::{Selection, TagId};
    ///
    /// let mut selection = Selection::new();
    /// assert_eq!(selection.click(TagId::new(3)), Some(TagId::new(3)));
    /// assert_eq!(selection.click(TagId::new(3)), None);
    /// ```
    pub fn click(&mut self, id: TagId) -> Option<TagId> {
        if self.selected == Some(id) {
            self.clear();
        } else {
            self.select(id);
        }
        self.selected
    }

    /// Selects `id` unconditionally.
    pub fn select(&mut self, id: TagId) {
        if self.selected != Some(id) {
            self.edit = EditState::Viewing;
        }
        self.selected = Some(id);
    }

    /// Clears the selection and closes any editor.
    pub fn clear(&mut self) {
        self.selected = None;
        self.edit = EditState::Viewing;
    }

    /// Flips a node between expanded and collapsed; selection is unaffected.
    ///
    /// Returns `true` if the node is now expanded.
    pub fn toggle_expanded(&mut self, id: TagId) -> bool {
        if self.expanded.remove(&id) {
            false
        } else {
            self.expanded.insert(id);
            true
        }
    }

    /// Expands `id`.
    pub fn expand(&mut self, id: TagId) {
        self.expanded.insert(id);
    }

    /// Returns `true` if `id` is expanded.
    pub fn is_expanded(&self, id: TagId) -> bool {
        self.expanded.contains(&id)
    }

    /// Opens an editor for `field` seeded with `current`.
    ///
    /// Returns `false` (and does nothing) when no tag is selected. Any other
    /// open editor is replaced; its buffer is discarded.
    pub fn begin_edit(&mut self, field: EditField, current: &str) -> bool {
        if self.selected.is_none() {
            return false;
        }
        // Seeded in full; the length cap only applies to typing.
        let seed = current.to_string();
        self.edit = match field {
            EditField::Name => EditState::EditingName(seed),
            EditField::Description => EditState::EditingDescription(seed),
        };
        true
    }

    /// Appends a character to the open editor.
    ///
    /// The name editor stops accepting input at [`NAME_MAX_CHARS`].
    /// Returns `true` if the character was accepted.
    pub fn push_char(&mut self, c: char) -> bool {
        let is_name = matches!(self.edit, EditState::EditingName(_));
        match self.edit.buffer_mut() {
            Some(buf) if is_name && buf.chars().count() >= NAME_MAX_CHARS => false,
            Some(buf) => {
                buf.push(c);
                true
            }
            None => false,
        }
    }

    /// Removes the last character from the open editor.
    pub fn pop_char(&mut self) {
        if let Some(buf) = self.edit.buffer_mut() {
            buf.pop();
        }
    }

    /// Closes the editor and hands back what was pending.
    pub fn take_edit(&mut self) -> EditState {
        std::mem::take(&mut self.edit)
    }

    /// Reopens an editor taken with [`Self::take_edit`], e.g. after its save
    /// failed. Ignored when nothing is selected.
    pub fn resume_edit(&mut self, pending: EditState) {
        if self.selected.is_some() {
            self.edit = pending;
        }
    }

    /// Closes the editor without keeping its buffer.
    pub fn cancel_edit(&mut self) {
        self.edit = EditState::Viewing;
    }

    /// Re-resolves the selection against a freshly loaded tree.
    ///
    /// A selected tag that no longer exists is cleared together with its
    /// editor; expansion entries for vanished tags are dropped. Returns `true`
    /// if a selection is still held.
    pub fn reconcile(&mut self, tree: &TagTree) -> bool {
        if let Some(id) = self.selected
            && !tree.contains(id)
        {
            self.clear();
        }
        self.expanded.retain(|id| tree.contains(*id));
        self.selected.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;

    fn id(n: i64) -> TagId {
        TagId::new(n)
    }

    #[test]
    fn clicking_selected_node_deselects_it() {
        let mut selection = Selection::new();

        assert_eq!(selection.click(id(1)), Some(id(1)));
        assert_eq!(selection.click(id(2)), Some(id(2)));
        assert_eq!(selection.click(id(2)), None);
        assert!(!selection.is_selected(id(2)));
    }

    #[test]
    fn toggling_expansion_never_changes_selection() {
        let mut selection = Selection::new();
        selection.select(id(1));

        assert!(selection.toggle_expanded(id(1)));
        assert!(selection.is_expanded(id(1)));
        assert_eq!(selection.selected(), Some(id(1)));

        assert!(!selection.toggle_expanded(id(1)));
        assert!(selection.toggle_expanded(id(2)));
        assert_eq!(selection.selected(), Some(id(1)));
    }

    #[test]
    fn begin_edit_requires_a_selection() {
        let mut selection = Selection::new();
        assert!(!selection.begin_edit(EditField::Name, "x"));
        assert_eq!(selection.edit_state(), &EditState::Viewing);
    }

    #[test]
    fn begin_edit_seeds_buffer_with_current_value() {
        let mut selection = Selection::new();
        selection.select(id(1));

        assert!(selection.begin_edit(EditField::Description, "notes"));
        assert_eq!(
            selection.edit_state(),
            &EditState::EditingDescription("notes".into())
        );
        assert_eq!(selection.edit_state().field(), Some(EditField::Description));
    }

    #[test]
    fn only_one_editor_is_open_at_a_time() {
        let mut selection = Selection::new();
        selection.select(id(1));

        selection.begin_edit(EditField::Name, "Old");
        selection.begin_edit(EditField::Description, "About");

        assert_eq!(selection.edit_state().field(), Some(EditField::Description));
        assert_eq!(selection.edit_state().buffer(), Some("About"));
    }

    #[test]
    fn name_editor_caps_length() {
        let mut selection = Selection::new();
        selection.select(id(1));
        selection.begin_edit(EditField::Name, &"n".repeat(NAME_MAX_CHARS - 1));

        assert!(selection.push_char('x'));
        assert!(!selection.push_char('y'));
        assert_eq!(
            selection.edit_state().buffer().map(|b| b.chars().count()),
            Some(NAME_MAX_CHARS)
        );
    }

    #[test]
    fn description_editor_is_unbounded() {
        let mut selection = Selection::new();
        selection.select(id(1));
        selection.begin_edit(EditField::Description, &"d".repeat(NAME_MAX_CHARS));
        assert!(selection.push_char('!'));
    }

    #[test]
    fn push_and_pop_edit_buffer() {
        let mut selection = Selection::new();
        assert!(!selection.push_char('a'));

        selection.select(id(1));
        selection.begin_edit(EditField::Name, "ab");
        selection.push_char('c');
        selection.pop_char();
        selection.pop_char();

        assert_eq!(selection.edit_state().buffer(), Some("a"));
    }

    #[test]
    fn take_edit_returns_to_viewing() {
        let mut selection = Selection::new();
        selection.select(id(1));
        selection.begin_edit(EditField::Name, "Old");

        assert_eq!(selection.take_edit(), EditState::EditingName("Old".into()));
        assert!(!selection.edit_state().is_editing());
    }

    #[test]
    fn long_name_is_seeded_in_full() {
        let mut selection = Selection::new();
        selection.select(id(1));
        let long = "L".repeat(NAME_MAX_CHARS + 5);

        selection.begin_edit(EditField::Name, &long);

        assert_eq!(selection.edit_state().buffer(), Some(long.as_str()));
        assert!(!selection.push_char('x'));
        selection.pop_char();
        assert_eq!(
            selection.edit_state().buffer().map(|b| b.chars().count()),
            Some(NAME_MAX_CHARS + 4)
        );
    }

    #[test]
    fn resume_edit_needs_a_selection() {
        let mut selection = Selection::new();
        selection.resume_edit(EditState::EditingName("kept".into()));
        assert!(!selection.edit_state().is_editing());

        selection.select(id(1));
        selection.resume_edit(EditState::EditingName("kept".into()));
        assert_eq!(selection.edit_state().buffer(), Some("kept"));
    }

    #[test]
    fn selecting_another_node_closes_editor() {
        let mut selection = Selection::new();
        selection.select(id(1));
        selection.begin_edit(EditField::Name, "Old");

        selection.click(id(2));

        assert_eq!(selection.edit_state(), &EditState::Viewing);
    }

    #[test]
    fn reconcile_clears_vanished_selection() {
        let tree = TagTree::from_forest(vec![Tag::new(id(1), "A")]).unwrap();
        let mut selection = Selection::new();
        selection.select(id(2));
        selection.begin_edit(EditField::Name, "B");
        selection.expand(id(2));
        selection.expand(id(1));

        assert!(!selection.reconcile(&tree));
        assert_eq!(selection.selected(), None);
        assert_eq!(selection.edit_state(), &EditState::Viewing);
        assert!(!selection.is_expanded(id(2)));
        assert!(selection.is_expanded(id(1)));
    }

    #[test]
    fn reconcile_keeps_surviving_selection() {
        let tree = TagTree::from_forest(vec![Tag::new(id(1), "A")]).unwrap();
        let mut selection = Selection::new();
        selection.select(id(1));

        assert!(selection.reconcile(&tree));
        assert_eq!(selection.selected(), Some(id(1)));
    }
}
