use crate::controller::{MutationError, TagTreeController};
use crate::models::{ParentTarget, Tag, TagId};
use crate::selection::EditField;
use crate::store::TagStore;

/// Application state for the TUI.
///
/// Wraps a [`TagTreeController`] with what only the terminal needs: a row
/// cursor over the visible tree, panel focus, and a tag marked for moving.
pub struct App<S> {
    /// Tree state and mutation orchestration
    controller: TagTreeController<S>,
    /// Row index into the visible tree (None if the tree is empty)
    cursor: Option<usize>,
    /// Currently focused panel
    focus: Focus,
    /// Tag picked up with `m`, dropped with `p` or `0`
    moving: Option<TagId>,
    /// Scroll offset for detail view
    detail_scroll: u16,
}

/// Panel focus state for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Tag tree panel (j/k moves the cursor)
    Tree,
    /// Detail panel (j/k scrolls)
    Detail,
}

impl<S: TagStore> App<S> {
    /// Creates an App around a controller, with the cursor on the first row.
    ///
    /// # Examples
    ///
    /// ```
    /// use sysrev::tui::{App, Focus};
    /// use sysrev::{Database, LocalTagStore, ReviewId, TagTreeController};
    ///
    /// let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
    /// let app = App::new(TagTreeController::new(store));
    /// assert_eq!(app.focus(), Focus::Tree);
    /// assert_eq!(app.cursor(), None);
    /// ```
    pub fn new(controller: TagTreeController<S>) -> Self {
        let mut app = Self {
            controller,
            cursor: None,
            focus: Focus::Tree,
            moving: None,
            detail_scroll: 0,
        };
        app.clamp_cursor();
        app
    }

    pub fn controller(&self) -> &TagTreeController<S> {
        &self.controller
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Returns the tag picked up for moving.
    pub fn moving(&self) -> Option<TagId> {
        self.moving
    }

    /// Rows currently on screen: `(depth, tag)` with collapsed subtrees hidden.
    pub fn rows(&self) -> Vec<(usize, &Tag)> {
        let selection = self.controller.selection();
        self.controller
            .tree()
            .visible(|id| selection.is_expanded(id))
    }

    /// Returns the ID of the tag under the cursor.
    pub fn cursor_tag(&self) -> Option<TagId> {
        let rows = self.rows();
        self.cursor
            .and_then(|i| rows.get(i))
            .map(|(_, tag)| tag.id())
    }

    /// Toggles focus between the tree and the detail panel.
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Detail,
            Focus::Detail => Focus::Tree,
        };
    }

    /// Moves the cursor down, wrapping to the first row.
    pub fn cursor_down(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = None;
            return;
        }
        self.cursor = Some(match self.cursor {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        });
    }

    /// Moves the cursor up, wrapping to the last row.
    pub fn cursor_up(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = None;
            return;
        }
        self.cursor = Some(match self.cursor {
            None | Some(0) => len - 1,
            Some(i) => i - 1,
        });
    }

    pub fn detail_scroll(&self) -> u16 {
        self.detail_scroll
    }

    pub fn scroll_detail_down(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_add(amount);
    }

    pub fn scroll_detail_up(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_sub(amount);
    }

    /// Clicks the tag under the cursor (select, or deselect if selected).
    pub fn click_cursor(&mut self) {
        if let Some(id) = self.cursor_tag() {
            let result = self.controller.click(id);
            settle(result);
            self.detail_scroll = 0;
        }
    }

    /// Expands or collapses the tag under the cursor.
    pub fn toggle_cursor(&mut self) {
        if let Some(id) = self.cursor_tag() {
            self.controller.toggle_expanded(id);
            self.clamp_cursor();
        }
    }

    /// Creates a new tag under the selection (or at root) and puts the cursor on it.
    pub fn create(&mut self) {
        if let Some(id) = settle(self.controller.create()) {
            self.put_cursor_on(id);
        } else {
            self.clamp_cursor();
        }
    }

    /// Deletes the selected tag.
    pub fn delete(&mut self) {
        settle(self.controller.delete());
        if let Some(id) = self.moving
            && !self.controller.tree().contains(id)
        {
            self.moving = None;
        }
        self.clamp_cursor();
    }

    /// Picks up the selected tag, falling back to the tag under the cursor.
    pub fn mark_for_move(&mut self) {
        self.moving = self
            .controller
            .selection()
            .selected()
            .or_else(|| self.cursor_tag());
    }

    /// Drops the picked-up tag onto `target`.
    pub fn drop_onto(&mut self, target: ParentTarget) {
        let Some(dragged) = self.moving.take() else {
            return;
        };
        settle(self.controller.move_to(dragged, target));
        self.put_cursor_on(dragged);
    }

    /// Drops the picked-up tag under the tag at the cursor.
    pub fn drop_at_cursor(&mut self) {
        if let Some(target) = self.cursor_tag() {
            self.drop_onto(ParentTarget::Tag(target));
        }
    }

    /// Forgets the picked-up tag.
    pub fn cancel_move(&mut self) {
        self.moving = None;
    }

    /// Reloads the tree from the store.
    pub fn refresh(&mut self) {
        settle(self.controller.refresh());
        self.clamp_cursor();
    }

    /// Clears the selection (committing an open editor).
    pub fn clear_selection(&mut self) {
        settle(self.controller.clear_selection());
    }

    pub fn begin_edit(&mut self, field: EditField) {
        settle(self.controller.begin_edit(field));
    }

    pub fn edit_input(&mut self, c: char) {
        self.controller.edit_input(c);
    }

    pub fn edit_backspace(&mut self) {
        self.controller.edit_backspace();
    }

    pub fn commit_edit(&mut self) {
        settle(self.controller.commit_edit());
    }

    pub fn cancel_edit(&mut self) {
        self.controller.cancel_edit();
    }

    pub fn dismiss_notice(&mut self) {
        self.controller.dismiss_notice();
    }

    /// Returns `true` while an inline editor is open.
    pub fn is_editing(&self) -> bool {
        self.controller.selection().edit_state().is_editing()
    }

    /// Keeps the cursor inside the visible rows after the tree changed.
    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        self.cursor = match (self.cursor, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), len) => Some(i.min(len - 1)),
        };
    }

    /// Expands every ancestor of `id` and moves the cursor onto its row.
    fn put_cursor_on(&mut self, id: TagId) {
        for ancestor in self.controller.tree().ancestors(id) {
            if !self.controller.selection().is_expanded(ancestor) {
                self.controller.toggle_expanded(ancestor);
            }
        }
        let position = self.rows().iter().position(|(_, tag)| tag.id() == id);
        match position {
            Some(i) => self.cursor = Some(i),
            None => self.clamp_cursor(),
        }
    }
}

/// Drops the error of a controller call; the controller has already logged
/// it and raised a notice where the user needs one.
fn settle<T>(result: Result<T, MutationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "tui action failed");
            None
        }
    }
}
