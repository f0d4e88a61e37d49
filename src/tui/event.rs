//! Keyboard event handling for the TUI.
//!
//! Maps crossterm keyboard events to application state changes. While an
//! inline editor is open every printable key goes into its buffer, so the
//! global shortcuts below only apply in viewing mode.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Focus};
use crate::models::ParentTarget;
use crate::selection::EditField;
use crate::store::TagStore;

/// Handles a keyboard event and updates the app state accordingly.
///
/// Returns `true` if the application should quit, `false` otherwise.
///
/// # Event Handling
///
/// - `q`: Quit application
/// - `Tab`: Switch between tree and detail panel
/// - `Esc`: Cancel a pending move, then clear the selection
/// - `x`: Dismiss the current notice
/// - `r`: Reload the tree
/// - When the tree is focused:
///   - `j`/`k` (or arrows): move the cursor
///   - `Space`/`Enter`: select or deselect the tag under the cursor
///   - `o`: expand or collapse the tag under the cursor
///   - `a`: add a tag under the selection (or at root)
///   - `d`: delete the selected tag and its subtree
///   - `e`/`E`: edit the selected tag's name / description
///   - `m`: pick up the selected tag; `p` drops it under the cursor, `0` at root
/// - While editing: characters append, `Backspace` deletes, `Enter` saves,
///   `Esc` discards
///
/// # Examples
///
/// ```
/// use sysrev::tui::{App, event::handle_key_event};
/// use sysrev::{Database, LocalTagStore, ReviewId, TagTreeController};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
/// let mut app = App::new(TagTreeController::new(store));
/// let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
/// assert!(handle_key_event(&mut app, key));
/// ```
pub fn handle_key_event<S: TagStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    if app.is_editing() {
        handle_editor(app, key);
        return false;
    }

    if key.code == KeyCode::Char('q') && key.modifiers.is_empty() {
        return true;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            app.next_focus();
            return false;
        }
        KeyCode::Esc => {
            if app.moving().is_some() {
                app.cancel_move();
            } else {
                app.clear_selection();
            }
            return false;
        }
        KeyCode::Char('x') => {
            app.dismiss_notice();
            return false;
        }
        KeyCode::Char('r') => {
            app.refresh();
            return false;
        }
        _ => {}
    }

    match app.focus() {
        Focus::Tree => handle_tree(app, key),
        Focus::Detail => handle_detail(app, key),
    }

    false
}

/// Handles keys while an inline editor is open.
fn handle_editor<S: TagStore>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            app.edit_input(c);
        }
        KeyCode::Backspace => app.edit_backspace(),
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Esc => app.cancel_edit(),
        _ => {}
    }
}

/// Handles keys when the tree panel is focused.
fn handle_tree<S: TagStore>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.cursor_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor_up(),
        KeyCode::Char(' ') | KeyCode::Enter => app.click_cursor(),
        KeyCode::Char('o') | KeyCode::Right | KeyCode::Left => app.toggle_cursor(),
        KeyCode::Char('a') => app.create(),
        KeyCode::Char('d') => app.delete(),
        KeyCode::Char('e') => app.begin_edit(EditField::Name),
        KeyCode::Char('E') => app.begin_edit(EditField::Description),
        KeyCode::Char('m') => app.mark_for_move(),
        KeyCode::Char('p') => app.drop_at_cursor(),
        KeyCode::Char('0') => app.drop_onto(ParentTarget::Root),
        _ => {}
    }
}

/// Handles keys when the detail panel is focused.
fn handle_detail<S: TagStore>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_detail_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_detail_up(1),
        KeyCode::Char('e') => app.begin_edit(EditField::Name),
        KeyCode::Char('E') => app.begin_edit(EditField::Description),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TagTreeController;
    use crate::db::Database;
    use crate::models::ReviewId;
    use crate::store::LocalTagStore;

    fn press(app: &mut App<LocalTagStore>, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App<LocalTagStore>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn empty_app() -> App<LocalTagStore> {
        let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
        let mut controller = TagTreeController::new(store);
        controller.refresh().unwrap();
        App::new(controller)
    }

    fn selected_name(app: &App<LocalTagStore>) -> Option<String> {
        app.controller()
            .selected_tag()
            .map(|tag| tag.name().to_string())
    }

    #[test]
    fn quit_key_triggers_shutdown() {
        let mut app = empty_app();
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn q_is_typed_while_editing() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('e'));

        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(
            app.controller().selection().edit_state().buffer(),
            Some("New Tagq")
        );
    }

    #[test]
    fn add_select_and_rename_flow() {
        let mut app = empty_app();

        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(selected_name(&app).as_deref(), Some("New Tag"));

        press(&mut app, KeyCode::Char('e'));
        for _ in 0.."New Tag".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_str(&mut app, "Population");
        press(&mut app, KeyCode::Enter);

        assert!(!app.is_editing());
        assert_eq!(selected_name(&app).as_deref(), Some("Population"));
    }

    #[test]
    fn esc_discards_description_edit() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char(' '));

        press(&mut app, KeyCode::Char('E'));
        type_str(&mut app, "draft");
        press(&mut app, KeyCode::Esc);

        assert!(!app.is_editing());
        let tag = app.controller().selected_tag().unwrap();
        assert_eq!(tag.description(), None);
    }

    #[test]
    fn esc_in_viewing_mode_clears_selection() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char(' '));

        press(&mut app, KeyCode::Esc);

        assert_eq!(app.controller().selection().selected(), None);
    }

    #[test]
    fn move_to_root_with_zero() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('a'));
        // Cursor is on the child; select it instead of the parent.
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.controller().tree().roots().len(), 1);

        press(&mut app, KeyCode::Char('m'));
        press(&mut app, KeyCode::Char('0'));

        assert_eq!(app.controller().tree().roots().len(), 2);
    }

    #[test]
    fn delete_key_removes_selected_tag() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Char(' '));

        press(&mut app, KeyCode::Char('d'));

        assert!(app.controller().tree().is_empty());
        assert_eq!(app.cursor(), None);
    }

    #[test]
    fn detail_focus_scrolls_instead_of_moving_cursor() {
        let mut app = empty_app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.detail_scroll(), 1);
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.detail_scroll(), 0);
    }
}
