//! UI rendering functions for the TUI.
//!
//! Implements the two-panel layout (tag tree | detail) with a status line for
//! notices and a shortcut bar, using ratatui widgets and layout management.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use time::macros::format_description;

use super::app::{App, Focus};
use crate::controller::{Notice, Phase, Severity};
use crate::models::{ParentTarget, Tag};
use crate::selection::EditState;
use crate::store::TagStore;

/// Main rendering function for the TUI.
pub fn draw<S: TagStore>(frame: &mut Frame, app: &App<S>) {
    let size = frame.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Content area
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Shortcut bar
        ])
        .split(size);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_chunks[0]);

    render_tree(frame, app, content_chunks[0]);
    render_detail(frame, app, content_chunks[1]);
    render_status(frame, app, main_chunks[1]);
    render_shortcut_bar(frame, app, main_chunks[2]);
}

fn panel<'a>(title: &'a str, focused: bool) -> Block<'a> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
}

/// Builds the display line for one tree row.
///
/// Rows are indented by depth and carry an expansion marker when the tag
/// has children.
fn tree_line<S: TagStore>(app: &App<S>, depth: usize, tag: &Tag) -> Line<'static> {
    let selection = app.controller().selection();
    let marker = match (tag.children().is_empty(), selection.is_expanded(tag.id())) {
        (true, _) => "  ",
        (false, true) => "▾ ",
        (false, false) => "▸ ",
    };

    let name_style = if selection.is_selected(tag.id()) {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::raw("  ".repeat(depth)),
        Span::raw(marker),
        Span::styled(tag.name().to_string(), name_style),
    ];
    if app.moving() == Some(tag.id()) {
        spans.push(Span::styled(
            " (moving)",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

fn render_tree<S: TagStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let title = if app.controller().is_stale() {
        "Tags (stale)"
    } else {
        "Tags"
    };
    let block = panel(title, app.focus() == Focus::Tree);

    let items: Vec<ListItem> = app
        .rows()
        .into_iter()
        .map(|(depth, tag)| ListItem::new(tree_line(app, depth, tag)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    list_state.select(app.cursor());

    frame.render_stateful_widget(list, area, &mut list_state);
}

/// Text of the detail panel for the selected tag.
fn detail_text<S: TagStore>(app: &App<S>) -> Text<'static> {
    let controller = app.controller();
    let Some(tag) = controller.selected_tag() else {
        return Text::from("No tag selected");
    };

    let label = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);
    let editing = Style::default().fg(Color::Cyan);
    let edit = controller.selection().edit_state();

    let mut text = Text::default();

    text.lines.push(Line::from(Span::styled("Name:", label)));
    text.lines.push(match edit {
        EditState::EditingName(buffer) => Line::from(Span::styled(format!("{buffer}█"), editing)),
        _ => Line::from(tag.name().to_string()),
    });

    text.lines.push(Line::from(""));
    text.lines.push(Line::from(Span::styled("Description:", label)));
    text.lines.push(match (edit, tag.description()) {
        (EditState::EditingDescription(buffer), _) => {
            Line::from(Span::styled(format!("{buffer}█"), editing))
        }
        (_, Some(description)) => Line::from(description.to_string()),
        (_, None) => Line::from(Span::styled(tag.display_description().to_string(), dim)),
    });

    let tree = controller.tree();
    let parent = match tree.parent_of(tag.id()) {
        Some(ParentTarget::Tag(id)) => tree
            .find_by_id(id)
            .map_or_else(|| id.to_string(), |p| p.name().to_string()),
        _ => "(root)".to_string(),
    };
    let path: Vec<String> = tree
        .ancestors(tag.id())
        .into_iter()
        .rev()
        .filter_map(|id| tree.find_by_id(id).map(|t| t.name().to_string()))
        .chain(std::iter::once(tag.name().to_string()))
        .collect();

    text.lines.push(Line::from(""));
    text.lines.push(Line::from(vec![
        Span::styled("Parent:", label),
        Span::raw(format!(" {parent}")),
    ]));
    text.lines.push(Line::from(vec![
        Span::styled("Path:", label),
        Span::raw(format!(" {}", path.join(" / "))),
    ]));
    text.lines.push(Line::from(vec![
        Span::styled("Children:", label),
        Span::raw(format!(" {}", tag.children().len())),
    ]));
    text.lines.push(Line::from(vec![
        Span::styled("Studies:", label),
        Span::raw(format!(" {}", controller.study_count(tag.id()))),
    ]));
    text.lines.push(Line::from(vec![
        Span::styled("ID:", label),
        Span::styled(format!(" {}", tag.id()), Style::default().fg(Color::DarkGray)),
    ]));

    text
}

fn render_detail<S: TagStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let block = panel("Detail", app.focus() == Focus::Detail);

    let paragraph = Paragraph::new(detail_text(app))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll(), 0));

    frame.render_widget(paragraph, area);
}

/// Formats a notice as `HH:MM:SS message`.
fn notice_line(notice: &Notice) -> Line<'static> {
    let clock = notice
        .raised_at
        .format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "??:??:??".to_string());
    let color = match notice.severity {
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };
    Line::from(vec![
        Span::styled(clock, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(notice.message.clone(), Style::default().fg(color)),
        Span::styled("  (x to dismiss)", Style::default().fg(Color::DarkGray)),
    ])
}

fn render_status<S: TagStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let controller = app.controller();
    let line = match (controller.notice(), controller.phase()) {
        (Some(notice), _) => notice_line(notice),
        (None, Phase::Idle) => Line::from(Span::styled(
            format!("{} tags", controller.tree().len()),
            Style::default().fg(Color::DarkGray),
        )),
        (None, phase) => Line::from(Span::styled(
            format!("{phase}..."),
            Style::default().fg(Color::Yellow),
        )),
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Renders context-aware shortcuts as `key: action | key: action`.
fn render_shortcut_bar<S: TagStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let shortcuts: &[(&str, &str)] = match app.controller().selection().edit_state().field() {
        Some(_) => &[("Enter", "save"), ("Esc", "discard")],
        None if app.moving().is_some() => &[
            ("j/k", "navigate"),
            ("p", "drop here"),
            ("0", "drop at root"),
            ("Esc", "cancel move"),
        ],
        None => match app.focus() {
            Focus::Tree => &[
                ("q", "quit"),
                ("j/k", "navigate"),
                ("Space", "select"),
                ("o", "expand"),
                ("a", "add"),
                ("d", "delete"),
                ("e/E", "edit"),
                ("m", "move"),
                ("r", "reload"),
            ],
            Focus::Detail => &[
                ("q", "quit"),
                ("Tab", "tree"),
                ("j/k", "scroll"),
                ("e/E", "edit"),
            ],
        },
    };

    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);
    let mut spans = Vec::with_capacity(shortcuts.len() * 3);
    for (i, (key, action)) in shortcuts.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", sep_style));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::raw(format!(": {action}")));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TagTreeController;
    use crate::db::Database;
    use crate::models::{DESCRIPTION_PLACEHOLDER, ReviewId};
    use crate::selection::EditField;
    use crate::store::LocalTagStore;
    use ratatui::{Terminal, backend::TestBackend};

    fn create_test_app() -> App<LocalTagStore> {
        let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
        let design = store.create_tag("Design", ParentTarget::Root).unwrap();
        let rct = store
            .create_tag("RCT", ParentTarget::Tag(design.id()))
            .unwrap();
        store.tag_study(7, rct.id()).unwrap();

        let mut controller = TagTreeController::new(store);
        controller.refresh().unwrap();
        controller.toggle_expanded(design.id());
        controller.click(rct.id()).unwrap();
        App::new(controller)
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn rendered(app: &App<LocalTagStore>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn detail_shows_placeholder_path_and_count() {
        let app = create_test_app();
        let lines: Vec<String> = detail_text(&app).lines.iter().map(line_text).collect();

        assert_eq!(lines[1], "RCT");
        assert_eq!(lines[4], DESCRIPTION_PLACEHOLDER);
        assert!(lines.contains(&"Parent: Design".to_string()));
        assert!(lines.contains(&"Path: Design / RCT".to_string()));
        assert!(lines.contains(&"Studies: 1".to_string()));
    }

    #[test]
    fn detail_shows_editor_buffer_with_cursor() {
        let mut app = create_test_app();
        app.begin_edit(EditField::Description);
        app.edit_input('x');

        let lines: Vec<String> = detail_text(&app).lines.iter().map(line_text).collect();
        assert_eq!(lines[4], "x█");
    }

    #[test]
    fn tree_rows_are_indented_with_markers() {
        let app = create_test_app();
        let rows = app.rows();

        assert_eq!(line_text(&tree_line(&app, rows[0].0, rows[0].1)), "▾ Design");
        assert_eq!(line_text(&tree_line(&app, rows[1].0, rows[1].1)), "    RCT");
    }

    #[test]
    fn notice_is_rendered_in_status_line() {
        let mut app = create_test_app();
        app.mark_for_move();
        app.cursor_down();
        app.drop_at_cursor();
        assert!(app.controller().notice().is_some());

        let screen = rendered(&app);
        assert!(screen.contains("cannot be moved under itself"));
        assert!(screen.contains("(x to dismiss)"));

        app.dismiss_notice();
        assert!(rendered(&app).contains("2 tags"));
    }

    #[test]
    fn full_frame_renders_without_selection() {
        let store = LocalTagStore::new(Database::in_memory().unwrap(), ReviewId::new(1));
        let app = App::new(TagTreeController::new(store));

        let screen = rendered(&app);

        assert!(screen.contains("No tag selected"));
        assert!(screen.contains("a: add"));
    }
}
