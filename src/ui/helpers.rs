use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Menu entry, dimmed and tagged when the session role may not run it. The
/// entry stays selectable so the user gets the denial message on Enter.
pub(crate) fn menu_line(label: &str, allowed: bool, selected: bool) -> Line<'static> {
    let mut style = if allowed {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if selected {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    let mut spans = vec![Span::styled(format!(" {label} "), style)];
    if !allowed {
        spans.push(Span::styled(
            " (locked)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}
