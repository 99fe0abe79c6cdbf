use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::model::{Actions, Category, LogEntry, Status, View};

pub fn draw(f: &mut Frame, view: &View, endpoint: &str, editing: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_status(f, chunks[0], view, endpoint);
    render_log(f, chunks[1], view);
    render_input(f, chunks[2], view, editing);
    f.render_widget(Paragraph::new(key_hints(&view.actions, editing)), chunks[3]);
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Connecting => Color::Yellow,
        Status::Connected => Color::Green,
        Status::Disconnected => Color::Red,
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::System => Color::Gray,
        Category::Sent => Color::Cyan,
        Category::Received => Color::Green,
        Category::Error => Color::Red,
    }
}

fn render_status(f: &mut Frame, area: Rect, view: &View, endpoint: &str) {
    let line = Line::from(vec![
        Span::styled(
            view.status_label.clone(),
            Style::default()
                .fg(status_color(view.status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            "   Messages: {}   Connected: {}   Ping: {} ms",
            view.count_text(),
            view.elapsed,
            view.ping_text()
        )),
    ]);

    let status = Paragraph::new(line)
        .block(Block::default().title(format!(" {} ", endpoint)).borders(Borders::ALL));
    f.render_widget(status, area);
}

fn render_log(f: &mut Frame, area: Rect, view: &View) {
    let max_w = (area.width as usize).saturating_sub(2);
    let rows = (area.height as usize).saturating_sub(2);
    let skip = view.log.len().saturating_sub(rows);

    let lines: Vec<Line> = view.log[skip..]
        .iter()
        .map(|entry| {
            Line::from(Span::styled(
                clip(&log_line(entry), max_w),
                Style::default().fg(category_color(entry.category)),
            ))
        })
        .collect();

    let log = Paragraph::new(lines).block(Block::default().title(" Messages ").borders(Borders::ALL));
    f.render_widget(log, area);
}

fn render_input(f: &mut Frame, area: Rect, view: &View, editing: bool) {
    let style = if !view.actions.input {
        Style::default().fg(Color::DarkGray)
    } else if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let input = Paragraph::new(view.input.as_str())
        .style(style)
        .block(Block::default().title(" Message ").borders(Borders::ALL));
    f.render_widget(input, area);

    if editing {
        let x = area.x + 1 + view.input.chars().count() as u16;
        f.set_cursor(x.min(area.right().saturating_sub(2)), area.y + 1);
    }
}

fn key_hints(actions: &Actions, editing: bool) -> Line<'static> {
    if editing {
        return Line::from(" Enter send   Esc leave input   Ctrl-C quit");
    }

    let hint = |key: &str, label: &str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(format!(" [{}] {} ", key, label), style)
    };

    Line::from(vec![
        hint("c", "connect", actions.connect),
        hint("d", "disconnect", actions.disconnect),
        hint("p", "ping", actions.ping),
        hint("t", "test", actions.test),
        hint("i", "type", actions.input),
        hint("l", "clear", true),
        hint("q", "quit", true),
    ])
}

pub fn log_line(entry: &LogEntry) -> String {
    format!("{} {}", entry.at.format("%H:%M:%S"), entry.text)
}

/// Truncates to `max` characters, marking the cut with `...`.
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("🎉 Connected successfully!", 8), "🎉 Con...");
        assert_eq!(clip("abcdef", 2), "ab");
    }

    #[test]
    fn log_line_carries_local_time() {
        let entry = LogEntry {
            text: "📤 Sent: echo: hi".into(),
            category: Category::Sent,
            at: Local.with_ymd_and_hms(2024, 5, 1, 9, 7, 3).unwrap(),
        };
        assert_eq!(log_line(&entry), "09:07:03 📤 Sent: echo: hi");
    }
}
