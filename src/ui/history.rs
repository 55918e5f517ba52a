use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use accrue::history::{PresetStats, SessionHistory, Trend};
use accrue::session::TrainingMode;
use accrue::util::format_time;

use crate::{ui::format_amount, App};

/// Pure presenter for a single session row
pub fn present_row(session: &SessionHistory) -> Row<'static> {
    let (mark, mark_color) = if session.reached_target() {
        ("✓", Color::Green)
    } else {
        ("·", Color::Gray)
    };

    Row::new(vec![
        Cell::from(session.date.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(format!(
            "{} / {}",
            format_amount(session.mode, session.accumulated_total),
            format_amount(session.mode, session.target)
        )),
        Cell::from(session.attempt_count.to_string()),
        Cell::from(format_time(session.duration_seconds)),
        Cell::from(mark).style(Style::default().fg(mark_color)),
    ])
}

fn trend_style(trend: Trend) -> Style {
    match trend {
        Trend::Improving => Style::default().fg(Color::Green),
        Trend::Declining => Style::default().fg(Color::Red),
        Trend::Stable => Style::default(),
    }
}

fn stats_lines(stats: &PresetStats, sessions: &[SessionHistory]) -> Vec<Line<'static>> {
    let mode = sessions.first().map(|s| s.mode).unwrap_or(TrainingMode::Time);
    vec![
        Line::from(format!(
            "{} sessions   average {}   best {}   {:.1} attempts on average",
            stats.total_sessions,
            format_time(stats.average_duration),
            format_time(stats.best_duration),
            stats.average_attempts
        )),
        Line::from(format!(
            "best total {}   average total {}   last {}",
            format_amount(mode, stats.best_accumulated),
            format_amount(mode, stats.average_accumulated),
            stats.last_session.format("%Y-%m-%d")
        )),
        Line::styled(format!("trend: {}", stats.trend), trend_style(stats.trend)),
    ]
}

/// Render statistics and past sessions for one preset
pub fn render_history(app: &mut App, f: &mut Frame) {
    let Some(view) = app.history.as_mut() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(5), // stats
            Constraint::Min(0),    // sessions table
            Constraint::Length(1), // instructions
        ])
        .split(f.area());

    let stats = match &view.stats {
        Some(stats) => Paragraph::new(stats_lines(stats, &view.sessions)),
        None => Paragraph::new("No sessions yet. Finish one to start tracking.")
            .style(Style::default().fg(Color::Gray)),
    };
    f.render_widget(
        stats
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("History: {}", view.preset_name)),
            ),
        chunks[0],
    );

    let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
    let max_scroll = view.sessions.len().saturating_sub(table_height);
    if view.scroll_offset > max_scroll {
        view.scroll_offset = max_scroll;
    }

    let header = Row::new(vec![
        Cell::from("Date"),
        Cell::from("Total"),
        Cell::from("Attempts"),
        Cell::from("Duration"),
        Cell::from(""),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = view
        .sessions
        .iter()
        .skip(view.scroll_offset)
        .take(table_height)
        .map(present_row)
        .collect();

    let widths = [
        Constraint::Length(18),
        Constraint::Length(20),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(2),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Sessions"))
        .column_spacing(2);
    f.render_widget(table, chunks[1]);

    let instructions = Paragraph::new("(↑/↓) scroll  (Home) top  (b/backspace) back  (esc) quit")
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
