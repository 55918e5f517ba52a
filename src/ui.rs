pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, List, ListItem, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};

use accrue::history::PersonalRecords;
use accrue::session::{Cue, TrainingMode};
use accrue::util::{
    format_countdown, format_reps, format_seconds, format_seconds_with_decimal, format_time,
};

use crate::{App, AppState, SaveStatus};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &mut App, f: &mut Frame) {
    let mut screen = screen::current_screen(&app.state());
    screen.render(app, f);
}

/// Seconds or reps depending on the mode
pub fn format_amount(mode: TrainingMode, value: f64) -> String {
    match mode {
        TrainingMode::Time => format_seconds(value),
        TrainingMode::Reps => format_reps(value),
    }
}

fn footer<'a>(app: &App, legend: &'a str) -> Paragraph<'a> {
    let line = match &app.message {
        Some(message) => Line::from(Span::styled(
            message.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(
            legend,
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    };
    Paragraph::new(line).alignment(Alignment::Center)
}

fn session_title(app: &App) -> String {
    match (&app.active_preset, app.engine.configuration()) {
        (Some(preset), _) => preset.name.clone(),
        (None, Some(config)) => format!("Ad-hoc {} session", config.mode),
        (None, None) => "accrue".to_string(),
    }
}

/// Preset list shown before a session starts
pub fn render_setup(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new("Choose a preset")
        .block(Block::default().borders(Borders::ALL).title("accrue"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = app
        .presets
        .iter()
        .enumerate()
        .map(|(idx, preset)| {
            let marker = if idx == app.selected { "> " } else { "  " };
            let style = if idx == app.selected {
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker}{:<24}", preset.name), style),
                Span::styled(
                    format!(
                        " {:<5} target {:<8} rest {:<5} adjust {}",
                        preset.mode,
                        format_amount(preset.mode, preset.target),
                        format_countdown(preset.rest_seconds.max(0) as u32),
                        preset.adjustment
                    ),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Presets"));
    f.render_widget(list, chunks[1]);

    f.render_widget(
        footer(app, "(↑/↓) Select  (enter) Start  (h) History  (d) Delete  (esc) Quit"),
        chunks[2],
    );
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state() {
            AppState::Training => render_training(self, area, buf),
            AppState::Resting => render_rest(self, area, buf),
            AppState::Complete => render_complete(self, area, buf),
            AppState::Setup | AppState::History => {}
        }
    }
}

fn progress_gauge(app: &App) -> Gauge<'static> {
    let (mode, target) = app
        .engine
        .configuration()
        .map(|c| (c.mode, c.target))
        .unwrap_or((TrainingMode::Time, 0.0));
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(app.engine.progress())
        .label(format!(
            "{} / {}",
            format_amount(mode, app.engine.accumulated_total()),
            format_amount(mode, target)
        ))
}

fn session_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(3), // progress
            Constraint::Min(3),    // main readout
            Constraint::Length(1), // detail
            Constraint::Length(1), // legend
        ])
        .split(area)
}

fn render_training(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = session_layout(area);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let attempt_number = app.engine.attempts().len() + 1;

    Paragraph::new(Span::styled(
        format!("{}  ·  attempt {attempt_number}", session_title(app)),
        bold.fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    progress_gauge(app).render(chunks[1], buf);

    let mode = app.engine.configuration().map(|c| c.mode);
    match mode {
        Some(TrainingMode::Reps) => {
            let input = Paragraph::new(vec![
                Line::from(Span::styled("Reps in this set", bold)),
                Line::from(Span::styled(
                    format!("{}▏", app.reps_input),
                    bold.fg(Color::Yellow),
                )),
            ])
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            input.render(chunks[2], buf);

            Paragraph::new(format!(
                "{} to go",
                format_reps(app.engine.remaining_to_target())
            ))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

            footer(app, "(0-9) Reps  (enter) Done with set  (r) Reset  (esc) Quit")
                .render(chunks[4], buf);
        }
        _ => {
            let held = app.engine.current_hold_seconds();
            let readout = if app.engine.is_armed() {
                Line::from(Span::styled(
                    format_seconds_with_decimal(held),
                    bold.fg(Color::Green),
                ))
            } else {
                Line::from(Span::styled(
                    "Get ready…",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::ITALIC),
                ))
            };
            Paragraph::new(readout)
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Hold"))
                .render(chunks[2], buf);

            Paragraph::new(format!(
                "bail now for {} total",
                format_seconds(app.engine.live_total(held))
            ))
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::DIM))
            .render(chunks[3], buf);

            footer(app, "(b) Bail out  (s) Stop  (r) Reset  (esc) Quit").render(chunks[4], buf);
        }
    }
}

fn render_rest(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = session_layout(area);
    let remaining = app.engine.rest_remaining();

    Paragraph::new(Span::styled(
        format!("{}  ·  Rest", session_title(app)),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    progress_gauge(app).render(chunks[1], buf);

    let countdown_style = if remaining <= app.config.rest_warning_secs
        || app.last_cue == Some(Cue::Warning)
    {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Blue)
    };
    Paragraph::new(Span::styled(
        format_countdown(remaining),
        countdown_style.add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Rest"))
    .render(chunks[2], buf);

    let mode = app
        .engine
        .configuration()
        .map(|c| c.mode)
        .unwrap_or(TrainingMode::Time);
    Paragraph::new(format!(
        "{} left to reach the target",
        format_amount(mode, app.engine.remaining_to_target())
    ))
    .alignment(Alignment::Center)
    .style(Style::default().add_modifier(Modifier::DIM))
    .render(chunks[3], buf);

    footer(app, "(enter/space) Skip rest  (r) Reset  (esc) Quit").render(chunks[4], buf);
}

fn render_complete(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(3), // summary
            Constraint::Length(1), // personal records
            Constraint::Min(3),    // attempts
            Constraint::Length(1), // save status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let Some(config) = app.engine.configuration().copied() else {
        return;
    };
    let total = app.engine.accumulated_total();

    Paragraph::new(Span::styled(
        format!("Session complete  ·  {}", session_title(app)),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let verdict = if app.engine.target_reached() {
        Span::styled("target reached", Style::default().fg(Color::Green))
    } else {
        Span::styled("stopped short", Style::default().fg(Color::Yellow))
    };
    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                format!(
                    "{} of {}  ",
                    format_amount(config.mode, total),
                    format_amount(config.mode, config.target)
                ),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            verdict,
        ]),
        Line::from(format!(
            "{} attempts in {}",
            app.engine.attempts().len(),
            format_time(app.engine.duration_seconds())
        )),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::TOP))
    .render(chunks[1], buf);

    if let Some(line) = app.records.as_ref().and_then(records_line) {
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Raw"),
        Cell::from("Counted"),
        Cell::from("Time"),
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );
    let rows: Vec<Row> = app
        .engine
        .attempts()
        .iter()
        .enumerate()
        .map(|(idx, attempt)| {
            Row::new(vec![
                Cell::from((idx + 1).to_string()),
                Cell::from(format_amount(config.mode, attempt.raw_value)),
                Cell::from(format_amount(config.mode, attempt.counted_value)),
                Cell::from(attempt.timestamp.format("%H:%M:%S").to_string()),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Attempts"))
    .render(chunks[3], buf);

    let (status, color) = match app.save_status {
        SaveStatus::Saved => ("saved to history", Color::Green),
        SaveStatus::Failed => ("could not save this session, see the log", Color::Red),
        SaveStatus::Skipped => ("not saved: session has no preset", Color::Gray),
        SaveStatus::Pending => ("", Color::Gray),
    };
    Paragraph::new(Span::styled(
        status,
        Style::default().fg(color).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    footer(app, "(n) New session  (h) History  (esc) Quit").render(chunks[5], buf);
}

/// Personal records set by the session, if any
fn records_line(records: &PersonalRecords) -> Option<Line<'static>> {
    let labels: Vec<&str> = [
        (records.best_attempt, "best attempt"),
        (records.fastest_completion, "fastest session"),
        (records.highest_total, "highest total"),
    ]
    .into_iter()
    .filter_map(|(set, label)| set.then_some(label))
    .collect();

    if labels.is_empty() {
        return None;
    }
    Some(Line::from(Span::styled(
        format!("New record: {}", labels.join(", ")),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )))
}
