// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};

/// Renders the summary panel once a scan has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // CMS
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Operating system
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Counts
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }

    frame.render_widget(
        name_list("CMS", &app.summary.cms, Color::Green),
        summary_chunks[0],
    );
    frame.render_widget(
        name_list("OPERATING SYSTEM", &app.summary.operating_systems, Color::Cyan),
        summary_chunks[2],
    );

    let redirected = app.scan_report.as_ref().is_some_and(|r| r.redirected);
    let error_pages = app.scan_report.as_ref().map_or(0, |r| r.error_pages);
    let counts = vec![
        Line::from("DETAILS".bold()),
        Line::from(format!("JavaScript libraries: {}", app.summary.javascript)),
        Line::from(format!("Interesting files: {}", app.summary.interesting)),
        Line::from(format!("Total findings: {}", app.summary.total_findings)),
        Line::from(format!("Error pages learned: {}", error_pages)),
        Line::from(format!("Redirected: {}", if redirected { "yes" } else { "no" })),
    ];
    frame.render_widget(Paragraph::new(counts), summary_chunks[4]);
}

fn name_list<'a>(title: &'a str, names: &'a [String], color: Color) -> Paragraph<'a> {
    let mut lines = vec![Line::from(title.bold())];
    if names.is_empty() {
        lines.push(Line::from(Span::styled("Not identified.", Style::default().fg(Color::DarkGray))));
    } else {
        for name in names {
            lines.push(Line::from(vec![
                Span::raw("- "),
                Span::styled(name.as_str(), Style::default().fg(color)),
            ]));
        }
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}
