// src/ui/widgets/findings_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, Wrap},
};
use webrecon::ScanReport;

/// Renders the findings report, grouped by category.
pub fn render_findings_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (Navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) {
        let content = match app.state {
            AppState::Idle => Paragraph::new("Scan results will appear here...").alignment(Alignment::Center),
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                    Span::raw("Probing target... Please wait."),
                ]))
                .alignment(Alignment::Center)
            }
            AppState::Finished => Paragraph::new(""),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let lines = match (&app.scan_report, &app.scan_error) {
        (Some(report), _) => build_report_lines(report),
        (None, Some(e)) => vec![Line::from(Span::styled(format!("Scan failed: {}", e), Style::default().fg(Color::Red)))],
        (None, None) => vec![Line::from("No report available.")],
    };

    let paragraph = Paragraph::new(lines)
        .block(main_block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset as u16, 0));
    frame.render_widget(paragraph, area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
    frame.render_stateful_widget(scrollbar, area, &mut app.report_scroll_state);
}

fn build_report_lines(report: &ScanReport) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let target_line = match &report.canonical_url {
        Some(url) if report.redirected => format!("{} -> {}", report.target, url),
        Some(url) => url.clone(),
        None => format!("{} (unreachable)", report.target),
    };
    lines.push(Line::from(Span::styled(target_line, Style::default().bold())));
    lines.push(Line::from(""));

    if report.findings.is_empty() {
        lines.push(Line::from(Span::styled("Nothing identified.", Style::default().fg(Color::Yellow))));
        return lines;
    }

    let mut current_category: Option<&str> = None;
    for finding in &report.findings {
        if current_category != Some(finding.category.as_str()) {
            if current_category.is_some() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(
                finding.category.to_uppercase(),
                Style::default().fg(Color::Yellow).bold(),
            )));
            current_category = Some(finding.category.as_str());
        }

        let version = if finding.version.is_empty() { String::new() } else { format!(" {}", finding.version) };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(finding.name.clone(), Style::default().fg(Color::Cyan)),
            Span::raw(version),
            Span::styled(format!("  (weight {})", finding.weight), Style::default().fg(Color::DarkGray)),
        ]));
    }
    lines
}
