// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let spans = match app.state {
        AppState::Idle => Line::from(vec![
            Span::raw("Press "),
            Span::styled("Enter", Style::new().bold().fg(Color::Yellow)),
            Span::raw(" to scan, "),
            Span::styled("Esc", Style::new().bold().fg(Color::Yellow)),
            Span::raw(" to quit."),
        ]),
        AppState::Finished => {
            let mut spans = vec![
                Span::styled("[N]", Style::new().bold().fg(Color::Yellow)),
                Span::raw("ew Scan, "),
                Span::styled("[E]", Style::new().bold().fg(Color::Yellow)),
                Span::raw("xport JSON, "),
                Span::styled("[Q]", Style::new().bold().fg(Color::Yellow)),
                Span::raw("uit"),
            ];
            match &app.export_status {
                ExportStatus::Idle => {}
                ExportStatus::Success(path) => {
                    spans.push(Span::styled(format!("  Saved to {}", path), Style::new().fg(Color::Green)));
                }
                ExportStatus::Error(e) => {
                    spans.push(Span::styled(format!("  Export failed: {}", e), Style::new().fg(Color::Red)));
                }
            }
            Line::from(spans)
        }
        AppState::Scanning => Line::from("Scanning... Press Q to quit."),
    };

    let footer = Paragraph::new(spans).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
