// src/app.rs

use std::path::PathBuf;

use chrono::Utc;
use ratatui::widgets::ScrollbarState;
use webrecon::engine::results::{CATEGORY_CMS, CATEGORY_OS};
use webrecon::logging::get_data_dir;
use webrecon::ScanReport;

pub const SPINNER_CHARS: [char; 4] = ['|', '/', '-', '\\'];

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub cms: Vec<String>,
    pub operating_systems: Vec<String>,
    pub javascript: usize,
    pub interesting: usize,
    pub total_findings: usize,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub scan_report: Option<ScanReport>,
    pub scan_error: Option<String>,
    pub summary: ScanSummary,
    pub scroll_offset: usize,
    pub report_scroll_state: ScrollbarState,
    pub export_status: ExportStatus,
    pub spinner_frame: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Idle,
            input: String::new(),
            scan_report: None,
            scan_error: None,
            summary: ScanSummary::default(),
            scroll_offset: 0,
            report_scroll_state: ScrollbarState::default(),
            export_status: ExportStatus::Idle,
            spinner_frame: 0,
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    pub fn scroll_down(&mut self) {
        let max = self.scan_report.as_ref().map_or(0, |r| r.findings.len());
        self.scroll_offset = self.scroll_offset.saturating_add(1).min(max);
        self.report_scroll_state = self.report_scroll_state.position(self.scroll_offset);
    }

    pub fn finish_scan(&mut self, outcome: Result<ScanReport, String>) {
        match outcome {
            Ok(report) => {
                self.report_scroll_state = ScrollbarState::new(report.findings.len());
                self.scan_report = Some(report);
                self.scan_error = None;
            }
            Err(e) => {
                self.scan_report = None;
                self.scan_error = Some(e);
            }
        }
        self.state = AppState::Finished;
        self.update_summary();
    }

    pub fn update_summary(&mut self) {
        if let Some(report) = &self.scan_report {
            let labelled = |category: &str| -> Vec<String> {
                report
                    .findings_in(category)
                    .map(|f| if f.version.is_empty() { f.name.clone() } else { format!("{} {}", f.name, f.version) })
                    .collect()
            };

            self.summary = ScanSummary {
                cms: labelled(CATEGORY_CMS),
                operating_systems: labelled(CATEGORY_OS),
                javascript: report.findings_in("JavaScript").count(),
                interesting: report.findings_in("Interesting").count(),
                total_findings: report.findings.len(),
            };
        }
    }

    /// Writes the current report as JSON into the data directory.
    pub fn export_report(&mut self) {
        let Some(report) = &self.scan_report else {
            self.export_status = ExportStatus::Error("No report to export.".to_string());
            return;
        };
        self.export_status = match write_report(report) {
            Ok(path) => ExportStatus::Success(path.display().to_string()),
            Err(e) => ExportStatus::Error(e),
        };
    }

    pub fn on_tick(&mut self) {
        if let AppState::Scanning = self.state {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.scan_report = None;
        self.scan_error = None;
        self.summary = ScanSummary::default();
        self.scroll_offset = 0;
        self.report_scroll_state = ScrollbarState::default();
        self.export_status = ExportStatus::Idle;
        self.spinner_frame = 0;
    }
}

fn write_report(report: &ScanReport) -> Result<PathBuf, String> {
    let json = report.to_json_pretty().map_err(|e| e.to_string())?;
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory).map_err(|e| e.to_string())?;

    let slug: String = report
        .target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    let path = directory.join(format!("report-{}-{}.json", slug, Utc::now().format("%Y%m%d-%H%M%S")));
    std::fs::write(&path, json).map_err(|e| e.to_string())?;
    Ok(path)
}
