// src/main.rs

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use webrecon::{logging, Discovery, FingerprintDb, ScanConfig, ScanReport};

mod app;
mod ui;

use app::{App, AppState};

type ScanOutcome = Result<ScanReport, String>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;

    let config = ScanConfig::from_env();
    let db = match std::env::var("WEBRECON_FINGERPRINTS") {
        Ok(path) => FingerprintDb::load(&path)?,
        Err(_) => FingerprintDb::builtin()?,
    };
    info!(?config, log = %log_path.display(), "webrecon starting.");

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<ScanOutcome>(1);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &tx, &config, &db)?;
        }

        if let Ok(outcome) = rx.try_recv() {
            app.finish_scan(outcome);
        }
        app.on_tick();
    }

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    Ok(())
}

fn handle_events(
    app: &mut App,
    tx: &mpsc::Sender<ScanOutcome>,
    config: &ScanConfig,
    db: &FingerprintDb,
) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Idle => handle_idle_input(app, key.code, tx, config, db),
                AppState::Finished => handle_finished_input(app, key.code),
                AppState::Scanning => {
                    if key.code == KeyCode::Char('q') {
                        app.quit();
                    }
                }
            }
        }
    }
    Ok(())
}

/// Typing the target. `q` is a valid hostname character, so Esc quits here.
fn handle_idle_input(
    app: &mut App,
    key_code: KeyCode,
    tx: &mpsc::Sender<ScanOutcome>,
    config: &ScanConfig,
    db: &FingerprintDb,
) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            let target = app.input.trim().to_string();
            if target.is_empty() {
                return;
            }
            app.state = AppState::Scanning;

            let tx_clone = tx.clone();
            let config = config.clone();
            let db = db.clone();
            tokio::spawn(async move {
                let outcome = match Discovery::with_http(config, db) {
                    Ok(mut discovery) => Ok(discovery.run(&target).await),
                    Err(e) => {
                        error!(error = %e, "Could not build the discovery engine.");
                        Err(e.to_string())
                    }
                };
                let _ = tx_clone.send(outcome).await;
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => app.export_report(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        _ => {}
    }
}
