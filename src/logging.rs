// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    /// Level override read when `RUST_LOG` is unset.
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", *PROJECT_NAME);
    /// Relocates logs and exported reports.
    pub static ref DATA_ENV: String = format!("{}_DATA", *PROJECT_NAME);
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Where logs and exported reports are written: `$WEBRECON_DATA`, else the
/// platform's local data directory, else `./.data`.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_ENV.as_str()).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    match ProjectDirs::from("com", "webrecon", env!("CARGO_PKG_NAME")) {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => PathBuf::from(".").join(".data"),
    }
}

fn default_filter() -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.as_str()))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Sends every event to a log file and returns its path.
///
/// Nothing is written to the terminal: ratatui owns it for the whole run.
pub fn initialize_logging() -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.as_str());
    let log_file = std::fs::File::create(&log_path)?;

    let timer = LocalTime::new(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(default_filter()));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}
