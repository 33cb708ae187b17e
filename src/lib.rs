//! webrecon - remote web technology reconnaissance.
//!
//! Given a target host, the engine works out which CMS (and version) it runs,
//! the operating system underneath, the JavaScript libraries it ships and any
//! interesting files it exposes. It does so by firing fingerprint probes in
//! bounded batches and folding weighted evidence into a ranked result set.

pub mod engine;
pub mod logging;

pub use engine::config::ScanConfig;
pub use engine::discovery::Discovery;
pub use engine::error::ScanError;
pub use engine::fingerprints::FingerprintDb;
pub use engine::models::ScanReport;
