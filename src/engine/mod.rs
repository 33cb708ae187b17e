// src/engine/mod.rs

/// Data structures shared by every phase: fingerprints, responses, match
/// records and the final `ScanReport`.
pub mod models;

/// The response cache every phase reads from.
pub mod cache;

/// Weighted result aggregation.
pub mod results;

/// Loading and querying the fingerprint database.
pub mod fingerprints;

/// The network side: batch fetcher trait and its reqwest implementation.
pub mod fetcher;

/// Fingerprint matching against fetched responses.
pub mod matcher;

pub mod config;
pub mod error;

/// The detection phases and the orchestrator that runs them in order.
pub mod discovery;
