// src/engine/discovery/platform.rs

use tracing::{debug, info};

use crate::engine::cache::Cache;
use crate::engine::matcher::Matcher;
use crate::engine::models::Fingerprint;
use crate::engine::results::ResultSet;

use super::urlless::match_cache;

/// Records server-side platforms (ASP.NET, PHP, web server builds) seen in
/// cached response headers.
///
/// Runs before OS inference so the `Platform` results exist when the
/// inferencer folds them into its tally.
pub struct PlatformProbe<'a, M> {
    matcher: &'a M,
    fingerprints: &'a [Fingerprint],
}

impl<'a, M: Matcher> PlatformProbe<'a, M> {
    pub fn new(matcher: &'a M, fingerprints: &'a [Fingerprint]) -> Self {
        Self { matcher, fingerprints }
    }

    pub fn run(&self, cache: &Cache, results: &mut ResultSet) -> usize {
        let found = match_cache(self.matcher, self.fingerprints, cache, results);
        if found == 0 {
            debug!(cached = cache.len(), "No platform headers recognised.");
        }
        info!(fingerprints = self.fingerprints.len(), matches = found, "Platform matching finished.");
        found
    }
}
