// src/engine/discovery/urlless.rs

//! Zero-network passes over the cache.

use tracing::info;

use crate::engine::cache::Cache;
use crate::engine::matcher::Matcher;
use crate::engine::models::Fingerprint;
use crate::engine::results::ResultSet;

pub(super) fn match_cache<M: Matcher>(matcher: &M, fingerprints: &[Fingerprint], cache: &Cache, results: &mut ResultSet) -> usize {
    let mut found = 0;
    for response in cache.responses() {
        for m in matcher.get_result(fingerprints, &response) {
            results.add_cms(&m);
            found += 1;
        }
    }
    found
}

/// Applies fingerprints that need no request of their own (header and body
/// rules) to every cached response.
pub struct UrlLessMatcher<'a, M> {
    matcher: &'a M,
    fingerprints: Vec<Fingerprint>,
}

impl<'a, M: Matcher> UrlLessMatcher<'a, M> {
    pub fn new(matcher: &'a M, fingerprints: Vec<Fingerprint>) -> Self {
        Self { matcher, fingerprints }
    }

    pub fn run(&self, cache: &Cache, results: &mut ResultSet) -> usize {
        let found = match_cache(self.matcher, &self.fingerprints, cache, results);
        info!(fingerprints = self.fingerprints.len(), matches = found, "Url-less matching finished.");
        found
    }
}

/// Cross-matches the entire database against every cached response.
///
/// Catches technologies whose probe paths were never requested, at the cost
/// of more false positives than the url-less pass.
pub struct AllFingerprintMatcher<'a, M> {
    matcher: &'a M,
    fingerprints: Vec<Fingerprint>,
}

impl<'a, M: Matcher> AllFingerprintMatcher<'a, M> {
    pub fn new(matcher: &'a M, fingerprints: Vec<Fingerprint>) -> Self {
        Self { matcher, fingerprints }
    }

    pub fn run(&self, cache: &Cache, results: &mut ResultSet) -> usize {
        let found = match_cache(self.matcher, &self.fingerprints, cache, results);
        info!(fingerprints = self.fingerprints.len(), matches = found, "Full database matching finished.");
        found
    }
}
