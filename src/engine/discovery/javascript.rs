// src/engine/discovery/javascript.rs

use tracing::{debug, info};

use crate::engine::cache::Cache;
use crate::engine::matcher::Matcher;
use crate::engine::models::{Fingerprint, Response};
use crate::engine::results::ResultSet;

/// A response counts as JavaScript by content type or by a `.js` path.
pub fn is_javascript(response: &Response) -> bool {
    response.content_type().is_some_and(|ct| ct.contains("javascript")) || response.url.path().ends_with(".js")
}

/// Identifies JavaScript libraries among cached scripts.
pub struct JavaScriptProbe<'a, M> {
    matcher: &'a M,
    fingerprints: &'a [Fingerprint],
}

impl<'a, M: Matcher> JavaScriptProbe<'a, M> {
    pub fn new(matcher: &'a M, fingerprints: &'a [Fingerprint]) -> Self {
        Self { matcher, fingerprints }
    }

    /// Records every library match with weight 1. Returns the match count.
    pub fn run(&self, cache: &Cache, results: &mut ResultSet) -> usize {
        let scripts: Vec<_> = cache.responses().into_iter().filter(|r| is_javascript(r)).collect();
        info!(scripts = scripts.len(), "Matching JavaScript libraries.");

        let mut found = 0;
        for script in &scripts {
            for m in self.matcher.get_result(self.fingerprints, script) {
                debug!(library = %m.name, version = %m.output, url = %script.url, "JavaScript library matched.");
                results.add(&m.category, &m.name, &m.output, 1);
                found += 1;
            }
        }
        found
    }
}
