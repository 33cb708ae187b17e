// src/engine/discovery/interesting.rs

use tracing::{debug, info};
use url::Url;

use crate::engine::fetcher::{FetchMode, FetchOutcome, Fetcher};
use crate::engine::matcher::Matcher;
use crate::engine::models::ProbeGroup;
use crate::engine::results::ResultSet;

/// Probes for files worth a closer look: VCS metadata, status pages,
/// configuration dumps.
pub struct InterestingFileProbe<'a, F, M> {
    fetcher: &'a F,
    matcher: &'a M,
    threads: usize,
}

impl<'a, F: Fetcher, M: Matcher> InterestingFileProbe<'a, F, M> {
    pub fn new(fetcher: &'a F, matcher: &'a M, threads: usize) -> Self {
        Self { fetcher, matcher, threads: threads.max(1) }
    }

    /// Returns the number of matches recorded.
    ///
    /// A match on a response that went through any redirect is dropped: sites
    /// that bounce every unknown path to one landing page would otherwise
    /// "have" every file probed.
    pub async fn run(&self, base: &Url, fingerprints: Vec<ProbeGroup>, results: &mut ResultSet) -> usize {
        info!(probes = fingerprints.len(), "Probing for interesting files.");
        let mut found = 0;

        for batch in fingerprints.chunks(self.threads) {
            let mut rx = self.fetcher.run(base, batch.to_vec(), FetchMode::Normal);
            while let Some(outcome) = rx.recv().await {
                let FetchOutcome::Page { fingerprints, response } = outcome else {
                    continue;
                };
                let matches = self.matcher.get_result(&fingerprints, &response);
                if matches.is_empty() {
                    continue;
                }
                if response.is_redirected() {
                    debug!(url = %response.url, hops = response.history.len(), "Discarding match on redirected response.");
                    continue;
                }
                for m in matches {
                    info!(file = %m.name, url = %response.url, "Interesting file found.");
                    results.add_cms(&m);
                    found += 1;
                }
            }
        }
        found
    }
}
