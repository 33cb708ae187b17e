// src/engine/discovery/error_page.rs

use std::collections::HashSet;

use tracing::{debug, info};
use url::Url;

use crate::engine::fetcher::{FetchMode, FetchOutcome, Fetcher};
use crate::engine::models::ProbeGroup;

/// Learns what the site's "not found" pages look like.
///
/// Paths that should not exist are fetched in baseline mode and their page
/// checksums collected. Sites often serve different defaults for different
/// path shapes (`/x/` versus `/x.php`), hence a set.
pub struct ErrorPageBaseliner<'a, F> {
    fetcher: &'a F,
    urls: &'a [String],
    error_pages: HashSet<String>,
}

impl<'a, F: Fetcher> ErrorPageBaseliner<'a, F> {
    pub fn new(fetcher: &'a F, urls: &'a [String]) -> Self {
        Self { fetcher, urls, error_pages: HashSet::new() }
    }

    pub async fn run(&mut self, base: &Url) {
        info!(probes = self.urls.len(), "Learning default error pages.");
        let batch = self.urls.iter().map(ProbeGroup::url_only).collect();

        let mut rx = self.fetcher.run(base, batch, FetchMode::Baseline);
        while let Some(outcome) = rx.recv().await {
            if let FetchOutcome::Baseline { checksum, url } = outcome {
                debug!(url = %url, checksum = %checksum, "Error page baseline.");
                self.error_pages.insert(checksum);
            }
        }
        info!(distinct = self.error_pages.len(), "Error page baseline finished.");
    }

    pub fn error_pages(&self) -> &HashSet<String> {
        &self.error_pages
    }

    pub fn into_error_pages(self) -> HashSet<String> {
        self.error_pages
    }
}
