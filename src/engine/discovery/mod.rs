// src/engine/discovery/mod.rs

// One module per detection phase. The orchestrator below runs them in a fixed
// order; later phases read what earlier ones left in the cache and results.
pub mod chunked;
pub mod error_page;
pub mod interesting;
pub mod javascript;
pub mod links;
pub mod os;
pub mod platform;
pub mod redirect;
pub mod urlless;

use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info};
use url::Url;

use crate::engine::cache::Cache;
use crate::engine::config::ScanConfig;
use crate::engine::error::ScanError;
use crate::engine::fetcher::{Fetcher, HttpFetcher};
use crate::engine::fingerprints::FingerprintDb;
use crate::engine::matcher::{Matcher, PatternMatcher};
use crate::engine::models::ScanReport;
use crate::engine::results::{ResultSet, CATEGORY_CMS};

use self::chunked::{CmsDetector, VersionDetector};
use self::error_page::ErrorPageBaseliner;
use self::interesting::InterestingFileProbe;
use self::javascript::JavaScriptProbe;
use self::links::LinkCrawler;
use self::os::OsInferencer;
use self::platform::PlatformProbe;
use self::redirect::{normalize_target, RedirectResolver};
use self::urlless::{AllFingerprintMatcher, UrlLessMatcher};

/// Runs a full reconnaissance scan.
///
/// Phases run one after another, each with sole access to the cache and the
/// result set:
/// redirect -> error baseline -> CMS + version -> platform -> OS -> crawl ->
/// JavaScript -> interesting files -> url-less (or whole database) matching.
pub struct Discovery<F, M> {
    fetcher: F,
    matcher: M,
    cache: Cache,
    db: FingerprintDb,
    config: ScanConfig,
}

impl Discovery<HttpFetcher, PatternMatcher> {
    /// A discovery engine talking to the network through reqwest.
    pub fn with_http(config: ScanConfig, db: FingerprintDb) -> Result<Self, ScanError> {
        let cache = Cache::new();
        let fetcher = HttpFetcher::new(&config, cache.clone())?;
        Ok(Self::new(fetcher, PatternMatcher::new(), cache, db, config))
    }
}

impl<F: Fetcher, M: Matcher> Discovery<F, M> {
    /// `cache` must be the same cache `fetcher` writes into.
    pub fn new(fetcher: F, matcher: M, cache: Cache, db: FingerprintDb, config: ScanConfig) -> Self {
        Self { fetcher, matcher, cache, db, config }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub async fn run(&mut self, target: &str) -> ScanReport {
        let started_at = Utc::now();
        info!(target, "Starting discovery.");

        let mut report = ScanReport { target: target.to_string(), started_at, ..Default::default() };
        let mut results = ResultSet::new();

        // --- Redirect ---
        let resolver = RedirectResolver::resolve(&self.fetcher, target).await;
        report.canonical_url = resolver.canonical_url().map(String::from);
        report.redirected = resolver.is_redirected();

        let base_str = resolver.canonical_url().map(String::from).unwrap_or_else(|| normalize_target(target));
        let base = match Url::parse(&base_str) {
            Ok(base) => base,
            Err(e) => {
                error!(target, error = %e, "Target is not a valid URL, aborting scan.");
                report.finished_at = Utc::now();
                return report;
            }
        };

        // --- Error pages ---
        let mut baseliner = ErrorPageBaseliner::new(&self.fetcher, self.db.error_urls());
        baseliner.run(&base).await;
        let error_pages = baseliner.into_error_pages();
        report.error_pages = error_pages.len();
        self.matcher.set_error_pages(error_pages);

        // --- CMS and version ---
        report.cms = self.detect_cms(&base).await;
        let versions = VersionDetector::new(&self.fetcher, &self.matcher, self.config.chunk_size);
        for cms in &report.cms {
            versions.run(&base, cms, self.db.fingerprints_for_cms(cms), &mut results).await;
            if !results.contains_name(CATEGORY_CMS, cms) {
                results.add(CATEGORY_CMS, cms, "", 1);
            }
        }

        // --- Platforms, read back by the OS fold ---
        PlatformProbe::new(&self.matcher, self.db.platform_fingerprints()).run(&self.cache, &mut results);

        // --- Operating system ---
        let mut inferencer = OsInferencer::new(self.db.os_fingerprints());
        inferencer.run(&self.cache, &mut results);
        report.matched_packages = inferencer.matched_packages().iter().cloned().collect();

        // --- Crawl ---
        if self.config.crawl {
            LinkCrawler::new(&self.fetcher, self.config.threads).run(&base, &self.cache).await;
        }

        // --- JavaScript, interesting files, cache-only matching ---
        JavaScriptProbe::new(&self.matcher, self.db.js_fingerprints()).run(&self.cache, &mut results);

        InterestingFileProbe::new(&self.fetcher, &self.matcher, self.config.threads)
            .run(&base, self.db.interesting_fingerprints(), &mut results)
            .await;

        if self.config.match_all {
            AllFingerprintMatcher::new(&self.matcher, self.db.all_fingerprints()).run(&self.cache, &mut results);
        } else {
            UrlLessMatcher::new(&self.matcher, self.db.url_less_fingerprints()).run(&self.cache, &mut results);
        }

        report.findings = results.findings();
        report.finished_at = Utc::now();
        info!(
            target,
            findings = report.findings.len(),
            cached = self.cache.len(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Discovery finished."
        );
        report
    }

    /// Advances CMS detection until `stop_after` CMSes are known or the
    /// fingerprint list runs out.
    async fn detect_cms(&self, base: &Url) -> Vec<String> {
        let mut detector = CmsDetector::new(
            &self.fetcher,
            &self.matcher,
            self.db.ordered_fingerprint_list(),
            self.config.chunk_size,
        );
        let mut found = Vec::new();
        let mut skip = HashSet::new();

        while found.len() < self.config.stop_after && !detector.is_exhausted() {
            for name in detector.advance(base, &skip).await {
                if skip.insert(name.clone()) {
                    found.push(name);
                }
            }
        }

        if found.is_empty() {
            info!(probed = detector.position(), "No CMS identified.");
        }
        found
    }
}
