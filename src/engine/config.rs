// src/engine/config.rs

use std::str::FromStr;
use tracing::warn;

/// Configuration settings for a reconnaissance run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of probe groups dispatched per CMS/version batch.
    pub chunk_size: usize,

    /// Batch size for the crawler and interesting-file probes, and the cap on
    /// requests in flight inside the fetcher.
    pub threads: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Redirect hops followed for a single probe.
    pub max_redirects: usize,

    pub user_agent: String,

    /// Number of distinct CMSes to identify before CMS detection stops.
    pub stop_after: usize,

    /// Crawl same-site resources referenced from fetched HTML.
    pub crawl: bool,

    /// Cross-match the whole database against every cached page instead of
    /// only the url-less fingerprints. Noisier.
    pub match_all: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            threads: 10,
            timeout_secs: 10,
            max_redirects: 10,
            user_agent: format!("webrecon/{}", env!("CARGO_PKG_VERSION")),
            stop_after: 1,
            crawl: true,
            match_all: false,
        }
    }
}

impl ScanConfig {
    /// Builds a config from the defaults, overriding fields from
    /// `WEBRECON_<FIELD>` environment variables that parse.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        override_field(&lookup, "WEBRECON_CHUNK_SIZE", &mut config.chunk_size);
        override_field(&lookup, "WEBRECON_THREADS", &mut config.threads);
        override_field(&lookup, "WEBRECON_TIMEOUT_SECS", &mut config.timeout_secs);
        override_field(&lookup, "WEBRECON_MAX_REDIRECTS", &mut config.max_redirects);
        override_field(&lookup, "WEBRECON_USER_AGENT", &mut config.user_agent);
        override_field(&lookup, "WEBRECON_STOP_AFTER", &mut config.stop_after);
        override_field(&lookup, "WEBRECON_CRAWL", &mut config.crawl);
        override_field(&lookup, "WEBRECON_MATCH_ALL", &mut config.match_all);

        // A zero batch size would never advance a cursor.
        config.chunk_size = config.chunk_size.max(1);
        config.threads = config.threads.max(1);
        config
    }
}

fn override_field<F, T>(lookup: &F, key: &str, field: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *field = value,
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable configuration value."),
        }
    }
}
