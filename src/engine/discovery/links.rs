// src/engine/discovery/links.rs

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::engine::cache::Cache;
use crate::engine::fetcher::{FetchMode, Fetcher};
use crate::engine::models::ProbeGroup;

// Matches src="..." and src='...' anywhere, broken markup included.
static RE_SRC_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src\s*=\s*["']([^"']+)["']"#).unwrap());

/// Reference schemes that never point at a fetchable resource.
const IGNORED_PREFIXES: &[&str] = &["data:", "javascript:", "mailto:", "#"];

/// Raw scan of the body for `src` attribute values.
pub fn scan_src_attributes(html: &str) -> HashSet<String> {
    RE_SRC_ATTRIBUTE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Structural scan: `src` of `<script>` and `<img>`, `href` of `<link>`.
pub fn scan_resource_tags(html: &str) -> HashSet<String> {
    let document = Html::parse_document(html);
    let mut found = HashSet::new();

    if let Ok(selector) = Selector::parse("script[src], img[src]") {
        found.extend(document.select(&selector).filter_map(|el| el.value().attr("src")).map(String::from));
    }
    if let Ok(selector) = Selector::parse("link[href]") {
        found.extend(document.select(&selector).filter_map(|el| el.value().attr("href")).map(String::from));
    }
    found
}

/// Keeps references that stay on the target and makes them relative.
///
/// Absolute references (`http://`, `https://`, `//`) survive only when their
/// host is part of `target_host`, and lose their scheme and host. Relative
/// references pass through as they are.
pub fn scope_reference(reference: &str, target_host: &str) -> Option<String> {
    let reference = reference.trim();
    let lowered = reference.to_ascii_lowercase();
    if reference.is_empty() || IGNORED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let absolute = lowered.starts_with("http://") || lowered.starts_with("https://") || reference.starts_with("//");
    if !absolute {
        return Some(reference.to_string());
    }

    let parts: Vec<&str> = reference.split('/').collect();
    let host = parts.get(2).filter(|h| !h.is_empty())?;
    if !target_host.contains(*host) {
        debug!(reference, "Out-of-scope reference discarded.");
        return None;
    }
    let relative = parts[3..].join("/");
    (!relative.is_empty()).then_some(relative)
}

/// Host segment of a URL string, as written (port included).
fn host_segment(url: &str) -> &str {
    url.split('/').nth(2).unwrap_or_default()
}

/// Grows the cache with same-site resources referenced from fetched HTML.
pub struct LinkCrawler<'a, F> {
    fetcher: &'a F,
    threads: usize,
}

impl<'a, F: Fetcher> LinkCrawler<'a, F> {
    pub fn new(fetcher: &'a F, threads: usize) -> Self {
        Self { fetcher, threads: threads.max(1) }
    }

    /// Every in-scope reference found in cached HTML, sorted.
    pub fn discover(&self, base: &Url, cache: &Cache) -> BTreeSet<String> {
        let target_host = host_segment(base.as_str());
        let mut resources = BTreeSet::new();

        for response in cache.responses() {
            let is_html = response.content_type().is_some_and(|ct| ct.contains("text/html"));
            if !is_html {
                continue;
            }
            let body = response.text();
            let references = scan_src_attributes(&body).into_iter().chain(scan_resource_tags(&body));
            resources.extend(references.filter_map(|r| scope_reference(&r, target_host)));
        }
        resources
    }

    /// Fetches every discovered resource in batches of `threads`. Returns the
    /// number of resources requested.
    pub async fn run(&self, base: &Url, cache: &Cache) -> usize {
        let resources: Vec<ProbeGroup> = self.discover(base, cache).into_iter().map(ProbeGroup::url_only).collect();
        info!(resources = resources.len(), "Crawling discovered resources.");

        for batch in resources.chunks(self.threads) {
            let mut rx = self.fetcher.run(base, batch.to_vec(), FetchMode::Normal);
            // Only the cache side effect matters here.
            while rx.recv().await.is_some() {}
        }

        info!(cached = cache.len(), "Crawl finished.");
        resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_scan_tolerates_broken_markup() {
        let found = scan_src_attributes(r#"<img src='/a.png' <script src="js/app.js"></scr"#);
        assert!(found.contains("/a.png"));
        assert!(found.contains("js/app.js"));
    }

    #[test]
    fn tag_scan_collects_script_img_and_link() {
        let html = r#"<html><head><link rel="stylesheet" href="/css/site.css">
            <script src="/js/app.js"></script></head>
            <body><img src="logo.png"><a href="/about">about</a></body></html>"#;
        let found = scan_resource_tags(html);
        assert_eq!(found.len(), 3);
        assert!(found.contains("/css/site.css"));
        assert!(!found.contains("/about"));
    }

    #[test]
    fn in_scope_absolute_reference_is_made_relative() {
        let host = host_segment("http://example.com/");
        assert_eq!(scope_reference("http://example.com/js/app.js", host).as_deref(), Some("js/app.js"));
        assert_eq!(scope_reference("//example.com/img/x.png", host).as_deref(), Some("img/x.png"));
        assert_eq!(scope_reference("http://evil.com/x.js", host), None);
    }

    #[test]
    fn relative_references_pass_through_and_junk_is_dropped() {
        assert_eq!(scope_reference("/static/a.js", "example.com").as_deref(), Some("/static/a.js"));
        assert_eq!(scope_reference("data:image/png;base64,AAAA", "example.com"), None);
        assert_eq!(scope_reference("", "example.com"), None);
        assert_eq!(scope_reference("http:///x.js", "example.com"), None);
    }

    #[test]
    fn only_scheme_prefixed_references_count_as_absolute() {
        assert_eq!(scope_reference("httpdocs/x.js", "example.com").as_deref(), Some("httpdocs/x.js"));
        assert_eq!(scope_reference("https-assets/a.css", "example.com").as_deref(), Some("https-assets/a.css"));
        assert_eq!(scope_reference("HTTPS://example.com/a.js", "example.com").as_deref(), Some("a.js"));
    }
}
