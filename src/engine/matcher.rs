// src/engine/matcher.rs

use std::collections::HashSet;

use tracing::debug;

use crate::engine::models::{Fingerprint, MatchKind, MatchRecord, Response};

/// Decides which fingerprints fire against a response.
pub trait Matcher: Send + Sync {
    fn get_result(&self, fingerprints: &[Fingerprint], response: &Response) -> Vec<MatchRecord>;

    /// Checksums of the site's default error pages. Responses that are one of
    /// these pages never match.
    fn set_error_pages(&mut self, checksums: HashSet<String>);
}

/// The stock matcher: checksum, literal, regex and header rules.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    error_pages: HashSet<String>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_pages(&self) -> &HashSet<String> {
        &self.error_pages
    }
}

impl Matcher for PatternMatcher {
    fn get_result(&self, fingerprints: &[Fingerprint], response: &Response) -> Vec<MatchRecord> {
        if fingerprints.is_empty() {
            return Vec::new();
        }
        if !self.error_pages.is_empty() && self.error_pages.contains(&response.page_checksum()) {
            debug!(url = %response.url, "Response is a default error page, skipping.");
            return Vec::new();
        }

        let body = response.text();
        let mut checksum: Option<String> = None;
        let mut matches = Vec::new();

        for fp in fingerprints {
            if !url_applies(fp, response) {
                continue;
            }
            let output = match &fp.kind {
                MatchKind::Checksum(expected) => {
                    let actual = checksum.get_or_insert_with(|| response.checksum());
                    (*actual == *expected).then(|| fp.output.clone())
                }
                MatchKind::Text(needle) => body.contains(needle.as_str()).then(|| fp.output.clone()),
                MatchKind::Pattern(re) => re.captures(&body).map(|caps| match caps.get(1) {
                    Some(m) if fp.output.contains('%') => fp.output.replace('%', m.as_str()),
                    _ => fp.output.clone(),
                }),
                MatchKind::Header { name, value } => response
                    .header(name)
                    .filter(|h| h.contains(value.as_str()))
                    .map(|_| fp.output.clone()),
            };

            if let Some(output) = output {
                matches.push(MatchRecord {
                    category: fp.category.clone(),
                    name: fp.name.clone(),
                    output,
                    url: fp.url.clone(),
                    weight: fp.weight,
                });
            }
        }
        matches
    }

    fn set_error_pages(&mut self, checksums: HashSet<String>) {
        self.error_pages = checksums;
    }
}

/// A fingerprint tied to a path only applies to responses for that path.
fn url_applies(fp: &Fingerprint, response: &Response) -> bool {
    match &fp.url {
        None => true,
        Some(url) => {
            let wanted = url.trim_start_matches('/');
            wanted.is_empty() || response.url.path().ends_with(wanted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use reqwest::header::{HeaderMap, HeaderValue};
    use url::Url;

    fn fp(url: Option<&str>, kind: MatchKind, output: &str) -> Fingerprint {
        Fingerprint {
            url: url.map(String::from),
            kind,
            category: "CMS".to_string(),
            name: "WordPress".to_string(),
            output: output.to_string(),
            weight: 1,
        }
    }

    fn response(url: &str, body: &str) -> Response {
        Response::new(Url::parse(url).unwrap(), 200, HeaderMap::new(), body.as_bytes().to_vec())
    }

    #[test]
    fn regex_output_template_uses_first_capture() {
        let rule = fp(Some("/readme.html"), MatchKind::Pattern(Regex::new(r"Version (\d+\.\d+)").unwrap()), "%");
        let matches = PatternMatcher::new()
            .get_result(&[rule], &response("http://example.com/readme.html", "<br /> Version 4.9"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].output, "4.9");
    }

    #[test]
    fn url_bound_fingerprint_ignores_other_paths() {
        let rule = fp(Some("/readme.html"), MatchKind::Text("WordPress".into()), "");
        let matches = PatternMatcher::new().get_result(&[rule], &response("http://example.com/index.php", "WordPress"));
        assert!(matches.is_empty());
    }

    #[test]
    fn header_rule_matches_case_insensitively_on_name() {
        let mut headers = HeaderMap::new();
        headers.insert("x-generator", HeaderValue::from_static("Drupal 7"));
        let r = Response::new(Url::parse("http://example.com/").unwrap(), 200, headers, Vec::new());
        let rule = fp(None, MatchKind::Header { name: "X-Generator".into(), value: "Drupal".into() }, "7");
        assert_eq!(PatternMatcher::new().get_result(&[rule], &r).len(), 1);
    }

    #[test]
    fn checksum_rule_compares_body_digest() {
        let page = response("http://example.com/favicon.ico", "icon-bytes");
        let rule = fp(Some("/favicon.ico"), MatchKind::Checksum(page.checksum()), "3.0");
        assert_eq!(PatternMatcher::new().get_result(&[rule], &page)[0].output, "3.0");
    }

    #[test]
    fn error_pages_suppress_every_match() {
        let page = response("http://example.com/readme.html", "Not found WordPress");
        let mut matcher = PatternMatcher::new();
        matcher.set_error_pages(HashSet::from([page.page_checksum()]));
        let rule = fp(None, MatchKind::Text("WordPress".into()), "");
        assert!(matcher.get_result(&[rule], &page).is_empty());
    }
}
