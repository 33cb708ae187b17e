// src/engine/models.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::engine::error::ScanError;

// --- Fingerprints ---

/// How a fingerprint decides whether a response matches.
#[derive(Debug, Clone)]
pub enum MatchKind {
    /// SHA-256 of the body equals the given hex digest.
    Checksum(String),
    /// The body contains the literal string.
    Text(String),
    /// The body matches the regex. Capture group 1 feeds the output template.
    Pattern(Regex),
    /// The named header's value contains the literal string.
    Header { name: String, value: String },
}

/// A single matching rule from the fingerprint database.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawFingerprint")]
pub struct Fingerprint {
    /// Path to request. `None` for rules applied to already-fetched content.
    pub url: Option<String>,
    pub kind: MatchKind,
    pub category: String,
    /// CMS, platform or library name this rule identifies.
    pub name: String,
    /// Output template, usually a version. `%` is replaced by the first
    /// regex capture.
    pub output: String,
    pub weight: u32,
}

#[derive(Deserialize)]
struct RawFingerprint {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "match")]
    pattern: String,
    header: Option<String>,
    category: String,
    cms: Option<String>,
    name: Option<String>,
    #[serde(default)]
    output: String,
    #[serde(default = "default_weight")]
    weight: u32,
}

fn default_weight() -> u32 {
    1
}

impl TryFrom<RawFingerprint> for Fingerprint {
    type Error = String;

    fn try_from(raw: RawFingerprint) -> Result<Self, Self::Error> {
        let kind = match raw.kind.as_str() {
            "checksum" | "md5" | "sha256" => MatchKind::Checksum(raw.pattern.to_lowercase()),
            "string" => MatchKind::Text(raw.pattern),
            "regex" => MatchKind::Pattern(
                Regex::new(&raw.pattern).map_err(|e| format!("bad regex {:?}: {}", raw.pattern, e))?,
            ),
            "header" => MatchKind::Header {
                name: raw
                    .header
                    .ok_or_else(|| "header fingerprint without a 'header' field".to_string())?,
                value: raw.pattern,
            },
            other => return Err(format!("unknown fingerprint type {:?}", other)),
        };
        let name = raw
            .cms
            .or(raw.name)
            .ok_or_else(|| "fingerprint without a 'cms' or 'name' field".to_string())?;

        Ok(Self {
            url: raw.url.filter(|u| !u.is_empty()),
            kind,
            category: raw.category,
            name,
            output: raw.output,
            weight: raw.weight,
        })
    }
}

/// Fingerprints sharing one request path. A single fetch serves them all.
#[derive(Debug, Clone)]
pub struct ProbeGroup {
    pub url: String,
    pub fingerprints: Vec<Fingerprint>,
}

impl ProbeGroup {
    /// A bare URL probe carrying no fingerprints. Used to pull resources into
    /// the cache.
    pub fn url_only(url: impl Into<String>) -> Self {
        Self { url: url.into(), fingerprints: Vec::new() }
    }
}

// --- Responses ---

/// The result of one fetch. Immutable once created.
#[derive(Debug, Clone)]
pub struct Response {
    /// The URL that was requested.
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Redirect targets followed, in order. Empty when the first answer was final.
    pub history: Vec<Url>,
}

impl Response {
    pub fn new(url: Url, status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self { url, status, headers, body, history: Vec::new() }
    }

    pub fn with_history(mut self, history: Vec<Url>) -> Self {
        self.history = history;
        self
    }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn final_url(&self) -> &Url {
        self.history.last().unwrap_or(&self.url)
    }

    pub fn is_redirected(&self) -> bool {
        !self.history.is_empty()
    }

    /// SHA-256 of the raw body, lower-case hex.
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(&self.body))
    }

    /// SHA-256 of the body with the request path cut out.
    ///
    /// Default "not found" pages often echo the missing path back, which would
    /// give every probe a different digest.
    pub fn page_checksum(&self) -> String {
        let path = self.url.path();
        if path.len() <= 1 {
            return self.checksum();
        }
        let stripped = self.text().replace(path, "");
        format!("{:x}", Sha256::digest(stripped.as_bytes()))
    }
}

// --- Results ---

/// A fingerprint that fired against a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub category: String,
    pub name: String,
    pub output: String,
    pub url: Option<String>,
    pub weight: u32,
}

/// One flattened entry of the result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub name: String,
    pub version: String,
    pub weight: u32,
}

/// A server package whose version correlated with an OS release.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageMatch {
    pub os: String,
    pub os_version: String,
    pub package: String,
    pub version: String,
}

/// Everything a scan learned about its target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: String,
    /// `None` when the redirect probe failed.
    pub canonical_url: Option<String>,
    pub redirected: bool,
    /// Number of distinct default error pages learned.
    pub error_pages: usize,
    pub cms: Vec<String>,
    pub findings: Vec<Finding>,
    pub matched_packages: Vec<PackageMatch>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn findings_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.category == category)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
