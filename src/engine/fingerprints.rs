// src/engine/fingerprints.rs

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::engine::error::ScanError;
use crate::engine::models::{Fingerprint, ProbeGroup};

static BUILTIN_DATABASE: &str = include_str!("../../data/fingerprints.json");

/// One piece of OS evidence attached to a package version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEvidence")]
pub struct OsEvidence {
    pub os: String,
    pub os_version: String,
    pub weight: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEvidence {
    Weighted(String, String, u32),
    Plain(String, String),
}

impl From<RawEvidence> for OsEvidence {
    fn from(raw: RawEvidence) -> Self {
        match raw {
            RawEvidence::Weighted(os, os_version, weight) => Self { os, os_version, weight },
            RawEvidence::Plain(os, os_version) => Self { os, os_version, weight: 1 },
        }
    }
}

/// package (lower-case) -> version -> evidence
pub type OsTable = HashMap<String, HashMap<String, Vec<OsEvidence>>>;

/// The fingerprint database, as loaded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FingerprintDb {
    #[serde(default)]
    error_urls: Vec<String>,
    #[serde(default)]
    cms: Vec<Fingerprint>,
    #[serde(default)]
    platform: Vec<Fingerprint>,
    #[serde(default)]
    javascript: Vec<Fingerprint>,
    #[serde(default)]
    interesting: Vec<Fingerprint>,
    #[serde(default)]
    os: OsTable,
}

impl FingerprintDb {
    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        let mut db: Self = serde_json::from_str(json)?;
        // Lookups lower-case the package name, so the table must match.
        db.os = db.os.into_iter().map(|(pkg, versions)| (pkg.to_lowercase(), versions)).collect();
        info!(
            cms = db.cms.len(),
            platform = db.platform.len(),
            javascript = db.javascript.len(),
            interesting = db.interesting.len(),
            os_packages = db.os.len(),
            "Fingerprint database loaded."
        );
        Ok(db)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The database embedded in the binary.
    pub fn builtin() -> Result<Self, ScanError> {
        Self::from_json(BUILTIN_DATABASE)
    }

    /// Paths expected not to exist on any site.
    pub fn error_urls(&self) -> &[String] {
        &self.error_urls
    }

    /// All CMS fingerprints grouped by path, most shared path first.
    pub fn ordered_fingerprint_list(&self) -> Vec<ProbeGroup> {
        group_by_url(self.cms.iter())
    }

    /// Version fingerprints for one CMS, grouped by path.
    pub fn fingerprints_for_cms(&self, name: &str) -> Vec<ProbeGroup> {
        group_by_url(self.cms.iter().filter(|fp| fp.name == name))
    }

    pub fn os_fingerprints(&self) -> &OsTable {
        &self.os
    }

    /// Server-side platform rules (header based). Matched against the cache
    /// before OS inference, which folds them in.
    pub fn platform_fingerprints(&self) -> &[Fingerprint] {
        &self.platform
    }

    pub fn js_fingerprints(&self) -> &[Fingerprint] {
        &self.javascript
    }

    pub fn interesting_fingerprints(&self) -> Vec<ProbeGroup> {
        group_by_url(self.interesting.iter())
    }

    /// CMS and interesting-file rules that need no request of their own.
    ///
    /// Platform and JavaScript rules are left out: each has its own pass over
    /// the cache, and running them twice would count every match twice.
    pub fn url_less_fingerprints(&self) -> Vec<Fingerprint> {
        self.cms
            .iter()
            .chain(&self.interesting)
            .filter(|fp| fp.url.is_none())
            .cloned()
            .collect()
    }

    pub fn all_fingerprints(&self) -> Vec<Fingerprint> {
        self.iter_all().cloned().collect()
    }

    fn iter_all(&self) -> impl Iterator<Item = &Fingerprint> {
        self.cms
            .iter()
            .chain(&self.platform)
            .chain(&self.javascript)
            .chain(&self.interesting)
    }
}

/// Groups fingerprints carrying a URL so each path is fetched once. Larger
/// groups come first: a path shared by many fingerprints tells more apart.
fn group_by_url<'a>(fingerprints: impl Iterator<Item = &'a Fingerprint>) -> Vec<ProbeGroup> {
    let mut groups: BTreeMap<String, Vec<Fingerprint>> = BTreeMap::new();
    for fp in fingerprints {
        if let Some(url) = &fp.url {
            groups.entry(url.clone()).or_default().push(fp.clone());
        }
    }

    let mut ordered: Vec<ProbeGroup> = groups
        .into_iter()
        .map(|(url, fingerprints)| ProbeGroup { url, fingerprints })
        .collect();
    // Stable sort keeps path order among equal sizes.
    ordered.sort_by(|a, b| b.fingerprints.len().cmp(&a.fingerprints.len()));
    ordered
}
