// src/engine/discovery/os.rs

//! Operating system inference.
//!
//! Server software versions correlate with the OS release that shipped them:
//! `Apache/2.2.22` points at Debian 7 or Ubuntu 12.04. Every cached response
//! contributes weighted votes, platform versions found by earlier phases add
//! theirs, and an OS name spelled out in a header (`Apache (Debian)`) boosts
//! the candidates it names. The heaviest candidates win, ties included.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::cache::Cache;
use crate::engine::fingerprints::OsTable;
use crate::engine::models::{PackageMatch, Response};
use crate::engine::results::{ResultSet, VersionWeights, CATEGORY_OS};

/// Added to a candidate for every header hint naming its OS.
pub const HINT_BOOST: u32 = 100;

/// (os, os_version) -> accumulated weight
pub type Tally = BTreeMap<(String, String), u32>;

/// Evidence gathered during a single inference run.
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub tally: Tally,
    /// Lower-cased OS names taken from parenthesised `Server` segments, in the
    /// order they were seen. One entry per response carrying a hint.
    pub hints: Vec<String>,
}

impl Evidence {
    /// Boosts every candidate whose OS name contains a hint.
    pub fn apply_hint_boost(&mut self) {
        for hint in &self.hints {
            for ((os, _), weight) in self.tally.iter_mut() {
                if os.to_lowercase().contains(hint.as_str()) {
                    *weight = weight.saturating_add(HINT_BOOST);
                }
            }
        }
    }

    /// Every candidate sharing the top weight.
    pub fn leaders(&self) -> Vec<(&str, &str, u32)> {
        let Some(max) = self.tally.values().copied().max() else {
            return Vec::new();
        };
        self.tally
            .iter()
            .filter(|(_, weight)| **weight == max)
            .map(|((os, version), weight)| (os.as_str(), version.as_str(), *weight))
            .collect()
    }
}

pub struct OsInferencer<'a> {
    table: &'a OsTable,
    matched_packages: BTreeSet<PackageMatch>,
}

impl<'a> OsInferencer<'a> {
    pub fn new(table: &'a OsTable) -> Self {
        Self { table, matched_packages: BTreeSet::new() }
    }

    /// Infers the OS from the whole cache and records the winners in
    /// `results`.
    pub fn run(&mut self, cache: &Cache, results: &mut ResultSet) {
        let responses = cache.responses();
        info!(responses = responses.len(), "Starting OS inference.");

        let mut evidence = self.collect(&responses);
        self.fold_platforms(&mut evidence, &results.platform_results());
        evidence.apply_hint_boost();

        let leaders = evidence.leaders();
        for (os, version, weight) in &leaders {
            info!(os, version, weight, "Operating system candidate selected.");
            results.add(CATEGORY_OS, os, version, *weight);
        }
        if leaders.is_empty() {
            info!("No operating system evidence found.");
        }
    }

    /// Tallies `Server` and `X-Powered-By` evidence across responses.
    pub fn collect(&mut self, responses: &[Arc<Response>]) -> Evidence {
        let mut evidence = Evidence::default();
        for response in responses {
            self.find_match(response, &mut evidence);
        }
        evidence
    }

    /// Adds votes for platforms already recorded by earlier phases, scaled by
    /// how often each was seen.
    pub fn fold_platforms(&mut self, evidence: &mut Evidence, platforms: &BTreeMap<String, VersionWeights>) {
        for (platform, versions) in platforms {
            let package = platform.to_lowercase();
            for (version, seen) in versions {
                let key = platform_lookup_version(platform, version).to_lowercase();
                if !self.add_evidence(&package, &key, *seen, &mut evidence.tally) {
                    debug!(platform = %platform, version = %key, "No OS evidence for platform version.");
                }
            }
        }
    }

    pub fn matched_packages(&self) -> &BTreeSet<PackageMatch> {
        &self.matched_packages
    }

    fn find_match(&mut self, response: &Response, evidence: &mut Evidence) {
        if let Some(line) = response.header("server") {
            let (hint, rest) = split_os_hint(line);
            if let Some(hint) = hint {
                evidence.hints.push(hint);
            }
            for token in rest.split(' ') {
                match parse_package_token(token) {
                    Some((package, version)) => {
                        self.add_evidence(&package, &version, 1, &mut evidence.tally);
                    }
                    None if !token.is_empty() => debug!(token, "Skipping malformed Server token."),
                    None => {}
                }
            }
        }

        if let Some(line) = response.header("x-powered-by") {
            if let Some((package, version)) = parse_package_token(line.trim()) {
                self.add_evidence(&package, &version, 1, &mut evidence.tally);
            }
        }
    }

    /// Adds `multiplier * weight` for every evidence tuple of the package
    /// version. Returns false on a lookup miss.
    fn add_evidence(&mut self, package: &str, version: &str, multiplier: u32, tally: &mut Tally) -> bool {
        let Some(entries) = self.table.get(package).and_then(|versions| versions.get(version)) else {
            return false;
        };
        for entry in entries {
            let slot = tally.entry((entry.os.clone(), entry.os_version.clone())).or_insert(0);
            *slot = slot.saturating_add(multiplier.saturating_mul(entry.weight));
            self.matched_packages.insert(PackageMatch {
                os: entry.os.clone(),
                os_version: entry.os_version.clone(),
                package: package.to_string(),
                version: version.to_string(),
            });
        }
        true
    }
}

/// Pulls a parenthesised OS name out of a `Server` line.
///
/// Returns the lower-cased hint (if non-empty) and the line with the
/// parenthesised segment removed.
pub fn split_os_hint(line: &str) -> (Option<String>, String) {
    let Some(open) = line.find('(') else {
        return (None, line.to_string());
    };
    let Some(close) = line[open..].find(')').map(|i| open + i) else {
        return (None, line.to_string());
    };

    let hint = line[open + 1..close].trim().to_lowercase();
    let rest = format!("{} {}", line[..open].trim_end(), &line[close + 1..]);
    ((!hint.is_empty()).then_some(hint), rest)
}

/// Parses `name/version`, lower-casing both halves.
pub fn parse_package_token(token: &str) -> Option<(String, String)> {
    let (name, version) = token.split_once('/')?;
    if name.is_empty() || version.is_empty() || version.contains('/') {
        return None;
    }
    Some((name.to_lowercase(), version.to_lowercase()))
}

/// Maps a recorded platform version onto the granularity the OS table uses.
///
/// ASP.NET reports full runtime builds (`4.0.30319`); the table is keyed by
/// `major.minor`, except for the 4.5 line which is keyed by `4.5.x`.
pub fn platform_lookup_version(platform: &str, version: &str) -> String {
    if platform != "ASP.NET" {
        return version.to_string();
    }
    let keep = if version.starts_with("4.5") { 5 } else { 3 };
    version.chars().take(keep).collect()
}
