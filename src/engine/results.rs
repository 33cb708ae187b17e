// src/engine/results.rs

use std::collections::BTreeMap;

use crate::engine::models::{Finding, MatchRecord};

pub const CATEGORY_CMS: &str = "CMS";
pub const CATEGORY_PLATFORM: &str = "Platform";
pub const CATEGORY_OS: &str = "Operating System";

/// version -> accumulated weight
pub type VersionWeights = BTreeMap<String, u32>;

/// Weighted findings for one scan: category -> name -> version -> weight.
///
/// Weights only ever grow. Each phase holds the set exclusively while it runs.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    entries: BTreeMap<String, BTreeMap<String, VersionWeights>>,
    cms_matches: Vec<MatchRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: &str, name: &str, version: &str, weight: u32) {
        let slot = self
            .entries
            .entry(category.to_string())
            .or_default()
            .entry(name.to_string())
            .or_default()
            .entry(version.to_string())
            .or_insert(0);
        *slot = slot.saturating_add(weight);
    }

    /// Records a fingerprint match under its own category, name and output.
    pub fn add_cms(&mut self, record: &MatchRecord) {
        self.add(&record.category, &record.name, &record.output, record.weight);
        self.cms_matches.push(record.clone());
    }

    pub fn cms_matches(&self) -> &[MatchRecord] {
        &self.cms_matches
    }

    /// Platform name -> version -> weight. Empty when nothing was recorded.
    pub fn platform_results(&self) -> BTreeMap<String, VersionWeights> {
        self.category(CATEGORY_PLATFORM).cloned().unwrap_or_default()
    }

    pub fn category(&self, category: &str) -> Option<&BTreeMap<String, VersionWeights>> {
        self.entries.get(category)
    }

    pub fn weight(&self, category: &str, name: &str, version: &str) -> Option<u32> {
        self.entries.get(category)?.get(name)?.get(version).copied()
    }

    pub fn contains_name(&self, category: &str, name: &str) -> bool {
        self.entries.get(category).is_some_and(|names| names.contains_key(name))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the set, heaviest first within each category.
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (category, names) in &self.entries {
            let start = findings.len();
            for (name, versions) in names {
                for (version, weight) in versions {
                    findings.push(Finding {
                        category: category.clone(),
                        name: name.clone(),
                        version: version.clone(),
                        weight: *weight,
                    });
                }
            }
            findings[start..].sort_by(|a, b| b.weight.cmp(&a.weight));
        }
        findings
    }
}
