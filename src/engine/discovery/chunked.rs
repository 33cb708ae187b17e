// src/engine/discovery/chunked.rs

use std::collections::HashSet;

use tracing::{debug, info};
use url::Url;

use crate::engine::fetcher::{FetchMode, FetchOutcome, Fetcher};
use crate::engine::matcher::Matcher;
use crate::engine::models::ProbeGroup;
use crate::engine::results::ResultSet;

/// A resumable position in a list that is consumed in fixed-size slices.
///
/// The index moves forward by exactly `chunk_size` per batch and no slice is
/// handed out twice.
#[derive(Debug, Clone)]
pub struct ChunkCursor<T> {
    items: Vec<T>,
    chunk_size: usize,
    index: usize,
}

impl<T> ChunkCursor<T> {
    pub fn new(items: Vec<T>, chunk_size: usize) -> Self {
        Self { items, chunk_size: chunk_size.max(1), index: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.items.len()
    }

    /// The slice `[index, index + chunk_size)`, clipped to the list end.
    pub fn next_batch(&mut self) -> Option<&[T]> {
        if self.is_exhausted() {
            return None;
        }
        let start = self.index;
        let end = (start + self.chunk_size).min(self.items.len());
        self.index += self.chunk_size;
        Some(&self.items[start..end])
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Finds which CMS a site runs, one batch at a time.
///
/// `advance` stops at the first batch that produces a match, so a scan only
/// pays for probes up to the first signature that fires.
pub struct CmsDetector<'a, F, M> {
    fetcher: &'a F,
    matcher: &'a M,
    cursor: ChunkCursor<ProbeGroup>,
}

impl<'a, F: Fetcher, M: Matcher> CmsDetector<'a, F, M> {
    pub fn new(fetcher: &'a F, matcher: &'a M, fingerprints: Vec<ProbeGroup>, chunk_size: usize) -> Self {
        Self { fetcher, matcher, cursor: ChunkCursor::new(fingerprints, chunk_size) }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Probes the next batch and returns the CMS names it matched, if any.
    ///
    /// Fingerprints of CMSes in `skip` are dropped from the batch before
    /// dispatch.
    pub async fn advance(&mut self, base: &Url, skip: &HashSet<String>) -> Vec<String> {
        let Some(batch) = self.cursor.next_batch() else {
            return Vec::new();
        };
        let batch: Vec<ProbeGroup> = batch
            .iter()
            .filter_map(|group| {
                let fingerprints: Vec<_> = group
                    .fingerprints
                    .iter()
                    .filter(|fp| !skip.contains(&fp.name))
                    .cloned()
                    .collect();
                (!fingerprints.is_empty()).then(|| ProbeGroup { url: group.url.clone(), fingerprints })
            })
            .collect();
        if batch.is_empty() {
            return Vec::new();
        }

        debug!(position = self.cursor.position(), probes = batch.len(), "Dispatching CMS batch.");
        let mut rx = self.fetcher.run(base, batch, FetchMode::Normal);
        let mut names: Vec<String> = Vec::new();
        while let Some(outcome) = rx.recv().await {
            // Once a CMS is known the rest of the batch is only drained, so no
            // fetch is still writing to the cache when the next phase starts.
            if !names.is_empty() {
                continue;
            }
            let FetchOutcome::Page { fingerprints, response } = outcome else {
                continue;
            };
            for m in self.matcher.get_result(&fingerprints, &response) {
                if !skip.contains(&m.name) && !names.contains(&m.name) {
                    names.push(m.name);
                }
            }
            if !names.is_empty() {
                info!(url = %response.url, cms = ?names, "CMS identified.");
            }
        }
        names
    }
}

/// Pins down the version of a known CMS.
///
/// Unlike CMS detection every batch is processed: several partial signals
/// together narrow the version down further than the first one alone.
pub struct VersionDetector<'a, F, M> {
    fetcher: &'a F,
    matcher: &'a M,
    chunk_size: usize,
}

impl<'a, F: Fetcher, M: Matcher> VersionDetector<'a, F, M> {
    pub fn new(fetcher: &'a F, matcher: &'a M, chunk_size: usize) -> Self {
        Self { fetcher, matcher, chunk_size }
    }

    /// Runs the CMS's version fingerprints and records every match. Returns
    /// the number of matches recorded.
    pub async fn run(&self, base: &Url, cms: &str, fingerprints: Vec<ProbeGroup>, results: &mut ResultSet) -> usize {
        info!(cms, probes = fingerprints.len(), "Starting version detection.");
        let mut cursor = ChunkCursor::new(fingerprints, self.chunk_size);
        let mut recorded = 0;

        while let Some(batch) = cursor.next_batch() {
            let mut rx = self.fetcher.run(base, batch.to_vec(), FetchMode::Normal);
            while let Some(outcome) = rx.recv().await {
                let FetchOutcome::Page { fingerprints, response } = outcome else {
                    continue;
                };
                for m in self.matcher.get_result(&fingerprints, &response) {
                    debug!(cms = %m.name, version = %m.output, url = %response.url, "Version fingerprint matched.");
                    results.add_cms(&m);
                    recorded += 1;
                }
            }
        }

        info!(cms, matches = recorded, "Version detection finished.");
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_steps_by_chunk_size_without_overlap() {
        let mut cursor = ChunkCursor::new((0..7).collect::<Vec<_>>(), 3);
        assert_eq!(cursor.next_batch(), Some(&[0, 1, 2][..]));
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.next_batch(), Some(&[3, 4, 5][..]));
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.next_batch(), Some(&[6][..]));
        assert_eq!(cursor.position(), 9);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next_batch(), None);
        assert_eq!(cursor.position(), 9);
    }

    #[test]
    fn empty_cursor_starts_exhausted() {
        let cursor: ChunkCursor<u8> = ChunkCursor::new(Vec::new(), 5);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn zero_chunk_size_still_advances() {
        let mut cursor = ChunkCursor::new(vec!['a', 'b'], 0);
        assert_eq!(cursor.next_batch(), Some(&['a'][..]));
        assert_eq!(cursor.position(), 1);
    }
}
