mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{base, fingerprint, page, MockFetcher};
use serde_json::json;
use webrecon::engine::cache::Cache;
use webrecon::engine::discovery::chunked::{CmsDetector, VersionDetector};
use webrecon::engine::matcher::PatternMatcher;
use webrecon::engine::models::ProbeGroup;
use webrecon::engine::results::{ResultSet, CATEGORY_CMS};

fn group(path: &str, cms: &str, needle: &str) -> ProbeGroup {
    ProbeGroup {
        url: path.to_string(),
        fingerprints: vec![fingerprint(json!({
            "url": path, "type": "string", "match": needle, "category": "CMS", "cms": cms
        }))],
    }
}

fn five_groups() -> Vec<ProbeGroup> {
    vec![
        group("/a", "Drupal", "drupal"),
        group("/b", "Joomla", "joomla"),
        group("/c", "WordPress", "wp-content"),
        group("/d", "TYPO3", "typo3"),
        group("/e", "Magento", "mage"),
    ]
}

#[tokio::test]
async fn cms_cursor_advances_by_chunk_size_without_rescanning() {
    let fetcher = MockFetcher::new(Cache::new());
    let matcher = PatternMatcher::new();
    let mut detector = CmsDetector::new(&fetcher, &matcher, five_groups(), 2);
    let skip = HashSet::new();

    let mut positions = Vec::new();
    while !detector.is_exhausted() {
        assert!(detector.advance(&base(), &skip).await.is_empty());
        positions.push(detector.position());
    }

    assert_eq!(positions, vec![2, 4, 6]);
    assert_eq!(
        fetcher.batches(),
        vec![
            vec!["/a".to_string(), "/b".to_string()],
            vec!["/c".to_string(), "/d".to_string()],
            vec!["/e".to_string()],
        ]
    );
}

#[tokio::test]
async fn cms_detection_stops_at_first_matching_batch() {
    let fetcher = MockFetcher::new(Cache::new()).with_page("/c", page("<link href='/wp-content/x.css'>"));
    let matcher = PatternMatcher::new();
    let mut detector = CmsDetector::new(&fetcher, &matcher, five_groups(), 2);
    let skip = HashSet::new();

    assert!(detector.advance(&base(), &skip).await.is_empty());
    let found = detector.advance(&base(), &skip).await;

    assert_eq!(found, vec!["WordPress".to_string()]);
    assert_eq!(detector.position(), 4);
    assert!(!detector.is_exhausted());
    assert_eq!(fetcher.batches().len(), 2);
}

#[tokio::test]
async fn cms_match_waits_for_the_rest_of_its_batch() {
    let cache = Cache::new();
    let fetcher = MockFetcher::new(cache.clone())
        .with_page("/a", page("drupal"))
        .with_page("/b", page("joomla").delayed(Duration::from_millis(50)));
    let matcher = PatternMatcher::new();
    let mut detector = CmsDetector::new(&fetcher, &matcher, five_groups(), 2);

    let found = detector.advance(&base(), &HashSet::new()).await;

    // The slow response is cached by the time the phase returns, but it is
    // not matched: the batch already produced its answer.
    assert_eq!(found, vec!["Drupal".to_string()]);
    assert!(cache.get("http://example.com/b").is_some());
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn skipped_cms_fingerprints_are_not_requested() {
    let fetcher = MockFetcher::new(Cache::new()).with_page("/a", page("drupal"));
    let matcher = PatternMatcher::new();
    let mut detector = CmsDetector::new(&fetcher, &matcher, five_groups(), 2);
    let skip: HashSet<String> = ["Drupal".to_string()].into_iter().collect();

    assert!(detector.advance(&base(), &skip).await.is_empty());
    assert_eq!(fetcher.batches(), vec![vec!["/b".to_string()]]);
}

#[tokio::test]
async fn version_detector_with_no_fingerprints_adds_nothing() {
    let fetcher = MockFetcher::new(Cache::new());
    let matcher = PatternMatcher::new();
    let mut results = ResultSet::new();

    let recorded = VersionDetector::new(&fetcher, &matcher, 10)
        .run(&base(), "WordPress", Vec::new(), &mut results)
        .await;

    assert_eq!(recorded, 0);
    assert!(results.is_empty());
    assert!(fetcher.batches().is_empty());
}

#[tokio::test]
async fn version_detector_walks_every_chunk() {
    let fetcher = MockFetcher::new(Cache::new())
        .with_page("/readme.html", page("<br />\n Version 4.9.8"))
        .with_page("/wp-includes/version.js", page("ver=4.9.8"));
    let matcher = PatternMatcher::new();
    let groups = vec![
        ProbeGroup {
            url: "/readme.html".into(),
            fingerprints: vec![fingerprint(json!({
                "url": "/readme.html", "type": "regex", "match": "Version (\\d+\\.\\d+\\.\\d+)",
                "category": "CMS", "cms": "WordPress", "output": "%"
            }))],
        },
        group("/missing", "WordPress", "never"),
        ProbeGroup {
            url: "/wp-includes/version.js".into(),
            fingerprints: vec![fingerprint(json!({
                "url": "/wp-includes/version.js", "type": "string", "match": "ver=4.9.8",
                "category": "CMS", "cms": "WordPress", "output": "4.9.8"
            }))],
        },
    ];
    let mut results = ResultSet::new();

    let recorded = VersionDetector::new(&fetcher, &matcher, 1)
        .run(&base(), "WordPress", groups, &mut results)
        .await;

    assert_eq!(recorded, 2);
    assert_eq!(fetcher.batches().len(), 3);
    assert_eq!(results.weight(CATEGORY_CMS, "WordPress", "4.9.8"), Some(2));
    assert_eq!(results.cms_matches().len(), 2);
}
