// src/engine/cache.rs

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::engine::models::Response;

/// Every response fetched during a scan.
///
/// Cloning the cache clones a handle: the fetcher appends through its copy
/// while phases read through theirs. Entries are keyed by requested URL, so
/// fetching the same path twice keeps the first answer.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    inner: Arc<RwLock<CacheInner>>,
}

#[derive(Debug, Default)]
struct CacheInner {
    by_url: HashMap<String, Arc<Response>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a response and returns the cached copy for its URL.
    pub fn insert(&self, response: Response) -> Arc<Response> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner
            .by_url
            .entry(response.url.to_string())
            .or_insert_with(|| Arc::new(response))
            .clone()
    }

    pub fn get(&self, url: &str) -> Option<Arc<Response>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_url.get(url).cloned()
    }

    /// Snapshot of everything cached so far. Order carries no meaning.
    pub fn responses(&self) -> Vec<Arc<Response>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.by_url.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use url::Url;

    #[test]
    fn clones_share_storage_and_keep_first_response() {
        let cache = Cache::new();
        let handle = cache.clone();
        let url = Url::parse("http://example.com/a").unwrap();

        handle.insert(Response::new(url.clone(), 200, HeaderMap::new(), b"first".to_vec()));
        let kept = cache.insert(Response::new(url, 200, HeaderMap::new(), b"second".to_vec()));

        assert_eq!(cache.len(), 1);
        assert_eq!(kept.body, b"first");
        assert!(cache.get("http://example.com/a").is_some());
    }
}
