#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;
use webrecon::engine::cache::Cache;
use webrecon::engine::fetcher::{FetchMode, FetchOutcome, Fetcher};
use webrecon::engine::models::{Fingerprint, ProbeGroup, Response};
use webrecon::ScanError;

/// A canned page served by `MockFetcher`.
#[derive(Debug, Clone)]
pub struct MockPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Absolute URLs the request "redirected" through.
    pub history: Vec<String>,
    /// Served from a spawned task after this long instead of immediately.
    pub delay: Option<Duration>,
}

pub fn page(body: &str) -> MockPage {
    MockPage { status: 200, headers: Vec::new(), body: body.to_string(), history: Vec::new(), delay: None }
}

impl MockPage {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn redirected_to(mut self, url: &str) -> Self {
        self.history.push(url.to_string());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_response(&self, url: Url) -> Response {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let history = self.history.iter().map(|u| Url::parse(u).unwrap()).collect();
        Response::new(url, self.status, headers, self.body.as_bytes().to_vec()).with_history(history)
    }
}

/// In-memory `Fetcher`: pages are keyed by path, every dispatched batch is
/// recorded, unknown paths behave like failed requests.
pub struct MockFetcher {
    pages: HashMap<String, MockPage>,
    cache: Cache,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(cache: Cache) -> Self {
        Self { pages: HashMap::new(), cache, batches: Mutex::new(Vec::new()) }
    }

    pub fn with_page(mut self, path: &str, page: MockPage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    /// Paths of every batch dispatched so far, in dispatch order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    fn serve(&self, url: &Url) -> Option<Arc<Response>> {
        let page = self.pages.get(url.path())?;
        Some(self.cache.insert(page.into_response(url.clone())))
    }
}

impl Fetcher for MockFetcher {
    fn run(&self, base: &Url, batch: Vec<ProbeGroup>, mode: FetchMode) -> mpsc::Receiver<FetchOutcome> {
        self.batches.lock().unwrap().push(batch.iter().map(|g| g.url.clone()).collect());

        let (tx, rx) = mpsc::channel(batch.len().max(1));
        for group in batch {
            let Ok(url) = base.join(&group.url) else { continue };
            let Some(page) = self.pages.get(url.path()) else { continue };

            if let Some(delay) = page.delay {
                let (page, cache, tx) = (page.clone(), self.cache.clone(), tx.clone());
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let response = cache.insert(page.into_response(url));
                    if let Some(outcome) = outcome_for(mode, group.fingerprints, response) {
                        let _ = tx.send(outcome).await;
                    }
                });
                continue;
            }

            let response = self.cache.insert(page.into_response(url));
            if let Some(outcome) = outcome_for(mode, group.fingerprints, response) {
                tx.try_send(outcome).unwrap();
            }
        }
        rx
    }

    async fn fetch(&self, url: &str) -> Result<Response, ScanError> {
        let url = Url::parse(url)?;
        match self.serve(&url) {
            Some(response) => Ok(response.as_ref().clone()),
            None => Err(ScanError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "no such page"))),
        }
    }
}

fn outcome_for(mode: FetchMode, fingerprints: Vec<Fingerprint>, response: Arc<Response>) -> Option<FetchOutcome> {
    match mode {
        FetchMode::Baseline => Some(FetchOutcome::Baseline {
            checksum: response.page_checksum(),
            url: response.url.to_string(),
        }),
        FetchMode::Normal if response.status == 404 => None,
        FetchMode::Normal => Some(FetchOutcome::Page { fingerprints, response }),
    }
}

pub fn fingerprint(json: Value) -> Fingerprint {
    serde_json::from_value(json).unwrap()
}

pub fn base() -> Url {
    Url::parse("http://example.com/").unwrap()
}

pub fn response(url: &str, page: MockPage) -> Arc<Response> {
    Arc::new(page.into_response(Url::parse(url).unwrap()))
}
