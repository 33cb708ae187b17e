// src/engine/fetcher.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};
use url::Url;

use crate::engine::cache::Cache;
use crate::engine::config::ScanConfig;
use crate::engine::error::ScanError;
use crate::engine::models::{Fingerprint, ProbeGroup, Response};

/// What a batch run reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fingerprint probing: responses come back with the fingerprints that
    /// asked for them.
    Normal,
    /// Error-page learning: every response comes back as a checksum,
    /// whatever its status.
    Baseline,
}

/// One item drained from a batch's result channel.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Baseline { checksum: String, url: String },
    Page { fingerprints: Vec<Fingerprint>, response: Arc<Response> },
}

/// The network side of the engine.
///
/// `run` dispatches a batch and hands back a bounded channel. The channel
/// closes once every probe in the batch has finished, so callers drain it
/// with `while let Some(..) = rx.recv().await`. Failed probes simply produce
/// no outcome.
pub trait Fetcher: Send + Sync {
    fn run(&self, base: &Url, batch: Vec<ProbeGroup>, mode: FetchMode) -> mpsc::Receiver<FetchOutcome>;

    /// A single GET following redirects.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Response, ScanError>> + Send;
}

/// `Fetcher` over a shared `reqwest::Client`. Every successful fetch lands in
/// the cache.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    cache: Cache,
    permits: Arc<Semaphore>,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &ScanConfig, cache: Cache) -> Result<Self, ScanError> {
        // Redirects are followed by hand so the hop list can be recorded.
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            cache,
            permits: Arc::new(Semaphore::new(config.threads.max(1))),
            max_redirects: config.max_redirects,
        })
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    async fn get_following(&self, url: Url) -> Result<Response, ScanError> {
        let mut current = url.clone();
        let mut history = Vec::new();

        loop {
            let res = self.client.get(current.clone()).send().await?;

            if res.status().is_redirection() {
                if let Some(location) = res.headers().get(LOCATION).and_then(|v| v.to_str().ok()) {
                    if history.len() >= self.max_redirects {
                        return Err(ScanError::TooManyRedirects(url.to_string()));
                    }
                    current = current.join(location)?;
                    debug!(from = %url, to = %current, "Following redirect.");
                    history.push(current.clone());
                    continue;
                }
            }

            let status = res.status().as_u16();
            let headers = res.headers().clone();
            let body = res.bytes().await?.to_vec();
            return Ok(Response::new(url, status, headers, body).with_history(history));
        }
    }
}

impl Fetcher for HttpFetcher {
    fn run(&self, base: &Url, batch: Vec<ProbeGroup>, mode: FetchMode) -> mpsc::Receiver<FetchOutcome> {
        let (tx, rx) = mpsc::channel(batch.len().max(1));

        for group in batch {
            let target = match base.join(&group.url) {
                Ok(target) => target,
                Err(e) => {
                    warn!(base = %base, path = %group.url, error = %e, "Skipping unresolvable probe path.");
                    continue;
                }
            };
            let fetcher = self.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = fetcher.permits.acquire().await else {
                    return;
                };
                let response = match fetcher.get_following(target.clone()).await {
                    Ok(response) => fetcher.cache.insert(response),
                    Err(e) => {
                        warn!(url = %target, error = %e, "Probe failed.");
                        return;
                    }
                };

                let outcome = match mode {
                    FetchMode::Baseline => FetchOutcome::Baseline {
                        checksum: response.page_checksum(),
                        url: response.url.to_string(),
                    },
                    FetchMode::Normal if response.status == 404 => {
                        debug!(url = %target, "Dropping 404 response.");
                        return;
                    }
                    FetchMode::Normal => FetchOutcome::Page { fingerprints: group.fingerprints, response },
                };
                // Phases drain every batch; a failed send means the receiver was dropped.
                let _ = tx.send(outcome).await;
            });
        }

        rx
    }

    async fn fetch(&self, url: &str) -> Result<Response, ScanError> {
        let url = Url::parse(url)?;
        let response = self.get_following(url).await?;
        Ok(self.cache.insert(response).as_ref().clone())
    }
}
