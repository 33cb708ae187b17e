// src/engine/discovery/redirect.rs

use tracing::{info, warn};
use url::{Position, Url};

use crate::engine::fetcher::Fetcher;

/// Prefixes `http://` when the target carries no scheme.
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

/// `scheme://host[:port]/` of a URL, dropping any path or query.
pub fn site_root(url: &Url) -> String {
    format!("{}/", &url[..Position::BeforePath])
}

/// Works out the URL the rest of the scan should use.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    original: String,
    canonical: Option<String>,
}

impl RedirectResolver {
    /// Issues one GET against the target.
    ///
    /// If the answer comes from a different URL than the one asked for, the
    /// canonical URL becomes the root of wherever we landed. A failed fetch
    /// leaves it unset.
    pub async fn resolve<F: Fetcher>(fetcher: &F, target: &str) -> Self {
        let requested = normalize_target(target);

        let canonical = match fetcher.fetch(&requested).await {
            Ok(response) => {
                let landed = response.final_url();
                if landed.as_str() == requested {
                    Some(requested)
                } else {
                    Some(site_root(landed))
                }
            }
            Err(e) => {
                warn!(url = %requested, error = %e, "Redirect probe failed.");
                None
            }
        };

        let resolver = Self { original: target.to_string(), canonical };
        info!(
            target,
            canonical = ?resolver.canonical,
            redirected = resolver.is_redirected(),
            "Target resolved."
        );
        resolver
    }

    /// True when the canonical URL is known and differs from what the user typed.
    pub fn is_redirected(&self) -> bool {
        self.canonical.as_deref().is_some_and(|c| c != self.original)
    }

    pub fn canonical_url(&self) -> Option<&str> {
        self.canonical.as_deref()
    }

    pub fn original(&self) -> &str {
        &self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_added_only_when_missing() {
        assert_eq!(normalize_target("example.com"), "http://example.com");
        assert_eq!(normalize_target("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn site_root_keeps_port_and_drops_path() {
        let url = Url::parse("https://example.com:8443/blog/post?id=1").unwrap();
        assert_eq!(site_root(&url), "https://example.com:8443/");
    }
}
