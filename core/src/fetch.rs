//! Retrieval of remote bundle source.

use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Raw response of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves source text by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Fetch `url` and return the body, failing on non-2xx statuses.
pub async fn fetch_text(fetcher: &dyn Fetcher, url: &str) -> Result<String> {
    let response = fetcher.fetch(url).await?;
    if !response.is_success() {
        return Err(Error::Network {
            url: url.to_string(),
            status: Some(response.status),
            message: format!("server responded with status {}", response.status),
        });
    }
    Ok(response.body)
}

/// A [`Fetcher`] serving fixed responses from memory.
///
/// Unknown URLs answer 404. Every request is counted.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    responses: RwLock<HashMap<String, FetchResponse>>,
    requests: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(url, FetchResponse::ok(body));
        self
    }

    pub fn insert(&self, url: impl Into<String>, response: FetchResponse) {
        self.responses.write().insert(url.into(), response);
    }

    /// Number of `fetch` calls made so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave, as a real network round trip would.
        tokio::task::yield_now().await;
        Ok(self
            .responses
            .read()
            .get(url)
            .cloned()
            .unwrap_or(FetchResponse {
                status: 404,
                body: String::new(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let fetcher = StaticFetcher::new().with("mem://ok", "fn f() { 1 }");
        assert_eq!(
            fetch_text(&fetcher, "mem://ok").await.unwrap(),
            "fn f() { 1 }"
        );

        let err = fetch_text(&fetcher, "mem://missing").await.unwrap_err();
        assert_eq!(
            err,
            Error::Network {
                url: "mem://missing".to_string(),
                status: Some(404),
                message: "server responded with status 404".to_string(),
            }
        );
        assert_eq!(fetcher.request_count(), 2);
    }
}
