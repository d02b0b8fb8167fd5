//! A [`Fetcher`] for `http://` and `file://` URLs.

use async_trait::async_trait;
use bytes::Bytes;
use formulate::{Error, FetchResponse, Fetcher, Result};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::io::ErrorKind;
use tracing::debug;

/// Fetches over plain HTTP with hyper, and reads `file://` URLs from disk.
///
/// A missing file answers 404, like a missing resource on a server.
pub struct HttpFetcher {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    async fn fetch_http(&self, url: &str) -> Result<FetchResponse> {
        let uri: hyper::Uri = url.parse().map_err(|e| network_error(url, e))?;
        let response = self.client.get(uri).await.map_err(|e| network_error(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| network_error(url, e))?
            .to_bytes();
        let body = String::from_utf8(body.to_vec()).map_err(|e| network_error(url, e))?;
        debug!(url, status, bytes = body.len(), "http fetch finished");
        Ok(FetchResponse { status, body })
    }

    async fn fetch_file(&self, url: &str, path: &str) -> Result<FetchResponse> {
        match tokio::fs::read_to_string(path).await {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse {
                status: 404,
                body: String::new(),
            }),
            Err(e) => Err(network_error(url, e)),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        if let Some(path) = url.strip_prefix("file://") {
            self.fetch_file(url, path).await
        } else if url.starts_with("http://") {
            self.fetch_http(url).await
        } else {
            Err(Error::Network {
                url: url.to_string(),
                status: None,
                message: "unsupported scheme (expected http:// or file://)".to_string(),
            })
        }
    }
}

fn network_error(url: &str, e: impl std::fmt::Display) -> Error {
    Error::Network {
        url: url.to_string(),
        status: None,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn file_urls_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "fn double(x) {{ x * 2 }}").unwrap();
        let url = format!("file://{}", file.path().display());

        let response = HttpFetcher::new().fetch(&url).await.unwrap();
        assert_eq!(response, FetchResponse::ok("fn double(x) { x * 2 }"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let response = HttpFetcher::new()
            .fetch("file:///nonexistent/bundle.rhai")
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn other_schemes_are_rejected() {
        let err = HttpFetcher::new()
            .fetch("ftp://example.test/bundle.rhai")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), formulate::ErrorKind::Network);
    }
}
