//! HTTP documentation source.
//!
//! Fetches `GET {base_url}/docs/{library}[/{topic}]` and expects a JSON body
//! `{ "content": "..." }`. Status codes map onto the fetch-error taxonomy:
//! 404 → NotFound, 429 → RateLimited (honoring `Retry-After`), 401/403 →
//! Auth, everything else non-2xx and transport failures → Network.

use async_trait::async_trait;
use docvault_core::error::FetchError;
use docvault_core::source::{DocContent, DocSource};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// A documentation API client.
pub struct HttpDocSource {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DocResponse {
    content: String,
}

impl HttpDocSource {
    /// Create a new HTTP source against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client,
        }
    }

    /// Attach an API key, sent as the `x-api-key` header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn doc_url(&self, library: &str, topic: Option<&str>) -> String {
        match topic {
            Some(t) => format!("{}/docs/{}/{}", self.base_url, library, t),
            None => format!("{}/docs/{}", self.base_url, library),
        }
    }

    fn retry_after_secs(response: &reqwest::Response) -> u64 {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
    }
}

#[async_trait]
impl DocSource for HttpDocSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        library: &str,
        topic: Option<&str>,
    ) -> Result<DocContent, FetchError> {
        let url = self.doc_url(library, topic);
        debug!(%url, "Fetching documentation");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {
                let body: DocResponse = response
                    .json()
                    .await
                    .map_err(|e| FetchError::Network(format!("Malformed doc response: {e}")))?;
                Ok(DocContent::new(body.content))
            }
            404 => Err(FetchError::NotFound {
                library: library.to_string(),
                topic: topic.map(String::from),
            }),
            429 => Err(FetchError::RateLimited {
                retry_after_secs: Self::retry_after_secs(&response),
            }),
            401 | 403 => Err(FetchError::Auth(format!(
                "Documentation source rejected credentials (status {status})"
            ))),
            _ => Err(FetchError::Network(format!(
                "Unexpected status {status} from {url}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_without_topic() {
        let source = HttpDocSource::new("https://docs.example.com/api/");
        assert_eq!(
            source.doc_url("tokio", None),
            "https://docs.example.com/api/docs/tokio"
        );
    }

    #[test]
    fn url_with_topic() {
        let source = HttpDocSource::new("https://docs.example.com/api");
        assert_eq!(
            source.doc_url("tokio", Some("sync")),
            "https://docs.example.com/api/docs/tokio/sync"
        );
    }

    #[test]
    fn source_name() {
        assert_eq!(HttpDocSource::new("http://x").name(), "http");
    }
}
