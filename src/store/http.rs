//! HTTP client for the artifact store

use super::{ARCHIVE_NAME, ArtifactStore, Result, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Jitter added on top of each backoff step
const MAX_JITTER_MS: u64 = 100;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct StoreClientConfig {
    pub base_url: Url,
    /// Total attempts per request, the first one included
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl StoreClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("artifact-unzip/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A single failed attempt. `body` is whatever the store answered with.
struct AttemptError {
    body: Option<String>,
    reason: String,
}

/// Artifact store client over HTTP
pub struct HttpStore {
    client: Client,
    config: StoreClientConfig,
}

impl HttpStore {
    pub fn new(config: StoreClientConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// `{base}/v1/builds/{build_id}/ARTIFACTS/{name}`, one encoded segment per
    /// `/`-separated part of `name`. `None` when a segment is empty, `.` or
    /// `..`, since those would address a different object.
    fn artifact_url(&self, build_id: u64, name: &str) -> Option<Url> {
        if name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return None;
        }

        let build = build_id.to_string();
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url.path_segments_mut().ok()?;
            segments
                .pop_if_empty()
                .extend(["v1", "builds", build.as_str(), "ARTIFACTS"])
                .extend(name.split('/'));
        }
        Some(url)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
        exp + Duration::from_millis(jitter)
    }

    /// Run one request with retry. On exhaustion the store's last response
    /// body becomes the error message.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &Url,
        token: &str,
        body: Option<&Bytes>,
    ) -> std::result::Result<Bytes, String> {
        let auth = match HeaderValue::from_str(token) {
            Ok(mut value) => {
                value.set_sensitive(true);
                value
            }
            Err(_) => return Err("Invalid authorization token".to_string()),
        };

        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.send_once(method.clone(), url, &auth, body).await {
                Ok(bytes) => {
                    if attempts > 1 {
                        debug!(%url, attempts, "Store request succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    if attempts >= self.config.max_attempts {
                        warn!(%url, %method, attempts, error = %e.reason, "Store request failed after retries");
                        return Err(e
                            .body
                            .filter(|b| !b.is_empty())
                            .unwrap_or_else(|| format!("Store request failed: {}", e.reason)));
                    }

                    warn!(%url, %method, attempts, error = %e.reason, "Store request failed, retrying");
                    tokio::time::sleep(self.backoff(attempts)).await;
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        auth: &HeaderValue,
        body: Option<&Bytes>,
    ) -> std::result::Result<Bytes, AttemptError> {
        let mut request = self
            .client
            .request(method, url.clone())
            .header(AUTHORIZATION, auth.clone());

        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "text/plain")
                .body(body.clone());
        }

        let response = request.send().await.map_err(|e| AttemptError {
            body: None,
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(AttemptError {
                body,
                reason: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        response.bytes().await.map_err(|e| AttemptError {
            body: None,
            reason: format!("Failed to read body: {}", e),
        })
    }
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn fetch_archive(&self, build_id: u64, token: &str) -> Result<Bytes> {
        let url = self
            .artifact_url(build_id, ARCHIVE_NAME)
            .ok_or_else(|| StoreError::Fetch("Invalid store base URL".to_string()))?;

        debug!(build_id, "Fetching artifact archive");

        let bytes = self
            .send_with_retry(Method::GET, &url, token, None)
            .await
            .map_err(StoreError::Fetch)?;

        debug!(build_id, size = bytes.len(), "Artifact archive fetched");
        Ok(bytes)
    }

    async fn store_artifact(
        &self,
        build_id: u64,
        token: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<()> {
        let url = self
            .artifact_url(build_id, file_name)
            .ok_or_else(|| StoreError::Store(format!("Invalid artifact name '{}'", file_name)))?;

        let size = data.len();
        self.send_with_retry(Method::PUT, &url, token, Some(&data))
            .await
            .map_err(StoreError::Store)?;

        debug!(build_id, file_name, size, "Artifact stored");
        Ok(())
    }
}
