//! HTTP fetch pipeline used by the worker to reach the origin.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Lowercase host, remove fragments
//! - Preserve query string
//!
//! ### Failure classification
//! - Connection, DNS and TLS failures: `NETWORK_ERROR`
//! - Client timeout: `FETCH_TIMEOUT`
//! - Non-2xx status: `HTTP_ERROR`, never a successful response
//! - Body over the byte limit: `FETCH_TOO_LARGE`

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve};

use top10_core::{AppConfig, Error, RequestKey, ResponseSnapshot};

/// Source of live responses for the router and the install step.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `key` from the network.
    ///
    /// Only successful (2xx) responses are returned as `Ok`.
    async fn fetch(&self, key: &RequestKey) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "top10-offline/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "top10-offline/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
}

impl FetchResponse {
    /// Capture the response as an immutable cache snapshot.
    pub fn into_snapshot(self) -> ResponseSnapshot {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        ResponseSnapshot {
            url: self.final_url.to_string(),
            status_code: self.status.as_u16(),
            content_type: self.content_type,
            headers,
            body: self.bytes.to_vec(),
            fetched_at: Utc::now().to_rfc3339(),
        }
    }
}

/// HTTP fetch client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Issue `key` against the network, returning raw bytes and metadata.
    pub async fn request(&self, key: &RequestKey) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(&key.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(key.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", key.method)))?;

        let response = self
            .http
            .request(method, url.as_str())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {} for {}", status.as_u16(), url)));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(classify)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            key.method,
            url,
            final_url,
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { final_url, status, content_type, bytes, headers })
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, key: &RequestKey) -> Result<ResponseSnapshot, Error> {
        self.request(key).await.map(FetchResponse::into_snapshot)
    }
}

fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}
