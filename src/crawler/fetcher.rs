//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the indexer, including:
//! - Building the client with browser-like default headers and cookies
//! - Linear-backoff retries for network-level failures
//! - Error classification (gone, HTTP error, transient)

use crate::config::HttpConfig;
use crate::crawler::cookies::load_cookie_jar;
use crate::ConfigError;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Errors returned by `HttpClient::get`
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure that outlasted every retry
    #[error("HTTP failed for {url} after {attempts} attempts: {message}")]
    Transient {
        url: String,
        attempts: u32,
        message: String,
    },

    /// 404 or 410; the page will not come back
    #[error("HTTP {status} for {url}")]
    Gone { url: String, status: u16 },

    /// Any other non-success status; not retried by the client
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },
}

impl FetchError {
    /// HTTP status carried by the error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { .. } => None,
            Self::Gone { status, .. } | Self::Http { status, .. } => Some(*status),
        }
    }
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    /// Response headers with lowercase names
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Charset label declared in the `content-type` header
    pub fn charset(&self) -> Option<&str> {
        let content_type = self.headers.get("content-type")?;
        content_type.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
    }

    /// Body decoded with the declared charset
    ///
    /// Unknown or missing labels fall back to UTF-8; a BOM overrides the
    /// label and malformed sequences are replaced.
    pub fn text(&self) -> String {
        let encoding = self
            .charset()
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.body);
        text.into_owned()
    }
}

/// HTTP client with retry policy
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
    backoff: Duration,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(HttpClient)` - Successfully built HTTP client
/// * `Err(IndexerError)` - Invalid header values or TLS setup failure
pub fn build_http_client(config: &HttpConfig) -> crate::Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    if let Some(cookie) = config.cookie_header.as_deref().filter(|c| !c.trim().is_empty()) {
        let value = HeaderValue::from_str(cookie.trim())
            .map_err(|e| ConfigError::Validation(format!("Invalid cookie header: {}", e)))?;
        headers.insert(header::COOKIE, value);
    }

    let jar = load_cookie_jar(config.cookie_file.as_deref().map(Path::new));

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_provider(Arc::new(jar))
        .timeout(Duration::from_secs_f64(config.timeout))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(HttpClient {
        client,
        retries: config.retries.max(1),
        backoff: Duration::from_secs_f64(config.retry_backoff),
    })
}

impl HttpClient {
    /// Fetches a URL
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | HTTP 404 / 410 | Immediate → `Gone` |
    /// | Other HTTP status | Immediate → `Http` |
    /// | Timeout, connect or body error | Retry, waiting `backoff × attempt` |
    pub async fn get(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=self.retries {
            match self.try_get(url).await {
                Ok(page) => return Ok(page),
                Err(AttemptError::Final(e)) => return Err(e),
                Err(AttemptError::Retryable(message)) => {
                    last_error = message;
                }
            }

            if attempt < self.retries {
                let wait = self.backoff * attempt;
                warn!(
                    "Fetch attempt {}/{} failed for {}: {}; retrying in {:?}",
                    attempt, self.retries, url, last_error, wait
                );
                tokio::time::sleep(wait).await;
            }
        }

        Err(FetchError::Transient {
            url: url.to_string(),
            attempts: self.retries,
            message: last_error,
        })
    }

    async fn try_get(&self, url: &str) -> Result<FetchedPage, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(describe(&e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(AttemptError::Final(FetchError::Gone {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }
        if !status.is_success() {
            return Err(AttemptError::Final(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Retryable(describe(&e)))?;
        debug!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            headers,
            body: body.to_vec(),
        })
    }
}

enum AttemptError {
    Retryable(String),
    Final(FetchError),
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
