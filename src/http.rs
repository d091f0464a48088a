//! Authenticated JSON HTTP client with transient-error retry.
//!
//! Every request carries a bearer token and JSON `Accept`/`Content-Type`
//! headers and resolves relative to a fixed base URL. Responses come back
//! as [`ApiResponse`] regardless of status; callers decide what counts as
//! success.
//!
//! # Retry Strategy
//!
//! - HTTP 429, 500, 502, 503, 504 → retry
//! - Any other status → returned immediately
//! - Transport errors (timeout, DNS, refused connection) → retry
//! - Backoff is linear: `attempt × step` (1.5s, 3.0s, 4.5s, 6.0s by default)
//! - After the last attempt the final response is returned as-is

use anyhow::{anyhow, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{truncate_chars, MAX_BODY_CHARS};

/// Statuses treated as transient.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `n × step`.
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            step: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    pub fn is_retryable(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Delay after the given 1-based attempt failed. Saturates instead of overflowing.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            anyhow!(
                "invalid JSON in HTTP {} response: {} (body: {})",
                self.status,
                e,
                self.truncated_body()
            )
        })
    }

    pub fn truncated_body(&self) -> String {
        truncate_chars(&self.body, MAX_BODY_CHARS)
    }
}

/// Drive `send` until it yields a non-transient response or attempts run out.
///
/// `sleep` performs the backoff wait; production passes
/// `tokio::time::sleep`, tests pass a recorder.
pub async fn send_with_retry<F, Fut, S, SFut>(
    policy: &RetryPolicy,
    mut send: F,
    mut sleep: S,
) -> Result<ApiResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ApiResponse>>,
    S: FnMut(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = send().await;
        let last = attempt >= max_attempts;

        match outcome {
            Ok(response) if !RetryPolicy::is_retryable(response.status) || last => {
                return Ok(response);
            }
            Ok(response) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    status = response.status,
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    "transient HTTP status, retrying"
                );
                sleep(delay).await;
            }
            Err(e) if last => return Err(e),
            Err(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_secs = delay.as_secs_f64(),
                    "request failed, retrying"
                );
                sleep(delay).await;
            }
        }

        attempt += 1;
    }
}

/// JSON client bound to one base URL and one bearer token.
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

impl HttpClient {
    pub fn new(
        base_url: &str,
        token: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto the base URL, inserting the leading slash if missing.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse> {
        self.execute(Method::GET, path, query, None).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &T,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, query, Some(body)).await
    }

    /// Completes the GET/POST/PATCH surface. Article updates go through
    /// [`post_json`](Self::post_json); nothing in the syncer patches.
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &T,
    ) -> Result<ApiResponse> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::PATCH, path, query, Some(body)).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let url = self.url(path);
        tracing::debug!(method = %method, path, "request");

        send_with_retry(
            &self.retry,
            || {
                let mut builder = self
                    .client
                    .request(method.clone(), &url)
                    .bearer_auth(&self.token)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .query(query);
                if let Some(ref json) = body {
                    builder = builder.json(json);
                }
                async move {
                    let response = builder.send().await?;
                    let status = response.status().as_u16();
                    let text = response.text().await.unwrap_or_default();
                    Ok(ApiResponse::new(status, text))
                }
            },
            tokio::time::sleep,
        )
        .await
    }
}
