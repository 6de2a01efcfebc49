//! Issues interpolated HTTP requests with retry/backoff and records a
//! cURL-equivalent for every attempt.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;

use crate::curl::to_curl;
use crate::error::HttpError;

/// A fully-interpolated request, ready to issue.
#[derive(Debug, Clone)]
pub struct RequestSpecRuntime {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

/// `execution.retry_failed` resolved for one request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 1,
            delay: Duration::from_millis(0),
        }
    }
}

/// One attempt's outcome, kept for the cURL equivalent and suite report.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub curl: String,
    pub status_code: Option<u16>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// The response to a request, plus every attempt made to get it.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// Parsed JSON body when the content-type is JSON; otherwise the raw
    /// bytes rendered as a JSON string.
    pub body: Value,
    pub raw_body: Vec<u8>,
    pub duration_ms: u64,
    pub attempts: Vec<AttemptRecord>,
}

pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder().build().map_err(HttpError::Build)?;
        Ok(Self { inner })
    }

    pub async fn execute(
        &self,
        request: &RequestSpecRuntime,
        retry: &RetryPolicy,
    ) -> Result<Response, HttpError> {
        let max_attempts = if retry.enabled { retry.max_attempts.max(1) } else { 1 };
        let mut delay = retry.delay;
        let mut attempts = Vec::with_capacity(max_attempts as usize);
        let mut last_transport_err: Option<reqwest::Error> = None;

        for attempt in 1..=max_attempts {
            let curl = to_curl(&request.method, &request.url, &request.headers, request.body.as_ref());
            let started = Instant::now();
            match self.send_once(request).await {
                Ok(response) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    attempts.push(AttemptRecord {
                        curl,
                        status_code: Some(response.status_code),
                        duration_ms: elapsed_ms,
                        error: None,
                    });
                    let should_retry = retry.enabled
                        && attempt < max_attempts
                        && is_retryable_status(&request.method, response.status_code, &response.headers);
                    if should_retry {
                        tracing::debug!(url = %request.url, status = response.status_code, attempt, "retrying request");
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    let mut response = response;
                    response.attempts = attempts;
                    return Ok(response);
                }
                Err(err) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    attempts.push(AttemptRecord {
                        curl,
                        status_code: None,
                        duration_ms: elapsed_ms,
                        error: Some(err.to_string()),
                    });
                    let should_retry =
                        retry.enabled && attempt < max_attempts && is_retryable_transport(&err);
                    last_transport_err = Some(err);
                    if should_retry {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }
                    break;
                }
            }
        }

        Err(HttpError::RetriesExhausted(
            request.url.clone(),
            attempts.len() as u32,
            last_transport_err.expect("loop always records a transport error before breaking"),
        ))
    }

    async fn send_once(&self, request: &RequestSpecRuntime) -> Result<Response, reqwest::Error> {
        let method = Method::from_bytes(request.method.as_bytes()).unwrap_or(Method::GET);
        let mut builder = self.inner.request(method, &request.url).timeout(request.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        let mut header_map = HeaderMap::new();
        for (name, value) in &request.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::from_str(value),
            ) {
                header_map.insert(name, value);
            }
        }
        builder = builder.headers(header_map);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let raw_body = response.bytes().await?.to_vec();
        let body = if content_type.contains("json") {
            serde_json::from_slice(&raw_body).unwrap_or(Value::Null)
        } else {
            Value::String(String::from_utf8_lossy(&raw_body).into_owned())
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        Ok(Response {
            status_code,
            headers,
            body,
            raw_body,
            duration_ms,
            attempts: Vec::new(),
        })
    }
}

/// Per §4.6: network timeout, connection refused, 5xx with an idempotent
/// method, or an explicit retry header are retryable; everything else
/// returns immediately. An explicit `Retry-After` header overrides the
/// idempotent-method requirement since the server is asking for a retry.
fn is_retryable_status(method: &str, status_code: u16, headers: &BTreeMap<String, String>) -> bool {
    let idempotent = matches!(method.to_uppercase().as_str(), "GET" | "HEAD" | "PUT" | "DELETE");
    let has_retry_header = headers.keys().any(|k| k.eq_ignore_ascii_case("retry-after"));
    has_retry_header || (idempotent && (500..600).contains(&status_code))
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_5xx_is_retryable_but_post_is_not() {
        let no_headers = BTreeMap::new();
        assert!(is_retryable_status("GET", 503, &no_headers));
        assert!(!is_retryable_status("POST", 503, &no_headers));
        assert!(!is_retryable_status("GET", 404, &no_headers));
    }

    #[test]
    fn explicit_retry_after_header_overrides_the_idempotent_method_requirement() {
        let mut headers = BTreeMap::new();
        headers.insert("Retry-After".to_string(), "1".to_string());
        assert!(is_retryable_status("POST", 429, &headers));
    }

    #[test]
    fn retry_policy_defaults_to_a_single_attempt() {
        let policy = RetryPolicy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.max_attempts, 1);
    }
}
