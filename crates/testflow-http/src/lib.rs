//! HTTP client for the testflow API test engine: retry/backoff and
//! cURL-equivalent recording per request attempt.

pub mod client;
pub mod curl;
pub mod error;

pub use client::{AttemptRecord, HttpClient, RequestSpecRuntime, Response, RetryPolicy};
pub use error::HttpError;
