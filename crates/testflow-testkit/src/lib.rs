//! Shared dev-dependency test tooling for the testflow workspace.
//!
//! ```toml
//! [dev-dependencies]
//! testflow-testkit = { workspace = true }
//! ```

pub mod assert;
pub mod error;
pub mod fixture;
pub mod observe;
pub mod retry;

/// Import everything commonly needed in a test module.
pub mod prelude {
    pub use crate::assert::{assert_eventually_consistent, assert_latency_p95, assert_latency_p99, assert_throughput_above, percentile};
    pub use crate::error::TestError;
    pub use crate::fixture::{ScopedEnvVar, ScopedFixture, ScopedTempDir};
    pub use crate::observe::{CapturedEvent, TracingCapture};
    pub use crate::retry::{retry_with_backoff, retry_with_backoff_async};
}
