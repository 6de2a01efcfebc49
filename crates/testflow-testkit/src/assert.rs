//! Performance assertions: latency percentiles, throughput, and eventual
//! consistency polling, for tests that drive the engine against a live or
//! mock HTTP server.

use std::time::Duration;

/// Compute the `p`-th percentile of a slice of durations (`p` in `[0.0, 1.0]`).
///
/// # Panics
///
/// Panics if `samples` is empty or `p` is outside `[0.0, 1.0]`.
pub fn percentile(samples: &[Duration], p: f64) -> Duration {
    assert!(!samples.is_empty(), "percentile requires at least one sample");
    assert!((0.0..=1.0).contains(&p), "percentile must be between 0.0 and 1.0, got {p}");

    let mut sorted: Vec<Duration> = samples.to_vec();
    sorted.sort();

    let index = ((sorted.len() as f64 - 1.0) * p).ceil() as usize;
    sorted[index.min(sorted.len() - 1)]
}

/// Assert that the p95 latency is within the given threshold.
pub fn assert_latency_p95(samples: &[Duration], threshold: Duration) {
    let p95 = percentile(samples, 0.95);
    assert!(p95 <= threshold, "p95 latency {p95:?} exceeds threshold {threshold:?}");
}

/// Assert that the p99 latency is within the given threshold.
pub fn assert_latency_p99(samples: &[Duration], threshold: Duration) {
    let p99 = percentile(samples, 0.99);
    assert!(p99 <= threshold, "p99 latency {p99:?} exceeds threshold {threshold:?}");
}

/// Assert that throughput (operations per second) is above the given minimum.
pub fn assert_throughput_above(ops_count: u64, elapsed: Duration, min_ops_per_sec: f64) {
    let secs = elapsed.as_secs_f64();
    assert!(secs > 0.0, "elapsed duration must be positive");
    let throughput = ops_count as f64 / secs;
    assert!(throughput >= min_ops_per_sec, "throughput {throughput:.2} ops/s is below minimum {min_ops_per_sec:.2} ops/s");
}

/// Poll `check` until it returns `true` or `timeout` elapses.
///
/// # Panics
///
/// Panics if `check` never returns `true` within `timeout`.
pub async fn assert_eventually_consistent<F>(check: F, interval: Duration, timeout: Duration, message: &str)
where
    F: Fn() -> bool,
{
    let start = tokio::time::Instant::now();
    loop {
        if check() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("assert_eventually_consistent failed after {timeout:?}: {message}");
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_single_sample() {
        let samples = vec![Duration::from_millis(100)];
        assert_eq!(percentile(&samples, 0.95), Duration::from_millis(100));
    }

    #[test]
    fn percentile_multiple_samples() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        let p95 = percentile(&samples, 0.95);
        assert!(p95 >= Duration::from_millis(95));
        assert!(p95 <= Duration::from_millis(100));
    }

    #[test]
    fn percentile_p0_returns_min() {
        let samples = vec![Duration::from_millis(10), Duration::from_millis(50), Duration::from_millis(100)];
        assert_eq!(percentile(&samples, 0.0), Duration::from_millis(10));
    }

    #[test]
    fn percentile_p100_returns_max() {
        let samples = vec![Duration::from_millis(10), Duration::from_millis(50), Duration::from_millis(100)];
        assert_eq!(percentile(&samples, 1.0), Duration::from_millis(100));
    }

    #[test]
    #[should_panic(expected = "percentile requires at least one sample")]
    fn percentile_panics_on_empty() {
        percentile(&[], 0.5);
    }

    #[test]
    #[should_panic(expected = "percentile must be between")]
    fn percentile_panics_on_invalid_p() {
        percentile(&[Duration::from_millis(1)], 1.5);
    }

    #[test]
    fn assert_latency_p95_passes() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_latency_p95(&samples, Duration::from_millis(200));
    }

    #[test]
    #[should_panic(expected = "p95 latency")]
    fn assert_latency_p95_fails() {
        let samples: Vec<Duration> = (1..=100).map(Duration::from_millis).collect();
        assert_latency_p95(&samples, Duration::from_millis(50));
    }

    #[test]
    fn assert_throughput_above_passes() {
        assert_throughput_above(1000, Duration::from_secs(1), 500.0);
    }

    #[test]
    #[should_panic(expected = "throughput")]
    fn assert_throughput_above_fails() {
        assert_throughput_above(10, Duration::from_secs(1), 500.0);
    }

    #[tokio::test]
    async fn assert_eventually_consistent_passes_immediately() {
        assert_eventually_consistent(|| true, Duration::from_millis(10), Duration::from_millis(100), "should pass").await;
    }

    #[tokio::test]
    async fn assert_eventually_consistent_passes_after_delay() {
        let start = std::time::Instant::now();
        assert_eventually_consistent(
            move || start.elapsed() >= Duration::from_millis(30),
            Duration::from_millis(10),
            Duration::from_secs(1),
            "should converge",
        )
        .await;
    }
}
