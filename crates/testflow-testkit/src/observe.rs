//! Tracing event capture for observability tests.
//!
//! `TracingCapture` installs a thread-local subscriber that records every
//! event emitted while it's alive, so a test can assert on what the engine
//! logged without depending on stdout formatting.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use crate::error::TestError;

/// A captured tracing event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// RAII guard that captures tracing events for the current thread.
///
/// Uses `tracing::subscriber::set_default`, so only the current thread is
/// affected — safe to use under parallel test execution.
pub struct TracingCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl TracingCapture {
    pub fn install() -> Self {
        let events: Arc<Mutex<Vec<CapturedEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let layer = CaptureLayer { events: Arc::clone(&events) };
        let subscriber = tracing_subscriber::registry().with(layer.with_filter(LevelFilter::TRACE));
        let guard = tracing::subscriber::set_default(subscriber);
        Self { events, _guard: guard }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn events_at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events.lock().iter().filter(|e| e.level == level).cloned().collect()
    }

    pub fn events_containing(&self, substring: &str) -> Vec<CapturedEvent> {
        self.events.lock().iter().filter(|e| e.message.contains(substring)).cloned().collect()
    }

    /// # Panics
    ///
    /// Panics if no matching event is found.
    pub fn assert_event_emitted(&self, level: Level, substring: &str) {
        let events = self.events.lock();
        let found = events.iter().any(|e| e.level == level && e.message.contains(substring));
        assert!(
            found,
            "expected tracing event at {level} containing '{substring}', captured {} events: {:?}",
            events.len(),
            events.iter().map(|e| format!("[{}] {}", e.level, e.message)).collect::<Vec<_>>()
        );
    }

    /// # Panics
    ///
    /// Panics if any events at `level` exist.
    pub fn assert_no_events_at_level(&self, level: Level) {
        let at_level: Vec<_> = self.events.lock().iter().filter(|e| e.level == level).cloned().collect();
        assert!(
            at_level.is_empty(),
            "expected no events at {level}, but found {}: {:?}",
            at_level.len(),
            at_level.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    /// Non-panicking alternative to `assert_event_emitted`.
    pub fn expect_event(&self, level: Level, substring: &str) -> Result<(), TestError> {
        let events = self.events.lock();
        let found = events.iter().any(|e| e.level == level && e.message.contains(substring));
        if found {
            Ok(())
        } else {
            Err(TestError::Observability(format!("no event at {level} containing '{substring}'")))
        }
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_info_event() {
        let capture = TracingCapture::install();
        tracing::info!("test info message");
        let events = capture.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::INFO);
        assert!(events[0].message.contains("test info message"));
    }

    #[test]
    fn capture_multiple_levels() {
        let capture = TracingCapture::install();
        tracing::debug!("debug msg");
        tracing::warn!("warn msg");
        tracing::error!("error msg");
        assert_eq!(capture.events().len(), 3);
    }

    #[test]
    fn events_at_level_filters() {
        let capture = TracingCapture::install();
        tracing::info!("info one");
        tracing::warn!("warn one");
        tracing::info!("info two");
        let infos = capture.events_at_level(Level::INFO);
        assert_eq!(infos.len(), 2);
    }

    #[test]
    fn events_containing_filters() {
        let capture = TracingCapture::install();
        tracing::info!("alpha event");
        tracing::info!("beta event");
        tracing::info!("alpha again");
        let alphas = capture.events_containing("alpha");
        assert_eq!(alphas.len(), 2);
    }

    #[test]
    fn assert_event_emitted_passes() {
        let capture = TracingCapture::install();
        tracing::error!("something broke");
        capture.assert_event_emitted(Level::ERROR, "broke");
    }

    #[test]
    #[should_panic(expected = "expected tracing event")]
    fn assert_event_emitted_fails() {
        let capture = TracingCapture::install();
        tracing::info!("only info");
        capture.assert_event_emitted(Level::ERROR, "missing");
    }

    #[test]
    fn assert_no_events_at_level_passes() {
        let capture = TracingCapture::install();
        tracing::info!("info only");
        capture.assert_no_events_at_level(Level::ERROR);
    }

    #[test]
    #[should_panic(expected = "expected no events")]
    fn assert_no_events_at_level_fails() {
        let capture = TracingCapture::install();
        tracing::error!("oops");
        capture.assert_no_events_at_level(Level::ERROR);
    }

    #[test]
    fn expect_event_returns_ok() {
        let capture = TracingCapture::install();
        tracing::warn!("careful now");
        assert!(capture.expect_event(Level::WARN, "careful").is_ok());
    }

    #[test]
    fn expect_event_returns_err() {
        let capture = TracingCapture::install();
        tracing::info!("only info");
        let result = capture.expect_event(Level::ERROR, "missing");
        match result {
            Err(TestError::Observability(msg)) => assert!(msg.contains("missing")),
            other => panic!("expected Observability error, got: {other:?}"),
        }
    }
}
