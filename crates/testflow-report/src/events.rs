//! JSONL live-event sink: one line per lifecycle transition, append-only
//! and safe to write from multiple suites running concurrently.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::Serialize;

/// One lifecycle transition. Variant names are emitted kebab-case
/// (`TestDiscovered` -> `"test-discovered"`) to match the named event set.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LiveEvent {
    TestDiscovered { node_id: String, suite_name: String },
    SuiteStart { node_id: String },
    StepStart { node_id: String, step_name: String },
    StepEnd { node_id: String, step_name: String, status: String, duration_ms: u64 },
    SuiteEnd { node_id: String, status: String, duration_ms: u64 },
    ExecutionEnd {
        total: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
        success_rate: f64,
    },
}

/// Appends one JSON object per line to a file, flushing after every write so
/// a `tail -f` (or a crash mid-run) sees events as they happen.
pub struct LiveEventSink {
    file: Mutex<File>,
}

impl LiveEventSink {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    pub fn emit(&self, event: &LiveEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        let mut file = self.file.lock();
        if writeln!(file, "{line}").is_ok() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tag_is_kebab_case() {
        let event = LiveEvent::SuiteStart { node_id: "a".to_string() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "suite-start");
    }

    #[test]
    fn sink_appends_one_line_per_event() {
        let dir = std::env::temp_dir().join(format!("testflow-report-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("events.jsonl");
        let sink = LiveEventSink::create(&path).unwrap();
        sink.emit(&LiveEvent::TestDiscovered { node_id: "a".to_string(), suite_name: "A".to_string() });
        sink.emit(&LiveEvent::ExecutionEnd { total: 1, successful: 1, failed: 0, skipped: 0, success_rate: 1.0 });
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}
