//! Report rendering and live event streaming, built from a completed
//! Scheduler run.

pub mod events;
pub mod report;

pub use events::{LiveEvent, LiveEventSink};
pub use report::{Report, ReportFormat, ReportSummary, Reporter, StepReport, SuiteReport};
