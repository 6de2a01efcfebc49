//! Step Executor and Suite Runner: capture, assertion, scenario, and
//! iteration engines, wired into one state machine per step and one runner
//! per suite.

pub mod assert;
pub mod capture;
pub mod error;
pub mod iterate;
pub mod result;
pub mod runner;
pub mod scenario;
pub mod step;

pub use error::ExecError;
pub use result::{AssertionResult, RecordedAttempt, ScenarioMeta, Status, StepResult, SuiteResult};
pub use runner::SuiteRunner;
pub use step::{StepContext, StepExecutor};
