//! Shared data model for the testflow API test engine: suite file schema,
//! the project-wide engine config, node identifiers, priority classes, and
//! the `Value` path-access helpers every other crate builds on.

pub mod config;
pub mod ident;
pub mod priority;
pub mod suite;
pub mod value;

pub mod prelude {
    pub use crate::config::{
        ConfigError, DiscoveryConfig, EngineConfig, ExecutionConfig, FiltersConfig,
        GlobalsConfig, PrioritiesConfig, ReportingConfig, RetryConfig, TimeoutsConfig,
    };
    pub use crate::ident::NodeId;
    pub use crate::priority::{ExecutionMode, Priority};
    pub use crate::suite::{
        AssertionRule, AssertionRuleSet, CallSpec, CaptureRule, CaptureSpec, DependencyRef,
        Hooks, InputSpec, IterateSpec, PromoteScope, RequestSpec, Scenario, ScenarioBranch,
        Step, Suite, SuiteParseError,
    };
    pub use crate::value::{get_path, set_path, type_name, Value};
}
