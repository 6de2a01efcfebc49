//! Layered variable scopes and `{{ }}` interpolation for the testflow API
//! test engine.

pub mod error;
pub mod faker;
pub mod interp;
pub mod scope;

pub use error::VarsError;
pub use faker::FakerProvider;
pub use interp::{Interpolator, ScriptEvaluator, VariableSource};
pub use scope::{GlobalRegistry, ScopeLayer, Scopes};

impl VariableSource for Scopes {
    fn resolve(&self, path: &str) -> Option<serde_json::Value> {
        self.get(path)
    }

    fn snapshot(&self) -> serde_json::Value {
        self.snapshot_all()
    }
}
