//! Layered variable scopes.
//!
//! Resolution order, first match wins: iteration, step, suite, call, global,
//! environment, config-defaults. Writes always target one explicit layer;
//! nothing here implicitly falls through to a lower scope on write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use testflow_core::value::get_path;

/// One of the seven layers a variable can live in, in resolution-precedence
/// order (index 0 is checked first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLayer {
    Iteration,
    Step,
    Suite,
    Call,
    Global,
    Environment,
    ConfigDefaults,
}

const LAYER_ORDER: [ScopeLayer; 7] = [
    ScopeLayer::Iteration,
    ScopeLayer::Step,
    ScopeLayer::Suite,
    ScopeLayer::Call,
    ScopeLayer::Global,
    ScopeLayer::Environment,
    ScopeLayer::ConfigDefaults,
];

/// A single, non-shared layer of bindings.
#[derive(Debug, Clone, Default)]
struct Layer {
    bindings: HashMap<String, Value>,
}

/// Cross-suite shared variable registry. Writes under concurrency are
/// last-writer-wins by lock acquisition order; each write is stamped with a
/// monotonic sequence number so the run report can show what happened
/// without the engine claiming to guarantee a specific interleaving.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    bindings: RwLock<HashMap<String, (Value, u64)>>,
    sequence: AtomicU64,
}

impl GlobalRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.bindings.read().get(name).map(|(v, _)| v.clone())
    }

    /// Returns the sequence number assigned to this write.
    pub fn set(&self, name: &str, value: Value) -> u64 {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.bindings.write().insert(name.to_string(), (value, seq));
        seq
    }
}

/// The full chain of scopes visible to one step/iteration.
pub struct Scopes {
    layers: HashMap<ScopeLayer, Layer>,
    global: Arc<GlobalRegistry>,
}

impl Scopes {
    pub fn new(global: Arc<GlobalRegistry>) -> Self {
        let mut layers = HashMap::new();
        for layer in LAYER_ORDER {
            layers.insert(layer, Layer::default());
        }
        Self { layers, global }
    }

    /// Seed the environment layer from the process environment, and the
    /// config-defaults layer from the loaded config's `globals.variables`.
    pub fn seed_environment(&mut self) {
        let layer = self.layers.get_mut(&ScopeLayer::Environment).unwrap();
        for (key, value) in std::env::vars() {
            layer.bindings.insert(key, Value::String(value));
        }
    }

    pub fn set_config_defaults(&mut self, defaults: HashMap<String, Value>) {
        self.layers.insert(
            ScopeLayer::ConfigDefaults,
            Layer { bindings: defaults },
        );
    }

    /// Write a binding into exactly one named layer.
    pub fn set(&mut self, layer: ScopeLayer, name: &str, value: Value) {
        if layer == ScopeLayer::Global {
            self.global.set(name, value);
            return;
        }
        self.layers
            .get_mut(&layer)
            .unwrap()
            .bindings
            .insert(name.to_string(), value);
    }

    /// A fresh child scope sharing the global registry and config defaults,
    /// but with empty iteration/step/suite/call layers — used when entering
    /// a called suite.
    pub fn child(&self) -> Self {
        let mut child = Self::new(Arc::clone(&self.global));
        child.layers.insert(
            ScopeLayer::Environment,
            self.layers[&ScopeLayer::Environment].clone(),
        );
        child.layers.insert(
            ScopeLayer::ConfigDefaults,
            self.layers[&ScopeLayer::ConfigDefaults].clone(),
        );
        child
    }

    /// Resolve a dotted/indexed path against the scope chain, first match
    /// wins across layers in precedence order.
    pub fn get(&self, path: &str) -> Option<Value> {
        let (head, rest) = split_head(path);
        for layer in LAYER_ORDER {
            if layer == ScopeLayer::Global {
                if let Some(root) = self.global.get(head) {
                    return resolve_rest(&root, rest);
                }
                continue;
            }
            if let Some(root) = self.layers[&layer].bindings.get(head) {
                return resolve_rest(root, rest);
            }
        }
        None
    }

    /// A snapshot of one layer's own bindings, without resolving through the
    /// rest of the chain. Used to read back what a suite promoted to its own
    /// scope (e.g. after a `call` returns, or when a suite finishes and its
    /// promotions need to be reported).
    pub fn layer_snapshot(&self, layer: ScopeLayer) -> HashMap<String, Value> {
        if layer == ScopeLayer::Global {
            return self
                .global
                .bindings
                .read()
                .iter()
                .map(|(k, (v, _))| (k.clone(), v.clone()))
                .collect();
        }
        self.layers[&layer].bindings.clone()
    }

    /// A snapshot of every variable visible right now, used by the
    /// `$variables`/`$all_variables` introspective interpolation tokens.
    pub fn snapshot_all(&self) -> Value {
        let mut merged = serde_json::Map::new();
        for layer in LAYER_ORDER.iter().rev() {
            if *layer == ScopeLayer::Global {
                for (k, (v, _)) in self.global.bindings.read().iter() {
                    merged.insert(k.clone(), v.clone());
                }
                continue;
            }
            for (k, v) in &self.layers[layer].bindings {
                merged.insert(k.clone(), v.clone());
            }
        }
        Value::Object(merged)
    }
}

fn split_head(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    }
}

fn resolve_rest(root: &Value, rest: &str) -> Option<Value> {
    get_path(root, rest).cloned()
}

impl Clone for Layer {
    fn clone(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precedence_is_iteration_then_step_then_suite() {
        let mut scopes = Scopes::new(GlobalRegistry::new());
        scopes.set(ScopeLayer::Suite, "x", json!("suite"));
        scopes.set(ScopeLayer::Step, "x", json!("step"));
        scopes.set(ScopeLayer::Iteration, "x", json!("iteration"));
        assert_eq!(scopes.get("x"), Some(json!("iteration")));
    }

    #[test]
    fn falls_through_to_global_then_environment() {
        let global = GlobalRegistry::new();
        global.set("shared", json!(42));
        let scopes = Scopes::new(global);
        assert_eq!(scopes.get("shared"), Some(json!(42)));
        assert_eq!(scopes.get("nothing_anywhere"), None);
    }

    #[test]
    fn dotted_path_traverses_into_resolved_value() {
        let mut scopes = Scopes::new(GlobalRegistry::new());
        scopes.set(ScopeLayer::Suite, "user", json!({"name": "ada"}));
        assert_eq!(scopes.get("user.name"), Some(json!("ada")));
    }

    #[test]
    fn layer_snapshot_reads_back_only_that_layer() {
        let mut scopes = Scopes::new(GlobalRegistry::new());
        scopes.set(ScopeLayer::Suite, "a", json!(1));
        scopes.set(ScopeLayer::Step, "b", json!(2));
        let suite_layer = scopes.layer_snapshot(ScopeLayer::Suite);
        assert_eq!(suite_layer.get("a"), Some(&json!(1)));
        assert_eq!(suite_layer.get("b"), None);
    }

    #[test]
    fn global_writes_are_stamped_with_increasing_sequence() {
        let global = GlobalRegistry::new();
        let a = global.set("k", json!(1));
        let b = global.set("k", json!(2));
        assert!(b > a);
        assert_eq!(global.get("k"), Some(json!(2)));
    }
}
