//! Suite file schema and YAML parsing.
//!
//! Defines the structure of a YAML suite file: metadata, dependencies, the
//! suite's initial variable scope, and its ordered steps.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::NodeId;
use crate::priority::Priority;
use crate::value::Value;

/// Errors raised while parsing a suite file.
#[derive(Debug, Error)]
pub enum SuiteParseError {
    #[error("failed to read suite file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse suite YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("suite is missing a required `node_id`")]
    MissingNodeId,
}

/// The parsed contents of one YAML suite file. Immutable once Discovery has
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    /// Unique identifier for this suite; the key used in dependency edges.
    pub node_id: NodeId,

    /// Display name.
    #[serde(default)]
    pub suite_name: String,

    /// Priority class; default `medium`.
    #[serde(default)]
    pub priority: Priority,

    /// Tags used by discovery filters and scenario/step tagging.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Default base URL prepended to relative request URLs.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Ordered list of dependency references.
    #[serde(default)]
    pub depends: Vec<DependencyRef>,

    /// The suite's initial local (suite-scope) variables.
    #[serde(default)]
    pub variables: HashMap<String, Value>,

    /// Ordered steps to execute.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Optional before/after hooks.
    #[serde(default)]
    pub hooks: Option<Hooks>,
}

impl Suite {
    /// Parse a suite from a YAML string. The file path is only used for
    /// error messages.
    pub fn from_yaml(yaml: &str, path_for_errors: &str) -> Result<Self, SuiteParseError> {
        let suite: Suite =
            serde_yaml::from_str(yaml).map_err(|source| SuiteParseError::Yaml {
                path: path_for_errors.to_string(),
                source,
            })?;
        if suite.node_id.as_str().is_empty() {
            return Err(SuiteParseError::MissingNodeId);
        }
        Ok(suite)
    }

    /// Load and parse a suite from a file on disk.
    pub fn from_file(path: &Path) -> Result<Self, SuiteParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| SuiteParseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content, &path.display().to_string())
    }
}

/// A reference to another suite, by node-id or by file path. Discovery
/// resolves this into a concrete `NodeId`: explicit node-id match first,
/// then a relative path match against another discovered file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyRef {
    /// Shorthand: bare string, tried as a node-id first and a path second.
    Shorthand(String),
    /// Explicit node-id reference.
    NodeId { node_id: String },
    /// Explicit relative-path reference.
    Path { path: String },
}

/// Optional suite-level lifecycle hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hooks {
    /// Run once before the first step.
    #[serde(default)]
    pub before_all: Vec<Step>,

    /// Run once after the last step, even if a prior step failed.
    #[serde(default)]
    pub after_all: Vec<Step>,
}

/// One executable unit within a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable step name.
    pub name: String,

    /// An HTTP request to issue.
    #[serde(default)]
    pub request: Option<RequestSpec>,

    /// Invoke another suite by node-id.
    #[serde(default)]
    pub call: Option<CallSpec>,

    /// Prompt the user for values (fail-fast in non-interactive mode).
    #[serde(default)]
    pub input: Option<InputSpec>,

    /// Variable-name → extractor expression, in declaration order: a `$js`
    /// capture may read a variable an earlier capture in the same step wrote.
    #[serde(default)]
    pub capture: IndexMap<String, CaptureSpec>,

    /// Field-path → assertion rule, in declaration order: `StepResult.assertions`
    /// reports them in this order so two runs with the same inputs agree.
    #[serde(default)]
    pub assert: IndexMap<String, AssertionRule>,

    /// Conditional branches evaluated after the response is received.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,

    /// Expand this step into N iterations.
    #[serde(default)]
    pub iterate: Option<IterateSpec>,

    /// Sandboxed expression evaluated before the request is built.
    #[serde(default)]
    pub pre_script: Option<String>,

    /// Sandboxed expression evaluated after assertions run.
    #[serde(default)]
    pub post_script: Option<String>,
}

/// An HTTP request declaration. Every string field is interpolated before
/// the request is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Invoke another suite by node-id, passing an input map into its call scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSpec {
    pub node_id: String,
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
}

/// Prompt the user for one or more values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    /// Variable name → prompt text.
    pub prompts: HashMap<String, String>,
}

/// A capture extractor: either a bare expression string, or a structured
/// form that also declares where the captured value should be promoted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureSpec {
    Simple(String),
    Structured(CaptureRule),
}

impl CaptureSpec {
    pub fn extractor(&self) -> &str {
        match self {
            CaptureSpec::Simple(s) => s,
            CaptureSpec::Structured(r) => &r.from,
        }
    }

    pub fn promote(&self) -> Option<PromoteScope> {
        match self {
            CaptureSpec::Simple(_) => None,
            CaptureSpec::Structured(r) => r.promote,
        }
    }

    pub fn overwrite(&self) -> bool {
        match self {
            CaptureSpec::Simple(_) => false,
            CaptureSpec::Structured(r) => r.overwrite,
        }
    }
}

/// Structured capture declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRule {
    pub from: String,
    #[serde(default)]
    pub promote: Option<PromoteScope>,
    #[serde(default)]
    pub overwrite: bool,
}

/// Where a captured variable should be promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromoteScope {
    Suite,
    Global,
}

/// One assertion rule, either a bare value (implicit `equals`) or a
/// structured set of checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionRule {
    Simple(Value),
    Structured(Box<AssertionRuleSet>),
}

/// Structured assertion checks. Every field present is evaluated; a
/// `AssertionRule` with multiple fields set requires all of them to pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssertionRuleSet {
    pub equals: Option<Value>,
    pub not_equals: Option<Value>,
    pub contains: Option<Value>,
    pub not_contains: Option<Value>,
    pub greater_than: Option<Value>,
    pub less_than: Option<Value>,
    pub greater_or_equal: Option<Value>,
    pub less_or_equal: Option<Value>,
    pub between: Option<(Value, Value)>,
    pub matches: Option<String>,
    pub length: Option<Value>,
    pub exists: Option<bool>,
    pub not_exists: Option<bool>,
    #[serde(rename = "type")]
    pub type_is: Option<String>,
    pub one_of: Option<Vec<Value>>,
}

/// A conditional branch contributing additional assertions/captures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub condition: String,
    #[serde(default)]
    pub then: Option<ScenarioBranch>,
    #[serde(default, rename = "else")]
    pub r#else: Option<ScenarioBranch>,
}

/// The assertions/captures a scenario branch contributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioBranch {
    #[serde(default)]
    pub assert: IndexMap<String, AssertionRule>,
    #[serde(default)]
    pub capture: IndexMap<String, CaptureSpec>,
}

/// Expands a step into N iterations from a data array or a count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IterateSpec {
    Over { over: String, r#as: String },
    Count { count: u64, r#as: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_suite() {
        let yaml = r#"
node_id: suite_a
suite_name: "Suite A"
steps:
  - name: "ping"
    request:
      method: GET
      url: "/ping"
"#;
        let suite = Suite::from_yaml(yaml, "inline").unwrap();
        assert_eq!(suite.node_id.as_str(), "suite_a");
        assert_eq!(suite.priority, Priority::Medium);
        assert_eq!(suite.steps.len(), 1);
    }

    #[test]
    fn missing_node_id_is_an_error() {
        let yaml = r#"
node_id: ""
steps: []
"#;
        assert!(matches!(
            Suite::from_yaml(yaml, "inline"),
            Err(SuiteParseError::MissingNodeId)
        ));
    }

    #[test]
    fn parse_full_suite_with_depends_capture_assert_scenario_iterate() {
        let yaml = r#"
node_id: b
suite_name: "Suite B"
priority: high
depends:
  - node_id: a
  - path: ./a.yaml
variables:
  base: "https://api.example.com"
steps:
  - name: "login"
    request:
      method: POST
      url: "{{base}}/login"
    capture:
      token:
        from: "body.access_token"
        promote: suite
    assert:
      status_code: 200
      body.count:
        greater_than: 0
    scenarios:
      - condition: "{{response.body.role}} == \"admin\""
        then:
          assert:
            body.permissions:
              contains: "write"
    iterate:
      over: "{{items}}"
      as: "item"
"#;
        let suite = Suite::from_yaml(yaml, "inline").unwrap();
        assert_eq!(suite.priority, Priority::High);
        assert_eq!(suite.depends.len(), 2);
        let step = &suite.steps[0];
        assert_eq!(step.capture["token"].extractor(), "body.access_token");
        assert_eq!(step.capture["token"].promote(), Some(PromoteScope::Suite));
        assert!(matches!(step.assert["status_code"], AssertionRule::Simple(_)));
        assert_eq!(step.scenarios.len(), 1);
        assert!(matches!(step.iterate, Some(IterateSpec::Over { .. })));
    }
}
