//! Assertion Engine: evaluates each assertion rule against `{response,
//! variable snapshot}`. No short-circuiting — every rule in a step is
//! evaluated so a `StepResult` can enumerate every failure.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use testflow_core::suite::{AssertionRule, AssertionRuleSet};
use testflow_core::value::{get_path, type_name};

use crate::error::ExecError;
use crate::result::AssertionResult;

/// Relative tolerance for numeric comparisons: `|a-b| <= eps * max(1, |a|, |b|)`.
const FLOAT_TOLERANCE: f64 = 1e-9;

pub struct AssertionEngine {
    regex_cache: HashMap<String, Regex>,
}

impl Default for AssertionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionEngine {
    pub fn new() -> Self {
        Self { regex_cache: HashMap::new() }
    }

    /// Evaluate one `(fieldPath, rule)` pair. A `Simple` rule is an implicit
    /// `equals`; a `Structured` rule may contribute several results, one per
    /// populated check.
    pub fn evaluate(
        &mut self,
        field_path: &str,
        rule: &AssertionRule,
        context: &Value,
    ) -> Result<Vec<AssertionResult>, ExecError> {
        let actual = get_path(context, field_path).cloned().unwrap_or(Value::Null);
        let exists = get_path(context, field_path).is_some();

        match rule {
            AssertionRule::Simple(expected) => Ok(vec![self.check_equals(field_path, expected, &actual, exists)]),
            AssertionRule::Structured(set) => self.evaluate_set(field_path, set, &actual, exists),
        }
    }

    fn evaluate_set(
        &mut self,
        field_path: &str,
        set: &AssertionRuleSet,
        actual: &Value,
        exists: bool,
    ) -> Result<Vec<AssertionResult>, ExecError> {
        let mut results = Vec::new();

        if let Some(expected) = &set.equals {
            results.push(self.check_equals(field_path, expected, actual, exists));
        }
        if let Some(expected) = &set.not_equals {
            results.push(self.check_not_equals(field_path, expected, actual, exists));
        }
        if let Some(expected) = &set.contains {
            results.push(check_contains(field_path, expected, actual));
        }
        if let Some(expected) = &set.not_contains {
            results.push(check_not_contains(field_path, expected, actual));
        }
        if let Some(expected) = &set.greater_than {
            results.push(check_numeric(field_path, "greater_than", expected, actual, |a, b| a > b));
        }
        if let Some(expected) = &set.less_than {
            results.push(check_numeric(field_path, "less_than", expected, actual, |a, b| a < b));
        }
        if let Some(expected) = &set.greater_or_equal {
            results.push(check_numeric(field_path, "greater_or_equal", expected, actual, |a, b| a >= b || float_eq(a, b)));
        }
        if let Some(expected) = &set.less_or_equal {
            results.push(check_numeric(field_path, "less_or_equal", expected, actual, |a, b| a <= b || float_eq(a, b)));
        }
        if let Some((lo, hi)) = &set.between {
            results.push(check_between(field_path, lo, hi, actual));
        }
        if let Some(pattern) = &set.matches {
            results.push(self.check_matches(field_path, pattern, actual)?);
        }
        if let Some(expected_len) = &set.length {
            results.push(check_length(field_path, expected_len, actual));
        }
        if let Some(should_exist) = set.exists {
            results.push(check_exists(field_path, should_exist, exists));
        }
        if let Some(should_not_exist) = set.not_exists {
            results.push(check_exists(field_path, !should_not_exist, exists));
        }
        if let Some(expected_type) = &set.type_is {
            results.push(check_type(field_path, expected_type, actual, exists));
        }
        if let Some(options) = &set.one_of {
            results.push(check_one_of(field_path, options, actual));
        }

        Ok(results)
    }

    fn check_equals(&self, field_path: &str, expected: &Value, actual: &Value, exists: bool) -> AssertionResult {
        let passed = exists && values_equal(expected, actual);
        AssertionResult {
            field_path: field_path.to_string(),
            rule: "equals".to_string(),
            passed,
            expected: expected.clone(),
            actual: actual.clone(),
            message: if passed {
                "values are equal".to_string()
            } else {
                format!("expected {expected}, got {actual}")
            },
        }
    }

    fn check_not_equals(&self, field_path: &str, expected: &Value, actual: &Value, exists: bool) -> AssertionResult {
        let passed = !exists || !values_equal(expected, actual);
        AssertionResult {
            field_path: field_path.to_string(),
            rule: "not_equals".to_string(),
            passed,
            expected: expected.clone(),
            actual: actual.clone(),
            message: if passed {
                "values differ as expected".to_string()
            } else {
                format!("expected not to equal {expected}")
            },
        }
    }

    fn check_matches(&mut self, field_path: &str, pattern: &str, actual: &Value) -> Result<AssertionResult, ExecError> {
        if !self.regex_cache.contains_key(pattern) {
            let re = Regex::new(pattern).map_err(|source| ExecError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
            self.regex_cache.insert(pattern.to_string(), re);
        }
        let re = &self.regex_cache[pattern];
        let haystack = actual.as_str().map(|s| s.to_string()).unwrap_or_else(|| actual.to_string());
        let passed = re.is_match(&haystack);
        Ok(AssertionResult {
            field_path: field_path.to_string(),
            rule: "matches".to_string(),
            passed,
            expected: Value::String(pattern.to_string()),
            actual: actual.clone(),
            message: if passed {
                "matched".to_string()
            } else {
                format!("{haystack:?} did not match /{pattern}/")
            },
        })
    }
}

// Standalone helpers below need no regex cache, so they don't take `&self`.

fn check_contains(field_path: &str, expected: &Value, actual: &Value) -> AssertionResult {
    let passed = match (actual, expected) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::Array(items), needle) => items.contains(needle),
        _ => false,
    };
    AssertionResult {
        field_path: field_path.to_string(),
        rule: "contains".to_string(),
        passed,
        expected: expected.clone(),
        actual: actual.clone(),
        message: if passed {
            "contains expected value".to_string()
        } else {
            format!("{actual} does not contain {expected}")
        },
    }
}

fn check_not_contains(field_path: &str, expected: &Value, actual: &Value) -> AssertionResult {
    let mut inverse = check_contains(field_path, expected, actual);
    inverse.rule = "not_contains".to_string();
    inverse.passed = !inverse.passed;
    inverse.message = if inverse.passed {
        "does not contain value".to_string()
    } else {
        format!("{actual} unexpectedly contains {expected}")
    };
    inverse
}

fn check_numeric(
    field_path: &str,
    rule_name: &str,
    expected: &Value,
    actual: &Value,
    cmp: impl Fn(f64, f64) -> bool,
) -> AssertionResult {
    let passed = match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    };
    AssertionResult {
        field_path: field_path.to_string(),
        rule: rule_name.to_string(),
        passed,
        expected: expected.clone(),
        actual: actual.clone(),
        message: if passed {
            "numeric comparison passed".to_string()
        } else {
            format!("{actual} failed {rule_name} {expected}")
        },
    }
}

fn check_between(field_path: &str, lo: &Value, hi: &Value, actual: &Value) -> AssertionResult {
    let passed = match (actual.as_f64(), lo.as_f64(), hi.as_f64()) {
        (Some(a), Some(l), Some(h)) => a >= l - tolerance(a, l) && a <= h + tolerance(a, h),
        _ => false,
    };
    AssertionResult {
        field_path: field_path.to_string(),
        rule: "between".to_string(),
        passed,
        expected: Value::Array(vec![lo.clone(), hi.clone()]),
        actual: actual.clone(),
        message: if passed {
            "within range".to_string()
        } else {
            format!("{actual} is not between {lo} and {hi}")
        },
    }
}

fn check_length(field_path: &str, expected_len: &Value, actual: &Value) -> AssertionResult {
    let len = match actual {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    let expected_n = expected_len.as_u64().map(|n| n as usize);
    let passed = matches!((len, expected_n), (Some(a), Some(e)) if a == e);
    AssertionResult {
        field_path: field_path.to_string(),
        rule: "length".to_string(),
        passed,
        expected: expected_len.clone(),
        actual: len.map(|n| Value::from(n)).unwrap_or(Value::Null),
        message: if passed {
            "length matches".to_string()
        } else {
            format!("expected length {expected_len}, got {:?}", len)
        },
    }
}

fn check_exists(field_path: &str, should_exist: bool, exists: bool) -> AssertionResult {
    let passed = exists == should_exist;
    AssertionResult {
        field_path: field_path.to_string(),
        rule: if should_exist { "exists" } else { "not_exists" }.to_string(),
        passed,
        expected: Value::Bool(should_exist),
        actual: Value::Bool(exists),
        message: if passed {
            "presence check passed".to_string()
        } else if should_exist {
            format!("{field_path} does not exist")
        } else {
            format!("{field_path} unexpectedly exists")
        },
    }
}

fn check_type(field_path: &str, expected_type: &str, actual: &Value, exists: bool) -> AssertionResult {
    let actual_type = if exists { type_name(actual) } else { "undefined" };
    let passed = actual_type == expected_type
        || (expected_type == "integer" && actual.as_i64().is_some());
    AssertionResult {
        field_path: field_path.to_string(),
        rule: "type".to_string(),
        passed,
        expected: Value::String(expected_type.to_string()),
        actual: Value::String(actual_type.to_string()),
        message: if passed {
            "type matches".to_string()
        } else {
            format!("expected type {expected_type}, got {actual_type}")
        },
    }
}

fn check_one_of(field_path: &str, options: &[Value], actual: &Value) -> AssertionResult {
    let passed = options.iter().any(|o| values_equal(o, actual));
    AssertionResult {
        field_path: field_path.to_string(),
        rule: "one_of".to_string(),
        passed,
        expected: Value::Array(options.to_vec()),
        actual: actual.clone(),
        message: if passed {
            "value is one of the allowed options".to_string()
        } else {
            format!("{actual} is not one of {options:?}")
        },
    }
}

fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected.as_f64(), actual.as_f64()) {
        (Some(e), Some(a)) => float_eq(e, a),
        _ => expected == actual,
    }
}

fn tolerance(a: f64, b: f64) -> f64 {
    FLOAT_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= tolerance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use testflow_core::suite::AssertionRuleSet;

    fn context() -> Value {
        json!({
            "status_code": 200,
            "body": {"count": 3, "name": "ada", "tags": ["x", "y"]},
        })
    }

    #[test]
    fn simple_rule_is_implicit_equals() {
        let mut engine = AssertionEngine::new();
        let rule = AssertionRule::Simple(json!(200));
        let results = engine.evaluate("status_code", &rule, &context()).unwrap();
        assert!(results[0].passed);
    }

    #[test]
    fn missing_field_fails_equals_but_passes_not_exists() {
        let mut engine = AssertionEngine::new();
        let set = AssertionRuleSet {
            not_exists: Some(true),
            ..Default::default()
        };
        let rule = AssertionRule::Structured(Box::new(set));
        let results = engine.evaluate("body.missing", &rule, &context()).unwrap();
        assert!(results[0].passed);
    }

    #[test]
    fn between_is_inclusive_with_float_tolerance() {
        let mut engine = AssertionEngine::new();
        let set = AssertionRuleSet {
            between: Some((json!(1), json!(3))),
            ..Default::default()
        };
        let rule = AssertionRule::Structured(Box::new(set));
        let results = engine.evaluate("body.count", &rule, &context()).unwrap();
        assert!(results[0].passed);
    }

    #[test]
    fn matches_compiles_and_caches_regex() {
        let mut engine = AssertionEngine::new();
        let set = AssertionRuleSet {
            matches: Some("^a.a$".to_string()),
            ..Default::default()
        };
        let rule = AssertionRule::Structured(Box::new(set));
        let results = engine.evaluate("body.name", &rule, &context()).unwrap();
        assert!(results[0].passed);
        assert_eq!(engine.regex_cache.len(), 1);
    }

    #[test]
    fn type_rule_recognizes_integer_as_number() {
        let mut engine = AssertionEngine::new();
        let set = AssertionRuleSet {
            type_is: Some("integer".to_string()),
            ..Default::default()
        };
        let rule = AssertionRule::Structured(Box::new(set));
        let results = engine.evaluate("body.count", &rule, &context()).unwrap();
        assert!(results[0].passed);
    }

    #[test]
    fn all_assertions_in_a_set_are_evaluated_without_short_circuit() {
        let mut engine = AssertionEngine::new();
        let set = AssertionRuleSet {
            equals: Some(json!(999)),
            exists: Some(true),
            ..Default::default()
        };
        let rule = AssertionRule::Structured(Box::new(set));
        let results = engine.evaluate("body.count", &rule, &context()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results[0].passed);
        assert!(results[1].passed);
    }
}
