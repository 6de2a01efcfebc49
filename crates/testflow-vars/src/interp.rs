//! `{{ ... }}` interpolation: tokenizing, grammar dispatch, and recursive
//! application over strings and whole JSON value trees.

use serde_json::Value;

use crate::error::VarsError;
use crate::faker::FakerProvider;

const MAX_INTERPOLATION_DEPTH: u32 = 8;

/// Anything that can resolve a dotted/indexed variable path and produce a
/// full snapshot for the `$variables` family of tokens. `Scopes` is the only
/// real implementor; tests use a bare `HashMap`-backed stand-in.
pub trait VariableSource {
    fn resolve(&self, path: &str) -> Option<Value>;
    fn snapshot(&self) -> Value;
}

/// Evaluates `$js.<expression>` tokens and `pre_script`/`post_script`
/// blocks. Implemented by the sandboxed expression evaluator; kept as a
/// trait here so this crate doesn't depend on the sandbox crate.
pub trait ScriptEvaluator {
    fn evaluate(&self, expression: &str, vars: &dyn VariableSource) -> Result<Value, VarsError>;
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Token(String),
}

fn tokenize(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                break;
            }
            Some(start) => {
                if start > 0 {
                    segments.push(Segment::Literal(rest[..start].to_string()));
                }
                let after_open = &rest[start + 2..];
                match after_open.find("}}") {
                    None => {
                        // Unterminated token: treat the rest as literal text.
                        segments.push(Segment::Literal(rest[start..].to_string()));
                        break;
                    }
                    Some(end) => {
                        segments.push(Segment::Token(after_open[..end].trim().to_string()));
                        rest = &after_open[end + 2..];
                    }
                }
            }
        }
    }
    segments
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Plain(String),
    Faker {
        namespace: String,
        method: String,
        arg: Option<usize>,
    },
    Env {
        name: String,
        default: Option<String>,
    },
    Script(String),
    AllVariables,
    EnvironmentVariables,
    Variables,
}

fn parse_token(inner: &str) -> Result<TokenKind, VarsError> {
    if inner == "$variables" {
        return Ok(TokenKind::Variables);
    }
    if inner == "$environment_variables" {
        return Ok(TokenKind::EnvironmentVariables);
    }
    if inner == "$all_variables" {
        return Ok(TokenKind::AllVariables);
    }
    if let Some(rest) = inner.strip_prefix("$js.") {
        return Ok(TokenKind::Script(rest.to_string()));
    }
    if let Some(rest) = inner.strip_prefix("$env.") {
        return Ok(parse_env(rest));
    }
    let faker_body = inner.strip_prefix("$faker.").or_else(|| inner.strip_prefix("faker."));
    if let Some(rest) = faker_body {
        return parse_faker(rest);
    }
    Ok(TokenKind::Plain(inner.to_string()))
}

fn parse_env(rest: &str) -> TokenKind {
    match rest.split_once(":-") {
        Some((name, default)) => TokenKind::Env {
            name: name.to_string(),
            default: Some(default.to_string()),
        },
        None => TokenKind::Env {
            name: rest.to_string(),
            default: None,
        },
    }
}

fn parse_faker(rest: &str) -> Result<TokenKind, VarsError> {
    let (namespace, method_part) = rest
        .split_once('.')
        .ok_or_else(|| VarsError::MalformedToken(format!("faker.{rest}")))?;
    let (method, arg) = if let Some(open) = method_part.find('(') {
        let close = method_part
            .find(')')
            .ok_or_else(|| VarsError::MalformedToken(format!("faker.{rest}")))?;
        let n: usize = method_part[open + 1..close]
            .trim()
            .parse()
            .map_err(|_| VarsError::MalformedToken(format!("faker.{rest}")))?;
        (method_part[..open].to_string(), Some(n))
    } else {
        (method_part.to_string(), None)
    };
    Ok(TokenKind::Faker {
        namespace: namespace.to_string(),
        method,
        arg,
    })
}

/// Resolves a single `{{ ... }}` token and the whole-string/tree dispatcher
/// built on top of it.
pub struct Interpolator<'a> {
    faker: &'a FakerProvider,
    script: Option<&'a dyn ScriptEvaluator>,
    strict: bool,
}

impl<'a> Interpolator<'a> {
    pub fn new(faker: &'a FakerProvider, script: Option<&'a dyn ScriptEvaluator>, strict: bool) -> Self {
        Self { faker, script, strict }
    }

    /// Interpolate every string in a JSON value tree, recursively.
    pub fn interpolate_value(
        &self,
        value: &Value,
        vars: &dyn VariableSource,
    ) -> Result<Value, VarsError> {
        match value {
            Value::String(s) => self.interpolate_str(s, vars, 0),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.interpolate_value(item, vars)?);
                }
                Ok(Value::Array(out))
            }
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.interpolate_value(v, vars)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Interpolate one string. A template consisting of exactly one token
    /// and no surrounding literal text preserves the resolved value's
    /// native JSON type; anything else is coerced to string and
    /// concatenated.
    pub fn interpolate_str(
        &self,
        template: &str,
        vars: &dyn VariableSource,
        depth: u32,
    ) -> Result<Value, VarsError> {
        if depth >= MAX_INTERPOLATION_DEPTH {
            return Err(VarsError::InterpolationCycle(template.to_string(), MAX_INTERPOLATION_DEPTH));
        }
        let segments = tokenize(template);
        if segments.len() == 1 {
            if let Segment::Token(inner) = &segments[0] {
                let resolved = self.resolve_token(inner, vars)?;
                return self.maybe_recurse(resolved, vars, depth);
            }
        }

        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(inner) => {
                    let resolved = self.resolve_token(inner, vars)?;
                    let resolved = self.maybe_recurse(resolved, vars, depth)?;
                    out.push_str(&value_to_display_string(&resolved));
                }
            }
        }
        Ok(Value::String(out))
    }

    fn maybe_recurse(
        &self,
        value: Value,
        vars: &dyn VariableSource,
        depth: u32,
    ) -> Result<Value, VarsError> {
        match value {
            Value::String(s) if s.contains("{{") => self.interpolate_str(&s, vars, depth + 1),
            other => Ok(other),
        }
    }

    /// Interpolate a string meant to be handed to the sandboxed expression
    /// evaluator (a scenario `condition` or an iteration `over`). A template
    /// that is exactly one token preserves the resolved value's native JSON
    /// type, same as `interpolate_str` — this is what lets `over: "{{items}}"`
    /// bind directly to an already-resolved array without a round trip
    /// through the script engine. Anything else substitutes each token as
    /// JSON source rather than raw display text, so a string value comes out
    /// quoted and the surrounding literal text still parses as an
    /// expression, e.g. `{{response.body.role}} == "admin"` becomes
    /// `"admin" == "admin"`.
    pub fn interpolate_expr(
        &self,
        template: &str,
        vars: &dyn VariableSource,
        depth: u32,
    ) -> Result<Value, VarsError> {
        if depth >= MAX_INTERPOLATION_DEPTH {
            return Err(VarsError::InterpolationCycle(template.to_string(), MAX_INTERPOLATION_DEPTH));
        }
        let segments = tokenize(template);
        if segments.len() == 1 {
            if let Segment::Token(inner) = &segments[0] {
                let resolved = self.resolve_token(inner, vars)?;
                return self.maybe_recurse_expr(resolved, vars, depth);
            }
        }

        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Token(inner) => {
                    let resolved = self.resolve_token(inner, vars)?;
                    let resolved = self.maybe_recurse_expr(resolved, vars, depth)?;
                    out.push_str(&resolved.to_string());
                }
            }
        }
        Ok(Value::String(out))
    }

    fn maybe_recurse_expr(
        &self,
        value: Value,
        vars: &dyn VariableSource,
        depth: u32,
    ) -> Result<Value, VarsError> {
        match value {
            Value::String(s) if s.contains("{{") => self.interpolate_expr(&s, vars, depth + 1),
            other => Ok(other),
        }
    }

    fn resolve_token(&self, inner: &str, vars: &dyn VariableSource) -> Result<Value, VarsError> {
        match parse_token(inner)? {
            TokenKind::Plain(path) => match vars.resolve(&path) {
                Some(v) => Ok(v),
                None if self.strict => Err(VarsError::Resolution(path)),
                None => {
                    tracing::warn!(path = %path, "variable did not resolve; substituting empty string");
                    Ok(Value::String(String::new()))
                }
            },
            TokenKind::Faker { namespace, method, arg } => {
                Ok(Value::String(self.faker.generate(&namespace, &method, arg)?))
            }
            TokenKind::Env { name, default } => match std::env::var(&name) {
                Ok(v) => Ok(Value::String(v)),
                Err(_) => match default {
                    Some(d) => Ok(Value::String(d)),
                    None => Err(VarsError::EnvNotSet(name)),
                },
            },
            TokenKind::Script(expr) => {
                let evaluator = self
                    .script
                    .ok_or_else(|| VarsError::Script("no script evaluator configured".to_string()))?;
                evaluator.evaluate(&expr, vars)
            }
            TokenKind::Variables | TokenKind::AllVariables => Ok(vars.snapshot()),
            TokenKind::EnvironmentVariables => {
                let vars: std::collections::HashMap<String, String> = std::env::vars().collect();
                Ok(serde_json::to_value(vars).unwrap_or(Value::Null))
            }
        }
    }
}

fn value_to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
