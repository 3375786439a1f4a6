//! Body matching configuration and compilation.
//!
//! Supports text matching on the UTF-8 body plus JSON equality and a simple
//! JSONPath extraction.

use super::logical::ValueMatcher;
use super::matcher::{describe_value, Matcher, Mismatch};
use super::options::PredicateOptions;
use super::string_matcher::{CompiledStringMatcher, StringMatcher};
use crate::error::PredicateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Body matching configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum BodyMatcher {
    /// Exact string match
    Equals(String),

    /// String contains substring
    Contains(String),

    /// Regex pattern match
    Matches(String),

    /// JSON deep equality (for JSON bodies)
    #[serde(rename = "jsonEquals")]
    JsonEquals(serde_json::Value),

    /// JSON path expression match
    #[serde(rename = "jsonPath")]
    JsonPath {
        path: String,
        #[serde(flatten)]
        matcher: StringMatcher,
    },
}

/// Compiled body matcher evaluated against the body text.
#[derive(Debug, Clone)]
pub enum CompiledBodyMatcher {
    Text(ValueMatcher),
    JsonEquals {
        expected: serde_json::Value,
        case_sensitive: bool,
    },
    JsonPath {
        path: String,
        matcher: ValueMatcher,
    },
    Not(Box<CompiledBodyMatcher>),
}

impl CompiledBodyMatcher {
    /// Compile a BodyMatcher configuration.
    pub fn compile(
        matcher: &BodyMatcher,
        options: &PredicateOptions,
    ) -> Result<Self, PredicateError> {
        let leaf = |m: StringMatcher| -> Result<ValueMatcher, PredicateError> {
            let compiled = ValueMatcher::Leaf(CompiledStringMatcher::compile(&m)?);
            Ok(if options.case_sensitive {
                compiled
            } else {
                compiled.ignoring_case()
            })
        };

        let compiled = match matcher {
            BodyMatcher::Equals(v) => {
                CompiledBodyMatcher::Text(leaf(StringMatcher::Equals(v.clone()))?)
            }
            BodyMatcher::Contains(v) => {
                CompiledBodyMatcher::Text(leaf(StringMatcher::Contains(v.clone()))?)
            }
            BodyMatcher::Matches(pattern) => {
                CompiledBodyMatcher::Text(leaf(StringMatcher::Matches(pattern.clone()))?)
            }
            BodyMatcher::JsonEquals(value) => CompiledBodyMatcher::JsonEquals {
                expected: value.clone(),
                case_sensitive: options.case_sensitive,
            },
            BodyMatcher::JsonPath { path, matcher } => {
                Self::json_path(path, leaf(matcher.clone())?)?
            }
        };

        Ok(if options.not {
            CompiledBodyMatcher::Not(Box::new(compiled))
        } else {
            compiled
        })
    }

    /// Match the JSON value selected by `path`.
    pub fn json_path(path: &str, matcher: ValueMatcher) -> Result<Self, PredicateError> {
        if !path.starts_with('$') {
            return Err(PredicateError::InvalidJsonPath(path.to_string()));
        }
        Ok(CompiledBodyMatcher::JsonPath {
            path: path.to_string(),
            matcher,
        })
    }

    pub fn json_equals(expected: serde_json::Value) -> Self {
        CompiledBodyMatcher::JsonEquals {
            expected,
            case_sensitive: true,
        }
    }
}

impl Matcher<str> for CompiledBodyMatcher {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn check(&self, body: &str) -> Result<(), Mismatch> {
        match self {
            CompiledBodyMatcher::Text(matcher) => matcher.check(Some(body)),
            CompiledBodyMatcher::JsonEquals {
                expected,
                case_sensitive,
            } => match serde_json::from_str::<serde_json::Value>(body) {
                Ok(actual) if json_deep_equals(&actual, expected, *case_sensitive) => Ok(()),
                Ok(actual) => Err(Mismatch::new(format!("was {actual}"))),
                Err(_) => Err(Mismatch::new(format!("was not JSON: {body:?}"))),
            },
            CompiledBodyMatcher::JsonPath { path, matcher } => {
                let value = extract_json_path(body, path);
                if matcher.matches(value.as_deref()) {
                    Ok(())
                } else {
                    Err(Mismatch::new(format!(
                        "{path} {}",
                        describe_value(value.as_deref())
                    )))
                }
            }
            CompiledBodyMatcher::Not(inner) => match inner.check(body) {
                Ok(()) => Err(Mismatch::new(describe_value(Some(body)))),
                Err(_) => Ok(()),
            },
        }
    }
}

impl fmt::Display for CompiledBodyMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledBodyMatcher::Text(matcher) => write!(f, "{matcher}"),
            CompiledBodyMatcher::JsonEquals { expected, .. } => {
                write!(f, "json equal to {expected}")
            }
            CompiledBodyMatcher::JsonPath { path, matcher } => write!(f, "{path} {matcher}"),
            CompiledBodyMatcher::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

/// Deep JSON equality comparison with optional case sensitivity.
///
/// Objects match partially: every expected key must be present and equal,
/// extra keys in the actual value are ignored.
fn json_deep_equals(
    actual: &serde_json::Value,
    expected: &serde_json::Value,
    case_sensitive: bool,
) -> bool {
    use serde_json::Value;

    match (actual, expected) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => {
            if case_sensitive {
                a == b
            } else {
                a.to_lowercase() == b.to_lowercase()
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| json_deep_equals(x, y, case_sensitive))
        }
        (Value::Object(a), Value::Object(b)) => b.iter().all(|(key, expected_val)| {
            a.get(key)
                .is_some_and(|actual_val| json_deep_equals(actual_val, expected_val, case_sensitive))
        }),
        _ => false,
    }
}

/// Extract a value from JSON using a simple JSONPath expression.
///
/// Supports:
/// - `$.field` - top-level field
/// - `$.field.nested` - nested field
/// - `$.array[0]` - array index
/// - `$.array[*].field` - all elements' field (returns first match)
pub fn extract_json_path(body: &str, path: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;

    let path = path.strip_prefix("$.").unwrap_or(path);
    let path = path.strip_prefix('$').unwrap_or(path);

    let value = navigate_json(&json, path)?;

    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => Some("null".to_string()),
        _ => Some(value.to_string()),
    }
}

fn navigate_json<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    if path.is_empty() {
        return Some(value);
    }

    // Split on first . or [
    let (segment, rest) = match (path.find('.'), path.find('[')) {
        (Some(d), Some(b)) if d < b => {
            let (seg, rest) = path.split_at(d);
            (seg, &rest[1..])
        }
        (_, Some(b)) => path.split_at(b),
        (Some(d), None) => {
            let (seg, rest) = path.split_at(d);
            (seg, &rest[1..])
        }
        (None, None) => (path, ""),
    };

    if segment.is_empty() && path.starts_with('[') {
        let end = path.find(']')?;
        let index = &path[1..end];
        let rest = path[end + 1..]
            .strip_prefix('.')
            .unwrap_or(&path[end + 1..]);

        if index == "*" {
            return value
                .as_array()?
                .iter()
                .find_map(|item| navigate_json(item, rest));
        }
        let index = index.parse::<usize>().ok()?;
        return navigate_json(value.as_array()?.get(index)?, rest);
    }

    let next = value.as_object()?.get(segment)?;
    navigate_json(next, rest)
}
