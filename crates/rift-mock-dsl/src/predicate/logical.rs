//! Logical operators for combining string matchers.
//!
//! `ValueMatcher` is the compiled value predicate used by every request field.
//! It is built either from a `LogicalMatcher` read from a route file or
//! directly through the DSL constructors.

use super::matcher::{describe_value, CachedValue, Mismatch};
use super::string_matcher::{CompiledStringMatcher, StringMatcher};
use crate::error::PredicateError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Logical predicate for combining multiple string matchers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum LogicalMatcher {
    /// Negates the inner matcher
    Not(Box<LogicalMatcher>),

    /// Matches if ANY of the inner matchers match
    Or(Vec<LogicalMatcher>),

    /// Matches if ALL of the inner matchers match
    And(Vec<LogicalMatcher>),

    /// A leaf string matcher
    #[serde(untagged)]
    Leaf(StringMatcher),
}

impl Default for LogicalMatcher {
    fn default() -> Self {
        LogicalMatcher::Leaf(StringMatcher::Exists(true))
    }
}

/// Compiled value predicate evaluated against an optional string.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Leaf(CompiledStringMatcher),
    Not(Box<ValueMatcher>),
    AnyOf(Vec<ValueMatcher>),
    AllOf(Vec<ValueMatcher>),
    /// Evaluates the inner tree case-insensitively
    IgnoreCase(Box<ValueMatcher>),
}

impl ValueMatcher {
    /// Compile a LogicalMatcher configuration.
    pub fn compile(matcher: &LogicalMatcher) -> Result<Self, regex::Error> {
        match matcher {
            LogicalMatcher::Not(inner) => Ok(ValueMatcher::Not(Box::new(Self::compile(inner)?))),
            LogicalMatcher::Or(matchers) => {
                let compiled: Result<Vec<_>, _> = matchers.iter().map(Self::compile).collect();
                Ok(ValueMatcher::AnyOf(compiled?))
            }
            LogicalMatcher::And(matchers) => {
                let compiled: Result<Vec<_>, _> = matchers.iter().map(Self::compile).collect();
                Ok(ValueMatcher::AllOf(compiled?))
            }
            LogicalMatcher::Leaf(string_matcher) => Ok(ValueMatcher::Leaf(
                CompiledStringMatcher::compile(string_matcher)?,
            )),
        }
    }

    pub fn equal_to(value: impl Into<String>) -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::Equals(CachedValue::new(value)))
    }

    pub fn contains(value: impl Into<String>) -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::Contains(CachedValue::new(value)))
    }

    pub fn starts_with(value: impl Into<String>) -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::StartsWith(CachedValue::new(value)))
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::EndsWith(CachedValue::new(value)))
    }

    pub fn regex(pattern: &str) -> Result<Self, PredicateError> {
        Ok(ValueMatcher::Leaf(CompiledStringMatcher::Matches(
            Arc::new(Regex::new(pattern)?),
        )))
    }

    pub fn present() -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::Exists(true))
    }

    pub fn absent() -> Self {
        ValueMatcher::Leaf(CompiledStringMatcher::Exists(false))
    }

    /// Matches when the value is absent, or present and matching `self`.
    pub fn optional(self) -> Self {
        ValueMatcher::AnyOf(vec![Self::absent(), self])
    }

    pub fn negate(self) -> Self {
        ValueMatcher::Not(Box::new(self))
    }

    pub fn ignoring_case(self) -> Self {
        ValueMatcher::IgnoreCase(Box::new(self))
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        self.eval(value, true)
    }

    /// Evaluate and explain a mismatch.
    pub fn check(&self, value: Option<&str>) -> Result<(), Mismatch> {
        if self.matches(value) {
            Ok(())
        } else {
            Err(Mismatch::new(describe_value(value)))
        }
    }

    fn eval(&self, value: Option<&str>, case_sensitive: bool) -> bool {
        match self {
            ValueMatcher::Leaf(matcher) => matcher.matches(value, case_sensitive),
            ValueMatcher::Not(inner) => !inner.eval(value, case_sensitive),
            ValueMatcher::AnyOf(matchers) => matchers.iter().any(|m| m.eval(value, case_sensitive)),
            ValueMatcher::AllOf(matchers) => matchers.iter().all(|m| m.eval(value, case_sensitive)),
            ValueMatcher::IgnoreCase(inner) => inner.eval(value, false),
        }
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMatcher::Leaf(matcher) => write!(f, "{matcher}"),
            ValueMatcher::Not(inner) => write!(f, "not {inner}"),
            ValueMatcher::AnyOf(matchers) => write_joined(f, matchers, " or "),
            ValueMatcher::AllOf(matchers) => write_joined(f, matchers, " and "),
            ValueMatcher::IgnoreCase(inner) => write!(f, "{inner} ignoring case"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, matchers: &[ValueMatcher], sep: &str) -> fmt::Result {
    f.write_str("(")?;
    for (index, matcher) in matchers.iter().enumerate() {
        if index > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{matcher}")?;
    }
    f.write_str(")")
}

impl From<&str> for ValueMatcher {
    fn from(value: &str) -> Self {
        ValueMatcher::equal_to(value)
    }
}

impl From<String> for ValueMatcher {
    fn from(value: String) -> Self {
        ValueMatcher::equal_to(value)
    }
}

impl From<&String> for ValueMatcher {
    fn from(value: &String) -> Self {
        ValueMatcher::equal_to(value.as_str())
    }
}

impl From<Option<&str>> for ValueMatcher {
    /// `None` expects the value to be absent.
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(v) => ValueMatcher::equal_to(v),
            None => ValueMatcher::absent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_not() {
        let matcher = ValueMatcher::equal_to("deleted").negate();
        assert!(!matcher.matches(Some("deleted")));
        assert!(matcher.matches(Some("active")));
        // Negated equality also accepts a missing value
        assert!(matcher.matches(None));
    }

    #[test]
    fn test_logical_any_all() {
        let any = ValueMatcher::AnyOf(vec![
            ValueMatcher::contains("feed"),
            ValueMatcher::contains("offer"),
        ]);
        assert!(any.matches(Some("/api/offer/1")));
        assert!(!any.matches(Some("/api/user")));

        let all = ValueMatcher::AllOf(vec![
            ValueMatcher::starts_with("/api"),
            ValueMatcher::ends_with(".json"),
        ]);
        assert!(all.matches(Some("/api/feed.json")));
        assert!(!all.matches(Some("/api/feed.xml")));
    }

    #[test]
    fn test_optional_accepts_absent() {
        let matcher = ValueMatcher::equal_to("desc").optional();
        assert!(matcher.matches(None));
        assert!(matcher.matches(Some("desc")));
        assert!(!matcher.matches(Some("asc")));
    }

    #[test]
    fn test_ignoring_case() {
        let matcher = ValueMatcher::AllOf(vec![
            ValueMatcher::starts_with("/API"),
            ValueMatcher::contains("Feed"),
        ])
        .ignoring_case();
        assert!(matcher.matches(Some("/api/feed")));
    }

    #[test]
    fn test_check_reports_actual_value() {
        let matcher = ValueMatcher::equal_to("GET");
        assert_eq!(
            matcher.check(Some("POST")).unwrap_err().as_str(),
            "was \"POST\""
        );
        assert_eq!(matcher.check(None).unwrap_err().as_str(), "was absent");
    }

    #[test]
    fn test_display() {
        let matcher = ValueMatcher::AnyOf(vec![
            ValueMatcher::contains("a"),
            ValueMatcher::equal_to("b").negate(),
        ]);
        assert_eq!(matcher.to_string(), "(a string containing \"a\" or not \"b\")");
    }

    #[test]
    fn test_logical_serde_and_compile() {
        let json = r#"{"or": [{"contains": "feed"}, {"not": {"exists": true}}]}"#;
        let config: LogicalMatcher = serde_json::from_str(json).unwrap();
        let matcher = ValueMatcher::compile(&config).unwrap();
        assert!(matcher.matches(Some("/feed")));
        assert!(matcher.matches(None));
        assert!(!matcher.matches(Some("/offer")));
    }

    #[test]
    fn test_from_option() {
        assert!(ValueMatcher::from(None::<&str>).matches(None));
        assert!(ValueMatcher::from(Some("1")).matches(Some("1")));
    }
}
