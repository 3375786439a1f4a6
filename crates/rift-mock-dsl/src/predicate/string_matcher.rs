//! Leaf string operators.
//!
//! Leaf string operators shared by method, path, query, header and body
//! predicates. Every compiled matcher evaluates an *optional* value so that
//! predicates can express "this field may be absent".

use super::matcher::CachedValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// String matching operator as written in route files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum StringMatcher {
    /// Exact string equality
    #[serde(rename = "equals")]
    Equals(String),

    /// String contains substring
    #[serde(rename = "contains")]
    Contains(String),

    /// String starts with prefix
    #[serde(rename = "startsWith")]
    StartsWith(String),

    /// String ends with suffix
    #[serde(rename = "endsWith")]
    EndsWith(String),

    /// Regex pattern match
    #[serde(rename = "matches")]
    Matches(String),

    /// `true`: the value must be present, `false`: it must be absent
    #[serde(rename = "exists")]
    Exists(bool),
}

impl Default for StringMatcher {
    fn default() -> Self {
        StringMatcher::Exists(true)
    }
}

/// Compiled string matcher for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledStringMatcher {
    Equals(CachedValue),
    Contains(CachedValue),
    StartsWith(CachedValue),
    EndsWith(CachedValue),
    Matches(Arc<Regex>),
    Exists(bool),
}

impl CompiledStringMatcher {
    /// Compile a StringMatcher into an efficient runtime form.
    pub fn compile(matcher: &StringMatcher) -> Result<Self, regex::Error> {
        match matcher {
            StringMatcher::Equals(v) => Ok(CompiledStringMatcher::Equals(CachedValue::new(v))),
            StringMatcher::Contains(v) => Ok(CompiledStringMatcher::Contains(CachedValue::new(v))),
            StringMatcher::StartsWith(v) => {
                Ok(CompiledStringMatcher::StartsWith(CachedValue::new(v)))
            }
            StringMatcher::EndsWith(v) => Ok(CompiledStringMatcher::EndsWith(CachedValue::new(v))),
            StringMatcher::Matches(pattern) => {
                let regex = Regex::new(pattern)?;
                Ok(CompiledStringMatcher::Matches(Arc::new(regex)))
            }
            StringMatcher::Exists(exists) => Ok(CompiledStringMatcher::Exists(*exists)),
        }
    }

    /// Evaluate against a possibly absent value; only `Exists` accepts `None`.
    pub fn matches(&self, value: Option<&str>, case_sensitive: bool) -> bool {
        match (self, value) {
            (CompiledStringMatcher::Exists(should_exist), v) => *should_exist == v.is_some(),

            (_, None) => false,

            (CompiledStringMatcher::Equals(cached), Some(v)) => cached.equals(v, case_sensitive),
            (CompiledStringMatcher::Contains(cached), Some(v)) => {
                cached.contained_in(v, case_sensitive)
            }
            (CompiledStringMatcher::StartsWith(cached), Some(v)) => {
                cached.starts(v, case_sensitive)
            }
            (CompiledStringMatcher::EndsWith(cached), Some(v)) => cached.ends(v, case_sensitive),

            // Case sensitivity should be in the pattern itself
            (CompiledStringMatcher::Matches(regex), Some(v)) => regex.is_match(v),
        }
    }
}

impl fmt::Display for CompiledStringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledStringMatcher::Equals(cached) => write!(f, "{:?}", cached.value),
            CompiledStringMatcher::Contains(cached) => {
                write!(f, "a string containing {:?}", cached.value)
            }
            CompiledStringMatcher::StartsWith(cached) => {
                write!(f, "a string starting with {:?}", cached.value)
            }
            CompiledStringMatcher::EndsWith(cached) => {
                write!(f, "a string ending with {:?}", cached.value)
            }
            CompiledStringMatcher::Matches(regex) => {
                write!(f, "a string matching /{}/", regex.as_str())
            }
            CompiledStringMatcher::Exists(true) => f.write_str("present"),
            CompiledStringMatcher::Exists(false) => f.write_str("absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(matcher: StringMatcher) -> CompiledStringMatcher {
        CompiledStringMatcher::compile(&matcher).unwrap()
    }

    #[test]
    fn test_equality_respects_case_flag() {
        let method = compile(StringMatcher::Equals("GET".to_string()));
        assert!(method.matches(Some("GET"), true));
        assert!(!method.matches(Some("get"), true));
        assert!(method.matches(Some("get"), false));
        assert!(!method.matches(None, false));
    }

    #[test]
    fn test_affix_operators_require_a_value() {
        let feed = compile(StringMatcher::Contains("feed".to_string()));
        let api = compile(StringMatcher::StartsWith("/api".to_string()));
        let json = compile(StringMatcher::EndsWith(".json".to_string()));

        assert!(feed.matches(Some("/api/feed/1"), true));
        assert!(feed.matches(Some("/api/FEED/1"), false));
        assert!(api.matches(Some("/api/feed"), true));
        assert!(json.matches(Some("/feed.JSON"), false));
        for matcher in [&feed, &api, &json] {
            assert!(!matcher.matches(None, true));
        }
    }

    #[test]
    fn test_regex_ignores_case_flag() {
        let offer = compile(StringMatcher::Matches(r"^/offer/\d+$".to_string()));
        assert!(offer.matches(Some("/offer/12"), true));
        assert!(!offer.matches(Some("/OFFER/12"), false));
        assert!(CompiledStringMatcher::compile(&StringMatcher::Matches("(".to_string())).is_err());
    }

    #[test]
    fn test_exists_matches_empty_but_not_absent() {
        let present = compile(StringMatcher::Exists(true));
        let absent = compile(StringMatcher::Exists(false));
        assert!(present.matches(Some(""), true));
        assert!(!present.matches(None, true));
        assert!(absent.matches(None, true));
        assert!(!absent.matches(Some("1"), true));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CompiledStringMatcher::StartsWith(CachedValue::new("/api")).to_string(),
            "a string starting with \"/api\""
        );
        assert_eq!(
            compile(StringMatcher::Matches("^/feed".to_string())).to_string(),
            "a string matching /^/feed/"
        );
        assert_eq!(CompiledStringMatcher::Exists(false).to_string(), "absent");
    }

    #[test]
    fn test_operator_keys() {
        let matcher: StringMatcher = serde_yaml::from_str("endsWith: .json").unwrap();
        assert_eq!(matcher, StringMatcher::EndsWith(".json".to_string()));
        let matcher: StringMatcher = serde_json::from_str(r#"{"exists": false}"#).unwrap();
        assert_eq!(matcher, StringMatcher::Exists(false));
    }
}
