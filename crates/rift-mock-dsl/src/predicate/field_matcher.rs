//! Named field matchers for headers and query parameters.
//!
//! The same [`FieldMatcher`] configuration drives both header predicates and
//! query parameter pairs. Header names are lowercased at compile time, query
//! parameter names are kept as written.

use super::logical::ValueMatcher;
use super::matcher::{Matcher, Mismatch};
use super::options::PredicateOptions;
use super::query_matcher::QueryParamMatcher;
use super::string_matcher::{CompiledStringMatcher, StringMatcher};
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field matching configuration as written in route files.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FieldMatcher {
    /// Simple exact match: { name: "X-Api-Key", value: "secret" }
    Simple { name: String, value: String },

    /// OR predicate - matches if ANY of the matchers match
    Or {
        name: String,
        or: Vec<StringMatcher>,
        #[serde(flatten, default)]
        options: PredicateOptions,
    },

    /// Full predicate match with operators
    Full {
        name: String,
        #[serde(flatten)]
        matcher: StringMatcher,
        #[serde(flatten, default)]
        options: PredicateOptions,
    },
}

impl FieldMatcher {
    /// Get the field name for this matcher.
    pub fn name(&self) -> &str {
        match self {
            FieldMatcher::Simple { name, .. } => name,
            FieldMatcher::Full { name, .. } => name,
            FieldMatcher::Or { name, .. } => name,
        }
    }

    /// Compile the value side of this field matcher.
    pub fn compile_value(&self) -> Result<ValueMatcher, regex::Error> {
        match self {
            FieldMatcher::Simple { value, .. } => Ok(ValueMatcher::equal_to(value.as_str())),
            FieldMatcher::Or { or, options, .. } => {
                let compiled: Result<Vec<_>, _> = or
                    .iter()
                    .map(|m| CompiledStringMatcher::compile(m).map(ValueMatcher::Leaf))
                    .collect();
                Ok(options.apply(ValueMatcher::AnyOf(compiled?)))
            }
            FieldMatcher::Full {
                matcher, options, ..
            } => Ok(options.apply(ValueMatcher::Leaf(CompiledStringMatcher::compile(
                matcher,
            )?))),
        }
    }
}

/// Compile a query field matcher into a (name, value) predicate pair.
pub fn compile_query_param(config: &FieldMatcher) -> Result<QueryParamMatcher, regex::Error> {
    Ok(QueryParamMatcher::new(
        ValueMatcher::equal_to(config.name()),
        config.compile_value()?,
    ))
}

/// Compiled predicate over one header.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    /// Lowercased header name
    pub name: String,
    pub value: ValueMatcher,
}

impl HeaderMatcher {
    pub fn new(name: &str, value: impl Into<ValueMatcher>) -> Self {
        Self {
            name: name.to_lowercase(),
            value: value.into(),
        }
    }

    pub fn compile(config: &FieldMatcher) -> Result<Self, regex::Error> {
        Ok(Self::new(config.name(), config.compile_value()?))
    }

    /// A repeated header matches when any of its values matches; a missing
    /// header is evaluated as an absent value.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), Mismatch> {
        let values: Vec<&str> = headers
            .get_all(self.name.as_str())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();

        if values.is_empty() {
            return self
                .value
                .check(None)
                .map_err(|m| Mismatch::new(format!("header {:?} {}", self.name, m)));
        }
        if values.iter().any(|v| self.value.matches(Some(*v))) {
            return Ok(());
        }

        let rendered: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
        Err(Mismatch::new(format!(
            "header {:?} was {}",
            self.name,
            rendered.join(", ")
        )))
    }
}

impl fmt::Display for HeaderMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// All header predicates must hold.
#[derive(Debug, Clone, Default)]
pub struct HeadersMatcher(Vec<HeaderMatcher>);

impl HeadersMatcher {
    pub fn new(matchers: Vec<HeaderMatcher>) -> Self {
        Self(matchers)
    }

    /// Build from (name, value) pairs.
    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<ValueMatcher>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| HeaderMatcher::new(name, value))
                .collect(),
        )
    }

    pub fn compile(configs: &[FieldMatcher]) -> Result<Self, regex::Error> {
        let compiled: Result<Vec<_>, _> = configs.iter().map(HeaderMatcher::compile).collect();
        Ok(Self(compiled?))
    }

    pub fn matchers(&self) -> &[HeaderMatcher] {
        &self.0
    }
}

impl Matcher<HeaderMap> for HeadersMatcher {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn check(&self, headers: &HeaderMap) -> Result<(), Mismatch> {
        self.0.iter().try_for_each(|m| m.check(headers))
    }
}

impl fmt::Display for HeadersMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|m| m.to_string()).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_header_matcher_simple() {
        let config = FieldMatcher::Simple {
            name: "X-Api-Key".to_string(),
            value: "secret".to_string(),
        };
        let compiled = HeaderMatcher::compile(&config).unwrap();

        assert_eq!(compiled.name, "x-api-key");
        assert!(compiled.check(&headers(&[("x-api-key", "secret")])).is_ok());
        assert!(compiled.check(&headers(&[("x-api-key", "other")])).is_err());
        assert!(compiled.check(&HeaderMap::new()).is_err());
    }

    #[test]
    fn test_query_param_keeps_name_case() {
        let config = FieldMatcher::Simple {
            name: "Page".to_string(),
            value: "1".to_string(),
        };
        let pair = compile_query_param(&config).unwrap();
        assert!(pair.name.matches(Some("Page")));
        assert!(!pair.name.matches(Some("page")));
        assert!(pair.value.matches(Some("1")));
    }

    #[test]
    fn test_field_matcher_serde() {
        let json = r#"{"name": "X-Api-Key", "value": "secret"}"#;
        let matcher: FieldMatcher = serde_json::from_str(json).unwrap();
        assert!(matches!(matcher, FieldMatcher::Simple { .. }));

        let json = r#"{"name": "Content-Type", "contains": "json"}"#;
        let matcher: FieldMatcher = serde_json::from_str(json).unwrap();
        assert!(matches!(matcher, FieldMatcher::Full { .. }));

        let json = r#"{"name": "status", "or": [{"equals": "a"}, {"equals": "b"}]}"#;
        let matcher: FieldMatcher = serde_json::from_str(json).unwrap();
        assert!(matches!(matcher, FieldMatcher::Or { .. }));
    }

    #[test]
    fn test_or_matcher() {
        let config = FieldMatcher::Or {
            name: "status".to_string(),
            or: vec![
                StringMatcher::Equals("active".to_string()),
                StringMatcher::Equals("pending".to_string()),
            ],
            options: PredicateOptions::default(),
        };
        let value = config.compile_value().unwrap();
        assert!(value.matches(Some("active")));
        assert!(value.matches(Some("pending")));
        assert!(!value.matches(Some("inactive")));
    }

    #[test]
    fn test_options_case_and_not() {
        let config = FieldMatcher::Full {
            name: "Accept".to_string(),
            matcher: StringMatcher::Contains("json".to_string()),
            options: PredicateOptions {
                case_sensitive: false,
                not: true,
            },
        };
        let compiled = HeaderMatcher::compile(&config).unwrap();
        assert!(compiled.check(&headers(&[("accept", "application/JSON")])).is_err());
        assert!(compiled.check(&headers(&[("accept", "text/plain")])).is_ok());
    }

    #[test]
    fn test_repeated_header_any_value_matches() {
        let matcher = HeadersMatcher::from_pairs([("Accept", ValueMatcher::contains("json"))]);
        let map = headers(&[("accept", "text/plain"), ("accept", "application/json")]);
        assert!(matcher.check(&map).is_ok());

        let map = headers(&[("accept", "text/plain"), ("accept", "text/html")]);
        assert_eq!(
            matcher.check(&map).unwrap_err().as_str(),
            r#"header "accept" was "text/plain", "text/html""#
        );
    }

    #[test]
    fn test_absent_header_predicate() {
        let matcher = HeadersMatcher::from_pairs([("authorization", ValueMatcher::absent())]);
        assert!(matcher.check(&HeaderMap::new()).is_ok());
        assert!(matcher
            .check(&headers(&[("authorization", "Bearer x")]))
            .is_err());
    }

    #[test]
    fn test_missing_header_mismatch() {
        let matcher = HeadersMatcher::from_pairs([("x-trace", "1")]);
        assert_eq!(
            matcher.check(&HeaderMap::new()).unwrap_err().as_str(),
            r#"header "x-trace" was absent"#
        );
    }
}
