//! Unified request predicate for matching against request fields.
//!
//! A [`RequestMatcher`] is composed of up to five optional sub-predicates
//! (method, path, query, body, headers). Omitted sub-predicates always match.
//! It is produced either by [`RequestMatcherBuilder`] or by compiling a
//! [`RequestPredicate`] read from a routes file.

use super::body_matcher::{BodyMatcher, CompiledBodyMatcher};
use super::field_matcher::{compile_query_param, FieldMatcher, HeadersMatcher};
use super::logical::{LogicalMatcher, ValueMatcher};
use super::matcher::{Matcher, Mismatch};
use super::options::PredicateOptions;
use super::query_matcher::{QueryMatcher, QueryParamMatcher};
use crate::error::PredicateError;
use crate::types::RecordedRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Configuration
// ============================================================================

/// A complete request predicate as written in route files.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestPredicate {
    /// HTTP method match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<LogicalMatcher>,

    /// Decoded path match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<LogicalMatcher>,

    /// Query parameter pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryPredicate>,

    /// Header matchers (all must match)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<FieldMatcher>,

    /// Body matcher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMatcher>,

    /// Global predicate options
    #[serde(flatten, default)]
    pub options: PredicateOptions,
}

/// Query section of a [`RequestPredicate`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryPredicate {
    #[serde(default)]
    pub params: Vec<FieldMatcher>,
    /// Reject parameters without a declared pair
    #[serde(default)]
    pub exactly: bool,
}

// ============================================================================
// Compiled matcher
// ============================================================================

/// Predicate over the raw query string.
#[derive(Debug, Clone)]
pub enum QueryField {
    Params(QueryMatcher),
    Raw(ValueMatcher),
}

impl QueryField {
    fn check(&self, query: Option<&str>) -> Result<(), Mismatch> {
        match self {
            QueryField::Params(matcher) => matcher.check_query(query),
            QueryField::Raw(matcher) => matcher.check(query),
        }
    }
}

impl fmt::Display for QueryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryField::Params(matcher) => write!(f, "{matcher}"),
            QueryField::Raw(matcher) => write!(f, "{matcher}"),
        }
    }
}

/// Compiled request predicate.
#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    method: Option<ValueMatcher>,
    path: Option<ValueMatcher>,
    query: Option<QueryField>,
    body: Option<CompiledBodyMatcher>,
    headers: Option<HeadersMatcher>,
    negated: bool,
}

impl RequestMatcher {
    pub fn builder() -> RequestMatcherBuilder {
        RequestMatcherBuilder::default()
    }

    /// Matches every request.
    pub fn any() -> Self {
        Self::default()
    }

    /// Compile a RequestPredicate configuration.
    ///
    /// `caseSensitive: false` applies to method, path and body; `not` negates
    /// the whole request predicate.
    pub fn compile(predicate: &RequestPredicate) -> Result<Self, PredicateError> {
        let apply_case = |matcher: ValueMatcher| {
            if predicate.options.case_sensitive {
                matcher
            } else {
                matcher.ignoring_case()
            }
        };

        let method = predicate
            .method
            .as_ref()
            .map(|m| ValueMatcher::compile(m).map(apply_case))
            .transpose()?;
        let path = predicate
            .path
            .as_ref()
            .map(|m| ValueMatcher::compile(m).map(apply_case))
            .transpose()?;

        let query = predicate
            .query
            .as_ref()
            .map(|q| -> Result<QueryField, regex::Error> {
                let params: Result<Vec<QueryParamMatcher>, _> =
                    q.params.iter().map(compile_query_param).collect();
                let params = params?;
                Ok(QueryField::Params(if q.exactly {
                    QueryMatcher::exactly(params)
                } else {
                    QueryMatcher::new(params)
                }))
            })
            .transpose()?;

        let headers = if predicate.headers.is_empty() {
            None
        } else {
            Some(HeadersMatcher::compile(&predicate.headers)?)
        };

        let body_options = PredicateOptions {
            case_sensitive: predicate.options.case_sensitive,
            not: false,
        };
        let body = predicate
            .body
            .as_ref()
            .map(|b| CompiledBodyMatcher::compile(b, &body_options))
            .transpose()?;

        Ok(RequestMatcher {
            method,
            path,
            query,
            body,
            headers,
            negated: predicate.options.not,
        })
    }

    fn check_fields(&self, request: &RecordedRequest) -> Result<(), Mismatch> {
        fn field<M: fmt::Display>(
            name: &str,
            matcher: &M,
            result: Result<(), Mismatch>,
        ) -> Result<(), Mismatch> {
            result.map_err(|m| Mismatch::new(format!("{name} {matcher} {m}")))
        }

        if let Some(method) = &self.method {
            field("method", method, method.check(Some(request.method.as_str())))?;
        }
        if let Some(path) = &self.path {
            field("path", path, path.check(Some(request.path.as_str())))?;
        }
        if let Some(query) = &self.query {
            field("query", query, query.check(request.query.as_deref()))?;
        }
        if let Some(body) = &self.body {
            field("body", body, body.check(&*request.body_text()))?;
        }
        if let Some(headers) = &self.headers {
            field("headers", headers, headers.check(&request.headers))?;
        }
        Ok(())
    }
}

impl Matcher<RecordedRequest> for RequestMatcher {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn check(&self, request: &RecordedRequest) -> Result<(), Mismatch> {
        match (self.check_fields(request), self.negated) {
            (result, false) => result,
            (Ok(()), true) => Err(Mismatch::new(format!("was {}", request.request_line()))),
            (Err(_), true) => Ok(()),
        }
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(method) = &self.method {
            parts.push(format!("method {method}"));
        }
        if let Some(path) = &self.path {
            parts.push(format!("path {path}"));
        }
        if let Some(query) = &self.query {
            parts.push(format!("query {query}"));
        }
        if let Some(body) = &self.body {
            parts.push(format!("body {body}"));
        }
        if let Some(headers) = &self.headers {
            parts.push(format!("headers {headers}"));
        }

        let joined = if parts.is_empty() {
            "any request".to_string()
        } else {
            parts.join(" and ")
        };
        if self.negated {
            write!(f, "not ({joined})")
        } else {
            f.write_str(&joined)
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fluent builder for [`RequestMatcher`].
///
/// Each field may be defined once. Redefining a field, or passing an invalid
/// pattern, does not fail at the call itself. The builder keeps the first such
/// error, later calls are still applied, and [`RequestMatcherBuilder::build`]
/// returns that first error instead of a matcher.
#[derive(Debug, Default)]
pub struct RequestMatcherBuilder {
    matcher: RequestMatcher,
    error: Option<PredicateError>,
}

fn define<T>(
    slot: &mut Option<T>,
    error: &mut Option<PredicateError>,
    field: &'static str,
    value: T,
) {
    if slot.is_some() {
        error.get_or_insert(PredicateError::AlreadyDefined(field));
    } else {
        *slot = Some(value);
    }
}

impl RequestMatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(mut self, error: PredicateError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    pub fn method(mut self, matcher: impl Into<ValueMatcher>) -> Self {
        define(
            &mut self.matcher.method,
            &mut self.error,
            "method",
            matcher.into(),
        );
        self
    }

    pub fn get(self) -> Self {
        self.method("GET")
    }

    pub fn post(self) -> Self {
        self.method("POST")
    }

    pub fn put(self) -> Self {
        self.method("PUT")
    }

    pub fn delete(self) -> Self {
        self.method("DELETE")
    }

    /// Path predicate; a plain string means equality.
    pub fn path(mut self, matcher: impl Into<ValueMatcher>) -> Self {
        define(
            &mut self.matcher.path,
            &mut self.error,
            "path",
            matcher.into(),
        );
        self
    }

    pub fn path_contains(self, sub_path: &str) -> Self {
        self.path(ValueMatcher::contains(sub_path))
    }

    pub fn path_contains_any(self, sub_paths: &[&str]) -> Self {
        self.path(ValueMatcher::AnyOf(
            sub_paths.iter().map(|p| ValueMatcher::contains(*p)).collect(),
        ))
    }

    pub fn path_contains_all(self, sub_paths: &[&str]) -> Self {
        self.path(ValueMatcher::AllOf(
            sub_paths.iter().map(|p| ValueMatcher::contains(*p)).collect(),
        ))
    }

    pub fn path_end(self, end: &str) -> Self {
        self.path(ValueMatcher::ends_with(end))
    }

    pub fn path_regex(self, pattern: &str) -> Self {
        match ValueMatcher::regex(pattern) {
            Ok(matcher) => self.path(matcher),
            Err(error) => self.fail(error),
        }
    }

    pub fn query(mut self, matcher: QueryMatcher) -> Self {
        define(
            &mut self.matcher.query,
            &mut self.error,
            "query",
            QueryField::Params(matcher),
        );
        self
    }

    /// Subset query match over (name, value) pairs.
    pub fn query_params<I, N, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<ValueMatcher>,
        V: Into<ValueMatcher>,
    {
        self.query(QueryMatcher::from_pairs(pairs, false))
    }

    /// Exact query match over (name, value) pairs.
    pub fn query_params_exactly<I, N, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<ValueMatcher>,
        V: Into<ValueMatcher>,
    {
        self.query(QueryMatcher::from_pairs(pairs, true))
    }

    /// Predicate over the raw query string.
    pub fn raw_query(mut self, matcher: impl Into<ValueMatcher>) -> Self {
        define(
            &mut self.matcher.query,
            &mut self.error,
            "query",
            QueryField::Raw(matcher.into()),
        );
        self
    }

    pub fn headers(mut self, matcher: HeadersMatcher) -> Self {
        define(&mut self.matcher.headers, &mut self.error, "headers", matcher);
        self
    }

    /// Body text predicate.
    pub fn body(self, matcher: impl Into<ValueMatcher>) -> Self {
        self.body_matcher(CompiledBodyMatcher::Text(matcher.into()))
    }

    /// Body parsed as JSON must contain `expected`.
    pub fn json_body(self, expected: serde_json::Value) -> Self {
        self.body_matcher(CompiledBodyMatcher::json_equals(expected))
    }

    /// Value selected by a JSONPath expression must match.
    pub fn json_path(self, path: &str, matcher: impl Into<ValueMatcher>) -> Self {
        match CompiledBodyMatcher::json_path(path, matcher.into()) {
            Ok(body) => self.body_matcher(body),
            Err(error) => self.fail(error),
        }
    }

    pub fn body_matcher(mut self, matcher: CompiledBodyMatcher) -> Self {
        define(&mut self.matcher.body, &mut self.error, "body", matcher);
        self
    }

    /// Negate the whole request predicate.
    pub fn negate(mut self) -> Self {
        self.matcher.negated = !self.matcher.negated;
        self
    }

    pub fn build(self) -> Result<RequestMatcher, PredicateError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.matcher),
        }
    }
}
