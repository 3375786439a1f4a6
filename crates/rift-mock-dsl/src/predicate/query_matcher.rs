//! Query parameter matching with "subset" and "exact" semantics.
//!
//! A [`QueryMatcher`] holds an ordered list of (name, value) predicate pairs.
//! Matching consumes pairs from a per-evaluation working set, so every
//! declared pair is satisfied by at most one query parameter. Removal from
//! the working set preserves the relative order of the remaining pairs, which
//! keeps the first-match scan reproducible.

use super::logical::ValueMatcher;
use super::matcher::{Matcher, Mismatch};
use std::fmt;

/// One declared (name-predicate, value-predicate) pair.
#[derive(Debug, Clone)]
pub struct QueryParamMatcher {
    pub name: ValueMatcher,
    pub value: ValueMatcher,
}

impl QueryParamMatcher {
    pub fn new(name: impl Into<ValueMatcher>, value: impl Into<ValueMatcher>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The parameter may be left out of the query entirely.
    fn is_optional(&self) -> bool {
        self.value.matches(None)
    }
}

impl fmt::Display for QueryParamMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} = {})", self.name, self.value)
    }
}

/// Matches a raw query string against a set of parameter predicates.
#[derive(Debug, Clone, Default)]
pub struct QueryMatcher {
    params: Vec<QueryParamMatcher>,
    exactly: bool,
}

impl QueryMatcher {
    /// Subset semantics: parameters without a declared pair are ignored.
    pub fn new(params: Vec<QueryParamMatcher>) -> Self {
        Self {
            params,
            exactly: false,
        }
    }

    /// Exact semantics: every actual parameter must consume a declared pair.
    pub fn exactly(params: Vec<QueryParamMatcher>) -> Self {
        Self {
            params,
            exactly: true,
        }
    }

    /// Build from (name, value) pairs.
    pub fn from_pairs<I, N, V>(pairs: I, exactly: bool) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<ValueMatcher>,
        V: Into<ValueMatcher>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(name, value)| QueryParamMatcher::new(name, value))
                .collect(),
            exactly,
        }
    }

    pub fn params(&self) -> &[QueryParamMatcher] {
        &self.params
    }

    pub fn is_exact(&self) -> bool {
        self.exactly
    }

    /// Match a raw query string (`None` when the request had no query).
    ///
    /// A request without a query never matches, even when every declared pair
    /// is optional. An empty query (`/feed?`) is evaluated as one valueless
    /// parameter with an empty name.
    pub fn check_query(&self, query: Option<&str>) -> Result<(), Mismatch> {
        let Some(query) = query else {
            return Err(Mismatch::new("was absent"));
        };
        let mut pool: Vec<&QueryParamMatcher> = self.params.iter().collect();
        let rendered = format!("{query:?}");

        for (name, value) in parse_query(query) {
            self.consume_parameter(&mut pool, name, value, &rendered)?;
        }

        // Optional pairs that never appeared are satisfied by their absence
        pool.retain(|pair| !pair.is_optional());
        if pool.is_empty() {
            return Ok(());
        }

        Err(Mismatch::new(format!(
            "no query parameter matches: {} in {}",
            render_pairs(&pool),
            rendered
        )))
    }

    fn consume_parameter(
        &self,
        pool: &mut Vec<&QueryParamMatcher>,
        name: &str,
        value: &str,
        rendered: &str,
    ) -> Result<(), Mismatch> {
        if pool.is_empty() {
            if self.exactly {
                return Err(Mismatch::new(format!(
                    "no match for: {name:?}={value:?} in {rendered}"
                )));
            }
            return Ok(());
        }

        let mut index = 0;
        while index < pool.len() {
            let pair = pool[index];
            if pair.name.matches(Some(name)) {
                if pair.value.matches(Some(value)) {
                    pool.remove(index);
                    return Ok(());
                }
                // A pair that tolerates absence must hold whenever its name appears
                if pair.is_optional() {
                    return Err(not_matched(name, value, rendered));
                }
            }
            index += 1;
        }

        if self.exactly {
            return Err(not_matched(name, value, rendered));
        }
        Ok(())
    }
}

impl Matcher<str> for QueryMatcher {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn check(&self, item: &str) -> Result<(), Mismatch> {
        self.check_query(Some(item))
    }
}

impl fmt::Display for QueryMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<&QueryParamMatcher> = self.params.iter().collect();
        write!(
            f,
            "a string containing query parameters {}",
            render_pairs(&pairs)
        )?;
        if self.exactly {
            f.write_str(" exactly")?;
        }
        Ok(())
    }
}

/// Split a raw query into ordered (name, value) pairs without unescaping.
///
/// Splits on `&`, then on the first `=`. A parameter without `=` yields an
/// empty value, so `subject=math&easy&problem=5-2=3` parses to
/// `[("subject", "math"), ("easy", ""), ("problem", "5-2=3")]`.
pub fn parse_query(query: &str) -> Vec<(&str, &str)> {
    query
        .split('&')
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect()
}

fn not_matched(name: &str, value: &str, rendered: &str) -> Mismatch {
    Mismatch::new(format!(
        "not matched parameter: {name:?}={value:?} in {rendered}"
    ))
}

fn render_pairs(pairs: &[&QueryParamMatcher]) -> String {
    let rendered: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
    format!("[{}]", rendered.join(", "))
}
