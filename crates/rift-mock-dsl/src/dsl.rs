//! Free-standing constructors for writing routes and expectations tersely.
//!
//! ```ignore
//! use rift_mock_dsl::dsl::*;
//!
//! let matcher = request()
//!     .get()
//!     .path_contains("/feed")
//!     .query_params([("page", equal_to("1")), ("sort", optional(equal_to("desc")))])
//!     .build()?;
//! ```

use crate::error::PredicateError;
use crate::predicate::{RequestMatcherBuilder, ValueMatcher};

pub use crate::assertions::{index, last, times, times_among, CallCount};
pub use crate::types::MockResponse;

pub fn request() -> RequestMatcherBuilder {
    RequestMatcherBuilder::new()
}

pub fn response() -> MockResponse {
    MockResponse::new()
}

pub fn equal_to(value: impl Into<String>) -> ValueMatcher {
    ValueMatcher::equal_to(value)
}

pub fn contains(value: impl Into<String>) -> ValueMatcher {
    ValueMatcher::contains(value)
}

pub fn starts_with(value: impl Into<String>) -> ValueMatcher {
    ValueMatcher::starts_with(value)
}

pub fn ends_with(value: impl Into<String>) -> ValueMatcher {
    ValueMatcher::ends_with(value)
}

pub fn matches_regex(pattern: &str) -> Result<ValueMatcher, PredicateError> {
    ValueMatcher::regex(pattern)
}

pub fn present() -> ValueMatcher {
    ValueMatcher::present()
}

pub fn absent() -> ValueMatcher {
    ValueMatcher::absent()
}

pub fn any_of<I, M>(matchers: I) -> ValueMatcher
where
    I: IntoIterator<Item = M>,
    M: Into<ValueMatcher>,
{
    ValueMatcher::AnyOf(matchers.into_iter().map(Into::into).collect())
}

pub fn all_of<I, M>(matchers: I) -> ValueMatcher
where
    I: IntoIterator<Item = M>,
    M: Into<ValueMatcher>,
{
    ValueMatcher::AllOf(matchers.into_iter().map(Into::into).collect())
}

pub fn not(matcher: impl Into<ValueMatcher>) -> ValueMatcher {
    matcher.into().negate()
}

/// Absent, or present and matching.
pub fn optional(matcher: impl Into<ValueMatcher>) -> ValueMatcher {
    matcher.into().optional()
}

pub fn ignoring_case(matcher: impl Into<ValueMatcher>) -> ValueMatcher {
    matcher.into().ignoring_case()
}
