//! Request predicate system.
//!
//! Predicates come in two forms: serde configuration types read from route
//! files, and compiled matchers evaluated at runtime. The DSL constructors
//! build compiled matchers directly.
//!
//! # Module Structure
//!
//! - `matcher` - `Matcher` trait, `Mismatch` and `CachedValue`
//! - `string_matcher` - Leaf string operators (equals, contains, startsWith, ...)
//! - `logical` - Logical operators (NOT, OR, AND) and the compiled `ValueMatcher`
//! - `options` - Predicate options (caseSensitive, not)
//! - `query_matcher` - Query parameter pairs with subset and exact semantics
//! - `field_matcher` - Named field matchers for headers and query parameters
//! - `body_matcher` - Body matching (text, JSON equality, JSONPath)
//! - `request` - Request predicate, compiled matcher and builder

mod body_matcher;
mod field_matcher;
mod logical;
mod matcher;
mod options;
mod query_matcher;
mod request;
mod string_matcher;

pub use body_matcher::{extract_json_path, BodyMatcher, CompiledBodyMatcher};
pub use field_matcher::{compile_query_param, FieldMatcher, HeaderMatcher, HeadersMatcher};
pub use logical::{LogicalMatcher, ValueMatcher};
pub use matcher::{CachedValue, Matcher, Mismatch};
pub use options::PredicateOptions;
pub use query_matcher::{parse_query, QueryMatcher, QueryParamMatcher};
pub use request::{
    QueryField, QueryPredicate, RequestMatcher, RequestMatcherBuilder, RequestPredicate,
};
pub use string_matcher::{CompiledStringMatcher, StringMatcher};
