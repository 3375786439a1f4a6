//! Predicate options for modifying matching behavior.

use serde::{Deserialize, Serialize};

/// Options that modify predicate matching behavior.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredicateOptions {
    /// Whether matching is case-sensitive
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    /// Negate the match result (NOT operator)
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Default for PredicateOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            not: false,
        }
    }
}

fn default_case_sensitive() -> bool {
    true
}

impl PredicateOptions {
    /// Wrap a compiled value matcher according to these options.
    pub(crate) fn apply(&self, matcher: super::ValueMatcher) -> super::ValueMatcher {
        let matcher = if self.case_sensitive {
            matcher
        } else {
            matcher.ignoring_case()
        };
        if self.not {
            matcher.negate()
        } else {
            matcher
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ValueMatcher;

    #[test]
    fn test_predicate_options_default() {
        let options = PredicateOptions::default();
        assert!(options.case_sensitive);
        assert!(!options.not);
    }

    #[test]
    fn test_predicate_options_apply() {
        let options = PredicateOptions {
            case_sensitive: false,
            not: true,
        };
        let matcher = options.apply(ValueMatcher::equal_to("json"));
        assert!(!matcher.matches(Some("JSON")));
        assert!(matcher.matches(Some("xml")));
    }
}
