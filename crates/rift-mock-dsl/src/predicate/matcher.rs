//! The diagnosing [`Matcher`] contract shared by request predicates,
//! call-count expectations and assertion modes.

use std::fmt;

/// Explanation of why an item did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch(String);

impl Mismatch {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A diagnosing matcher: evaluates an item and explains mismatches.
pub trait Matcher<T: ?Sized>: Send + Sync {
    /// Description of what the matcher expects.
    fn describe(&self) -> String;

    /// Evaluate `item`, returning the mismatch explanation on failure.
    fn check(&self, item: &T) -> Result<(), Mismatch>;

    fn matches(&self, item: &T) -> bool {
        self.check(item).is_ok()
    }
}

/// Render a possibly absent value the way mismatch reports show it.
pub(crate) fn describe_value(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("was {v:?}"),
        None => "was absent".to_string(),
    }
}

/// Expected string kept alongside its lowercase form.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: String,
    pub lower: String,
}

impl CachedValue {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = value.to_lowercase();
        Self { value, lower }
    }

    #[inline]
    pub fn equals(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value == self.value
        } else {
            value.to_lowercase() == self.lower
        }
    }

    #[inline]
    pub fn contained_in(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value.contains(&self.value)
        } else {
            value.to_lowercase().contains(&self.lower)
        }
    }

    #[inline]
    pub fn starts(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value.starts_with(&self.value)
        } else {
            value.to_lowercase().starts_with(&self.lower)
        }
    }

    #[inline]
    pub fn ends(&self, value: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            value.ends_with(&self.value)
        } else {
            value.to_lowercase().ends_with(&self.lower)
        }
    }
}

impl From<String> for CachedValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CachedValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_is_precomputed() {
        let cached = CachedValue::new("Application/JSON");
        assert_eq!(cached.value, "Application/JSON");
        assert_eq!(cached.lower, "application/json");
    }

    #[test]
    fn test_case_flag() {
        let cached = CachedValue::new("X-Trace");
        assert!(cached.equals("X-Trace", true));
        assert!(!cached.equals("x-trace", true));
        assert!(cached.equals("x-TRACE", false));
    }

    #[test]
    fn test_affixes() {
        let cached = CachedValue::new("/Feed");
        assert!(cached.starts("/Feed?page=1", true));
        assert!(!cached.starts("/feed?page=1", true));
        assert!(cached.starts("/feed?page=1", false));
        assert!(cached.contained_in("/api/FEED/1", false));
        assert!(CachedValue::new("/1").ends("/offer/1", true));
    }

    #[test]
    fn test_describe_value() {
        assert_eq!(describe_value(Some("x")), "was \"x\"");
        assert_eq!(describe_value(None), "was absent");
    }
}
