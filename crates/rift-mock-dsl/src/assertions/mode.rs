//! Assertion modes over a recorded sequence.
//!
//! A mode combines a content matcher with a recorded sequence and either
//! accepts it or explains, item by item, why it does not.

use crate::predicate::{Matcher, Mismatch};
use std::fmt::Write;

/// Reusable expectation over a recorded sequence of items.
pub trait AssertionMode<T>: Send + Sync {
    fn describe(&self, matcher: &dyn Matcher<T>) -> String;

    fn check(&self, matcher: &dyn Matcher<T>, items: &[T]) -> Result<(), Mismatch>;
}

/// `count` items match; with `exactly`, no other item is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Times {
    pub count: usize,
    pub exactly: bool,
}

impl<T> AssertionMode<T> for Times {
    fn describe(&self, matcher: &dyn Matcher<T>) -> String {
        format!(
            "containing {}{} item(s) that is {}",
            if self.exactly { "exactly " } else { "" },
            self.count,
            matcher.describe()
        )
    }

    fn check(&self, matcher: &dyn Matcher<T>, items: &[T]) -> Result<(), Mismatch> {
        let not_matched: Vec<(usize, Mismatch)> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| matcher.check(item).err().map(|m| (index, m)))
            .collect();
        let matched = items.len() - not_matched.len();

        if matched == self.count && !(self.exactly && !not_matched.is_empty()) {
            return Ok(());
        }

        let mut message = format!("contained {matched} matched item(s)");
        if !not_matched.is_empty() {
            message.push_str("\nNot matched item(s) found: ");
            for (index, mismatch) in &not_matched {
                let _ = write!(message, "\n[{index}] {mismatch}");
            }
        }
        Err(Mismatch::new(message))
    }
}

/// The item at `index` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index(pub usize);

impl<T> AssertionMode<T> for Index {
    fn describe(&self, matcher: &dyn Matcher<T>) -> String {
        format!("containing item[{}] that is {}", self.0, matcher.describe())
    }

    fn check(&self, matcher: &dyn Matcher<T>, items: &[T]) -> Result<(), Mismatch> {
        if items.is_empty() {
            return Err(Mismatch::new("was empty"));
        }
        let Some(item) = items.get(self.0) else {
            return Err(Mismatch::new(format!("index not in 0..{}", items.len())));
        };
        matcher.check(item)
    }
}

/// The last item matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Last;

impl<T> AssertionMode<T> for Last {
    fn describe(&self, matcher: &dyn Matcher<T>) -> String {
        format!("containing last item that is {}", matcher.describe())
    }

    fn check(&self, matcher: &dyn Matcher<T>, items: &[T]) -> Result<(), Mismatch> {
        match items.last() {
            None => Err(Mismatch::new("was empty")),
            Some(item) => matcher.check(item),
        }
    }
}

/// Exactly `count` items, all of them matching.
pub fn times(count: usize) -> Times {
    Times {
        count,
        exactly: true,
    }
}

/// `count` matching items, other items tolerated.
pub fn times_among(count: usize) -> Times {
    Times {
        count,
        exactly: false,
    }
}

pub fn index(index: usize) -> Index {
    Index(index)
}

pub fn last() -> Last {
    Last
}
