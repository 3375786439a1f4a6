//! Assertions over recorded traffic.
//!
//! - `mode`: assertion modes (`times`, `times_among`, `index`, `last`)
//! - `route`: call-count and recorded-request assertions on routes

mod mode;
mod route;

pub use mode::{index, last, times, times_among, AssertionMode, Index, Last, Times};
pub use route::{CallCount, RouteAssertions};
