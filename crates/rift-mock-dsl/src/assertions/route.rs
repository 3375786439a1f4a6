//! Call-count and recorded-request assertions on routes.
//!
//! Recording and counting routes verify immediately. The [`RouteAssertions`]
//! extension wraps a plain route and defers verification to shutdown, where
//! a failed check becomes one of the dispatcher's aggregated failures.

use super::mode::AssertionMode;
use crate::error::{AssertionFailure, Failure, PredicateError};
use crate::predicate::{Matcher, Mismatch, RequestMatcherBuilder};
use crate::routing::{CountingRoute, RecordingRoute, Route, RouteExt, SharedRoute};
use crate::types::RecordedRequest;
use std::fmt::{self, Write};
use std::sync::Arc;

/// Expected number of calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCount {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl CallCount {
    fn holds(&self, count: usize) -> bool {
        match *self {
            CallCount::Exactly(expected) => count == expected,
            CallCount::AtLeast(min) => count >= min,
            CallCount::AtMost(max) => count <= max,
        }
    }
}

impl From<usize> for CallCount {
    fn from(count: usize) -> Self {
        CallCount::Exactly(count)
    }
}

impl fmt::Display for CallCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallCount::Exactly(count) => write!(f, "{count}"),
            CallCount::AtLeast(count) => write!(f, "at least {count}"),
            CallCount::AtMost(count) => write!(f, "at most {count}"),
        }
    }
}

impl Matcher<usize> for CallCount {
    fn describe(&self) -> String {
        self.to_string()
    }

    fn check(&self, count: &usize) -> Result<(), Mismatch> {
        if self.holds(*count) {
            Ok(())
        } else {
            Err(Mismatch::new(format!("was {count}")))
        }
    }
}

impl CountingRoute {
    /// Verify the number of resolutions counted so far.
    pub fn verify_called(&self, expected: CallCount) -> Result<(), AssertionFailure> {
        expected
            .check(&self.count())
            .map_err(|mismatch| AssertionFailure {
                reason: self.describe(),
                expected: format!("should be called {expected} times"),
                actual: mismatch.into_string(),
            })
    }
}

impl RecordingRoute {
    /// Verify the requests recorded so far against `matcher` under `mode`.
    pub fn verify(
        &self,
        matcher: &dyn Matcher<RecordedRequest>,
        mode: &dyn AssertionMode<RecordedRequest>,
    ) -> Result<(), AssertionFailure> {
        let requests = self.recorded_requests();
        mode.check(matcher, &requests)
            .map_err(|mismatch| AssertionFailure {
                reason: self.describe(),
                expected: format!("recorded requests should {}", mode.describe(matcher)),
                actual: render_recorded(mismatch, &requests),
            })
    }
}

fn render_recorded(mismatch: Mismatch, requests: &[RecordedRequest]) -> String {
    let mut actual = mismatch.into_string();
    let _ = write!(actual, "\nFound {} request(s)", requests.len());
    if !requests.is_empty() {
        actual.push_str(": ");
        for (index, request) in requests.iter().enumerate() {
            let _ = write!(actual, "\n[{index}] {request}");
        }
    }
    actual
}

/// Deferred assertions on a registered route.
pub trait RouteAssertions {
    /// Check at shutdown that the route resolved exactly `count` requests.
    fn assert_called(&self, count: usize) -> SharedRoute {
        self.assert_call_count(CallCount::Exactly(count))
    }

    /// Check at shutdown the number of requests the route resolved.
    fn assert_call_count(&self, expected: CallCount) -> SharedRoute;

    /// Check at shutdown the requests the route resolved.
    fn assert_requests<M, A>(&self, matcher: M, mode: A) -> SharedRoute
    where
        M: Matcher<RecordedRequest> + 'static,
        A: AssertionMode<RecordedRequest> + 'static;

    /// Like [`RouteAssertions::assert_requests`] with a request matcher built in place.
    fn assert_request<A, F>(&self, mode: A, request: F) -> Result<SharedRoute, PredicateError>
    where
        A: AssertionMode<RecordedRequest> + 'static,
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder;
}

impl RouteAssertions for SharedRoute {
    fn assert_call_count(&self, expected: CallCount) -> SharedRoute {
        let counting = self.count();
        self.on_shutdown(move || counting.verify_called(expected).map_err(Failure::from));
        Arc::clone(self)
    }

    fn assert_requests<M, A>(&self, matcher: M, mode: A) -> SharedRoute
    where
        M: Matcher<RecordedRequest> + 'static,
        A: AssertionMode<RecordedRequest> + 'static,
    {
        let recording = self.record();
        self.on_shutdown(move || {
            recording
                .verify(&matcher, &mode)
                .map_err(Failure::from)
        });
        Arc::clone(self)
    }

    fn assert_request<A, F>(&self, mode: A, request: F) -> Result<SharedRoute, PredicateError>
    where
        A: AssertionMode<RecordedRequest> + 'static,
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        let matcher = request(RequestMatcherBuilder::new()).build()?;
        Ok(self.assert_requests(matcher, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::{index, times};
    use crate::predicate::{RequestMatcher, ValueMatcher};
    use crate::routing::{Routing, RoutingExt, RoutingObserver, StaticRouting};
    use crate::types::MockResponse;

    fn setup() -> (Arc<RoutingObserver>, StaticRouting, SharedRoute) {
        let observer = Arc::new(RoutingObserver::new());
        let routing = StaticRouting::new(Arc::clone(&observer));
        let route = routing
            .get("feed", |r| r.path("/feed"), MockResponse::new())
            .unwrap();
        (observer, routing, route)
    }

    fn hit(observer: &RoutingObserver, routing: &StaticRouting, target: &str) {
        let resolved = routing
            .resolve(&RecordedRequest::get(target))
            .unwrap()
            .unwrap();
        observer.dispatch_on_resolve(&resolved);
    }

    #[test]
    fn test_call_count_matcher() {
        assert!(CallCount::Exactly(2).matches(&2));
        assert!(CallCount::AtLeast(1).matches(&3));
        assert!(!CallCount::AtMost(1).matches(&2));
        assert_eq!(CallCount::AtLeast(1).describe(), "at least 1");
        assert_eq!(
            CallCount::Exactly(1).check(&0).unwrap_err().as_str(),
            "was 0"
        );
    }

    #[test]
    fn test_counting_route_verifies_immediately() {
        let (observer, routing, route) = setup();
        let counting = route.count();
        hit(&observer, &routing, "/feed");

        assert!(counting.verify_called(CallCount::Exactly(1)).is_ok());
        let failure = counting.verify_called(CallCount::Exactly(2)).unwrap_err();
        assert_eq!(
            failure.to_string(),
            "Route(description=\"feed\", requestMatcher=\"method \"GET\" and path \"/feed\"\")\n\
             Expected: should be called 2 times\n     but: was 1"
        );
    }

    #[test]
    fn test_recording_route_lists_every_request() {
        let (observer, routing, route) = setup();
        let recording = route.record();
        hit(&observer, &routing, "/feed");

        let matcher = RequestMatcher::builder()
            .raw_query(ValueMatcher::present())
            .build()
            .unwrap();
        let failure = recording.verify(&matcher, &times(1)).unwrap_err();
        assert_eq!(
            failure.expected,
            "recorded requests should containing exactly 1 item(s) that is query present"
        );
        assert_eq!(
            failure.actual,
            "contained 0 matched item(s)\nNot matched item(s) found: \n\
             [0] query present was absent\nFound 1 request(s): \n[0] GET /feed HTTP/1.1"
        );
    }

    #[test]
    fn test_deferred_assert_called_runs_at_shutdown() {
        let (observer, routing, route) = setup();
        route.assert_called(2);
        hit(&observer, &routing, "/feed");

        assert_eq!(observer.failure_count(), 0);
        observer.dispatch_on_shutdown();
        let failures = observer.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Failure::Assertion(_)));
        assert!(failures[0].to_string().ends_with("but: was 1"));
    }

    #[test]
    fn test_deferred_call_count_bounds() {
        let (observer, routing, route) = setup();
        route.assert_call_count(CallCount::AtLeast(1));
        route.assert_call_count(CallCount::AtMost(1));
        hit(&observer, &routing, "/feed");

        observer.dispatch_on_shutdown();
        assert!(observer.take_failures().is_empty());
    }

    #[test]
    fn test_deferred_assert_request_passes() {
        let (observer, routing, route) = setup();
        route
            .assert_request(index(1), |r| r.query_params([("page", "2")]))
            .unwrap();
        hit(&observer, &routing, "/feed?page=1");
        hit(&observer, &routing, "/feed?page=2");

        observer.dispatch_on_shutdown();
        assert!(observer.take_failures().is_empty());
    }

    #[test]
    fn test_empty_recording_renders_count_only() {
        let (observer, _routing, route) = setup();
        route.assert_requests(RequestMatcher::any(), index(0));

        observer.dispatch_on_shutdown();
        let failures = observer.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0]
            .to_string()
            .ends_with("but: was empty\nFound 0 request(s)"));
    }
}
