//! Routes: a description, a request predicate and a response producer.

use super::observer::RoutingObserver;
use crate::error::RouteError;
use crate::predicate::Matcher;
use crate::types::{MockResponse, RecordedRequest};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of a declared route.
///
/// Ids are unique for the life of the process and never reused, even after
/// the route they were assigned to is dropped. Decorators report the identity
/// of the route they wrap, so a decorator and its inner route compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(u64);

impl RouteId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A declared request-to-response mapping.
pub trait Route: Send + Sync {
    /// Observer of the routing this route was declared in.
    fn observer(&self) -> &Arc<RoutingObserver>;

    fn description(&self) -> &str;

    /// `Route(description="...", requestMatcher="...")`
    fn describe(&self) -> String;

    /// Produce a response if the request is matched, `None` if it is not.
    fn resolve(&self, request: &RecordedRequest) -> Result<Option<MockResponse>, RouteError>;

    fn id(&self) -> RouteId;
}

pub type SharedRoute = Arc<dyn Route>;

impl fmt::Debug for dyn Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

type ResponderFn = dyn Fn(&RecordedRequest) -> anyhow::Result<MockResponse> + Send + Sync;

/// Static response or a response computed per request.
#[derive(Clone)]
pub enum Responder {
    Static(MockResponse),
    Dynamic(Arc<ResponderFn>),
}

impl Responder {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RecordedRequest) -> anyhow::Result<MockResponse> + Send + Sync + 'static,
    {
        Responder::Dynamic(Arc::new(f))
    }

    pub fn respond(&self, request: &RecordedRequest) -> anyhow::Result<MockResponse> {
        match self {
            Responder::Static(response) => Ok(response.clone()),
            Responder::Dynamic(f) => f(request),
        }
    }
}

impl From<MockResponse> for Responder {
    fn from(response: MockResponse) -> Self {
        Responder::Static(response)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Responder::Static(response) => f.debug_tuple("Static").field(response).finish(),
            Responder::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Route backed by a request matcher.
pub struct MatcherRoute {
    id: RouteId,
    observer: Arc<RoutingObserver>,
    description: String,
    matcher: Arc<dyn Matcher<RecordedRequest>>,
    responder: Responder,
}

impl MatcherRoute {
    pub fn new(
        observer: Arc<RoutingObserver>,
        description: impl Into<String>,
        matcher: Arc<dyn Matcher<RecordedRequest>>,
        responder: impl Into<Responder>,
    ) -> Self {
        Self {
            id: RouteId::next(),
            observer,
            description: description.into(),
            matcher,
            responder: responder.into(),
        }
    }

    pub fn matcher(&self) -> &Arc<dyn Matcher<RecordedRequest>> {
        &self.matcher
    }
}

impl Route for MatcherRoute {
    fn observer(&self) -> &Arc<RoutingObserver> {
        &self.observer
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn describe(&self) -> String {
        format!(
            "Route(description=\"{}\", requestMatcher=\"{}\")",
            self.description,
            self.matcher.describe()
        )
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<MockResponse>, RouteError> {
        if !self.matcher.matches(request) {
            return Ok(None);
        }
        self.responder
            .respond(request)
            .map(Some)
            .map_err(|source| RouteError::Responder {
                route: self.description.clone(),
                source,
            })
    }

    fn id(&self) -> RouteId {
        self.id
    }
}

impl fmt::Display for MatcherRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
