//! Request routing: routes, registries, the routing observer and the
//! recording/counting decorators.
//!
//! ## Module Structure
//!
//! - `route`: `Route` trait, `MatcherRoute` and `Responder`
//! - `registry`: `StaticRouting`, `OneOffRouting` and `CompositeRouting`
//! - `observer`: `RoutingObserver` and listener traits
//! - `decorators`: `RecordingRoute`, `CountingRoute` and `RouteExt`

mod decorators;
mod observer;
mod registry;
mod route;

#[cfg(test)]
mod tests;

pub use decorators::{CountingRoute, RecordingRoute, RouteExt};
pub use observer::{ListenerId, OnResolveListener, OnShutdownListener, RoutingObserver};
pub use registry::{CompositeRouting, OneOffRouting, StaticRouting};
pub use route::{MatcherRoute, Responder, Route, RouteId, SharedRoute};

use crate::error::{PredicateError, RouteError};
use crate::predicate::{Matcher, RequestMatcherBuilder};
use crate::types::{MockResponse, RecordedRequest};
use std::sync::Arc;

/// The outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub request: RecordedRequest,
    pub response: MockResponse,
    /// The route as registered (not a decorator around it)
    pub route: SharedRoute,
}

/// A mutable registry of routes.
pub trait Routing: Send + Sync {
    fn observer(&self) -> &Arc<RoutingObserver>;

    /// Register a route and hand it back.
    fn route(&self, route: SharedRoute) -> SharedRoute;

    /// Remove a route by identity; decorators remove the route they wrap.
    fn remove(&self, route: &dyn Route) -> bool;

    fn clear(&self);

    /// Find the highest-priority route producing a response.
    fn resolve(&self, request: &RecordedRequest) -> Result<Option<ResolvedRoute>, RouteError>;
}

/// Route declaration helpers available on every registry.
pub trait RoutingExt: Routing {
    /// Register a route built from any request matcher.
    fn route_with<M>(
        &self,
        description: &str,
        matcher: M,
        responder: impl Into<Responder>,
    ) -> SharedRoute
    where
        M: Matcher<RecordedRequest> + 'static,
    {
        let route = MatcherRoute::new(
            Arc::clone(self.observer()),
            description,
            Arc::new(matcher),
            responder,
        );
        self.route(Arc::new(route))
    }

    /// Register a route whose request predicate is built in place.
    fn route_request<F>(
        &self,
        description: &str,
        request: F,
        responder: impl Into<Responder>,
    ) -> Result<SharedRoute, PredicateError>
    where
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        let matcher = request(RequestMatcherBuilder::new()).build()?;
        Ok(self.route_with(description, matcher, responder))
    }

    fn get<F>(
        &self,
        description: &str,
        request: F,
        responder: impl Into<Responder>,
    ) -> Result<SharedRoute, PredicateError>
    where
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        self.route_request(description, |r| request(r.get()), responder)
    }

    fn post<F>(
        &self,
        description: &str,
        request: F,
        responder: impl Into<Responder>,
    ) -> Result<SharedRoute, PredicateError>
    where
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        self.route_request(description, |r| request(r.post()), responder)
    }

    fn put<F>(
        &self,
        description: &str,
        request: F,
        responder: impl Into<Responder>,
    ) -> Result<SharedRoute, PredicateError>
    where
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        self.route_request(description, |r| request(r.put()), responder)
    }

    fn delete<F>(
        &self,
        description: &str,
        request: F,
        responder: impl Into<Responder>,
    ) -> Result<SharedRoute, PredicateError>
    where
        F: FnOnce(RequestMatcherBuilder) -> RequestMatcherBuilder,
    {
        self.route_request(description, |r| request(r.delete()), responder)
    }
}

impl<R: Routing + ?Sized> RoutingExt for R {}
