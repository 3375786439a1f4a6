//! Route registries: persistent, one-off and composite.
//!
//! Every registry resolves most-recently-added first. A single lock guards
//! each route list for both search and mutation, so one-off consumption is
//! atomic with the match that triggered it.

use super::observer::RoutingObserver;
use super::route::{Route, RouteId, SharedRoute};
use super::{ResolvedRoute, Routing};
use crate::error::RouteError;
use crate::types::RecordedRequest;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Ordered route list shared by all registry variants.
struct RouteTable {
    tier: &'static str,
    routes: Mutex<Vec<SharedRoute>>,
}

impl RouteTable {
    fn new(tier: &'static str) -> Self {
        Self {
            tier,
            routes: Mutex::new(Vec::new()),
        }
    }

    /// Re-adding a route already in the table moves it to the top.
    fn add(&self, route: SharedRoute) {
        let id = route.id();
        let mut routes = self.routes.lock();
        routes.retain(|r| r.id() != id);
        routes.push(route);
    }

    fn remove(&self, id: RouteId) -> bool {
        let mut routes = self.routes.lock();
        let before = routes.len();
        routes.retain(|r| r.id() != id);
        routes.len() != before
    }

    fn clear(&self) {
        self.routes.lock().clear();
    }

    fn len(&self) -> usize {
        self.routes.lock().len()
    }

    fn resolve(
        &self,
        request: &RecordedRequest,
        consume: bool,
    ) -> Result<Option<ResolvedRoute>, RouteError> {
        let mut routes = self.routes.lock();
        for index in (0..routes.len()).rev() {
            let Some(response) = routes[index].resolve(request)? else {
                continue;
            };
            let route = if consume {
                routes.remove(index)
            } else {
                Arc::clone(&routes[index])
            };
            debug!(
                "Resolved {} by {} route \"{}\"",
                request.request_line(),
                self.tier,
                route.description()
            );
            return Ok(Some(ResolvedRoute {
                request: request.clone(),
                response,
                route,
            }));
        }
        Ok(None)
    }
}

/// Persistent registry: routes stay registered after matching.
pub struct StaticRouting {
    observer: Arc<RoutingObserver>,
    table: RouteTable,
}

impl StaticRouting {
    pub fn new(observer: Arc<RoutingObserver>) -> Self {
        Self::with_tier(observer, "static")
    }

    fn with_tier(observer: Arc<RoutingObserver>, tier: &'static str) -> Self {
        Self {
            observer,
            table: RouteTable::new(tier),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Routing for StaticRouting {
    fn observer(&self) -> &Arc<RoutingObserver> {
        &self.observer
    }

    fn route(&self, route: SharedRoute) -> SharedRoute {
        self.table.add(Arc::clone(&route));
        route
    }

    fn remove(&self, route: &dyn Route) -> bool {
        self.table.remove(route.id())
    }

    fn clear(&self) {
        self.table.clear();
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<ResolvedRoute>, RouteError> {
        self.table.resolve(request, false)
    }
}

/// One-off registry: a matching route is removed as part of its resolution.
pub struct OneOffRouting {
    observer: Arc<RoutingObserver>,
    table: RouteTable,
}

impl OneOffRouting {
    pub fn new(observer: Arc<RoutingObserver>) -> Self {
        Self {
            observer,
            table: RouteTable::new("one-off"),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Routing for OneOffRouting {
    fn observer(&self) -> &Arc<RoutingObserver> {
        &self.observer
    }

    fn route(&self, route: SharedRoute) -> SharedRoute {
        self.table.add(Arc::clone(&route));
        route
    }

    fn remove(&self, route: &dyn Route) -> bool {
        self.table.remove(route.id())
    }

    fn clear(&self) {
        self.table.clear();
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<ResolvedRoute>, RouteError> {
        self.table.resolve(request, true)
    }
}

/// Root registry: one-off routes, then its own routes, then stub routes.
pub struct CompositeRouting {
    observer: Arc<RoutingObserver>,
    table: RouteTable,
    stub: StaticRouting,
    one_off: OneOffRouting,
}

impl CompositeRouting {
    pub fn new(observer: Arc<RoutingObserver>) -> Self {
        Self {
            stub: StaticRouting::with_tier(Arc::clone(&observer), "stub"),
            one_off: OneOffRouting::new(Arc::clone(&observer)),
            table: RouteTable::new("root"),
            observer,
        }
    }

    /// Declare lowest-priority routes that stay for the whole test.
    pub fn stub<T>(&self, f: impl FnOnce(&StaticRouting) -> T) -> T {
        f(&self.stub)
    }

    /// Declare highest-priority routes consumed by their first match.
    pub fn one_off<T>(&self, f: impl FnOnce(&OneOffRouting) -> T) -> T {
        f(&self.one_off)
    }

    pub fn stubs(&self) -> &StaticRouting {
        &self.stub
    }

    pub fn one_offs(&self) -> &OneOffRouting {
        &self.one_off
    }

    /// Number of routes added directly to the root.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the root, stub and one-off routes.
    pub fn clear_all(&self) {
        self.one_off.clear();
        self.table.clear();
        self.stub.clear();
    }
}

impl Routing for CompositeRouting {
    fn observer(&self) -> &Arc<RoutingObserver> {
        &self.observer
    }

    fn route(&self, route: SharedRoute) -> SharedRoute {
        self.table.add(Arc::clone(&route));
        route
    }

    fn remove(&self, route: &dyn Route) -> bool {
        self.table.remove(route.id())
    }

    /// Clear the routes added directly to the root.
    fn clear(&self) {
        self.table.clear();
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<ResolvedRoute>, RouteError> {
        if let Some(resolved) = self.one_off.resolve(request)? {
            return Ok(Some(resolved));
        }
        if let Some(resolved) = self.table.resolve(request, false)? {
            return Ok(Some(resolved));
        }
        self.stub.resolve(request)
    }
}
