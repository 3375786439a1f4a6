//! Recording and counting decorators.
//!
//! A decorator forwards the [`Route`] contract to the route it wraps and
//! listens to the routing observer, keeping only events whose resolved route
//! is the wrapped one.

use super::observer::{ListenerId, OnResolveListener, RoutingObserver};
use super::route::{Route, RouteId, SharedRoute};
use super::ResolvedRoute;
use crate::error::{Failure, RouteError};
use crate::types::{MockResponse, RecordedRequest};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Accumulates every request resolved by the wrapped route, in arrival order.
pub struct RecordingRoute {
    inner: SharedRoute,
    recorded: Mutex<Vec<RecordedRequest>>,
}

impl RecordingRoute {
    /// Wrap `inner` and subscribe to its observer.
    pub fn attach(inner: SharedRoute) -> Arc<Self> {
        let recording = Arc::new(Self {
            inner,
            recorded: Mutex::new(Vec::new()),
        });
        recording
            .observer()
            .add_on_resolve_listener(Arc::clone(&recording) as Arc<dyn OnResolveListener>);
        recording
    }

    pub fn inner(&self) -> &SharedRoute {
        &self.inner
    }

    /// Snapshot of the recorded requests.
    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().clone()
    }

    pub fn recorded_count(&self) -> usize {
        self.recorded.lock().len()
    }
}

impl Route for RecordingRoute {
    fn observer(&self) -> &Arc<RoutingObserver> {
        self.inner.observer()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<MockResponse>, RouteError> {
        self.inner.resolve(request)
    }

    fn id(&self) -> RouteId {
        self.inner.id()
    }
}

impl OnResolveListener for RecordingRoute {
    fn on_resolve(&self, resolved: &ResolvedRoute) -> Result<(), Failure> {
        if resolved.route.id() == self.inner.id() {
            self.recorded.lock().push(resolved.request.clone());
        }
        Ok(())
    }
}

impl fmt::Display for RecordingRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.describe())
    }
}

/// Counts the resolutions of the wrapped route.
pub struct CountingRoute {
    inner: SharedRoute,
    count: AtomicUsize,
}

impl CountingRoute {
    /// Wrap `inner` and subscribe to its observer.
    pub fn attach(inner: SharedRoute) -> Arc<Self> {
        let counting = Arc::new(Self {
            inner,
            count: AtomicUsize::new(0),
        });
        counting
            .observer()
            .add_on_resolve_listener(Arc::clone(&counting) as Arc<dyn OnResolveListener>);
        counting
    }

    pub fn inner(&self) -> &SharedRoute {
        &self.inner
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Route for CountingRoute {
    fn observer(&self) -> &Arc<RoutingObserver> {
        self.inner.observer()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn resolve(&self, request: &RecordedRequest) -> Result<Option<MockResponse>, RouteError> {
        self.inner.resolve(request)
    }

    fn id(&self) -> RouteId {
        self.inner.id()
    }
}

impl OnResolveListener for CountingRoute {
    fn on_resolve(&self, resolved: &ResolvedRoute) -> Result<(), Failure> {
        if resolved.route.id() == self.inner.id() {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl fmt::Display for CountingRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.describe())
    }
}

/// Observer-driven extensions on a registered route.
pub trait RouteExt {
    /// Start recording the requests this route resolves.
    fn record(&self) -> Arc<RecordingRoute>;

    /// Start counting the requests this route resolves.
    fn count(&self) -> Arc<CountingRoute>;

    /// Listen to resolutions of this route only.
    fn on_resolve<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&ResolvedRoute) -> Result<(), Failure> + Send + Sync + 'static;

    /// Run `f` when the dispatcher shuts down.
    fn on_shutdown<F>(&self, f: F) -> ListenerId
    where
        F: Fn() -> Result<(), Failure> + Send + Sync + 'static;
}

impl RouteExt for SharedRoute {
    fn record(&self) -> Arc<RecordingRoute> {
        RecordingRoute::attach(Arc::clone(self))
    }

    fn count(&self) -> Arc<CountingRoute> {
        CountingRoute::attach(Arc::clone(self))
    }

    fn on_resolve<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&ResolvedRoute) -> Result<(), Failure> + Send + Sync + 'static,
    {
        let id = self.id();
        self.observer().on_resolve(move |resolved| {
            if resolved.route.id() == id {
                f(resolved)
            } else {
                Ok(())
            }
        })
    }

    fn on_shutdown<F>(&self, f: F) -> ListenerId
    where
        F: Fn() -> Result<(), Failure> + Send + Sync + 'static,
    {
        self.observer().on_shutdown(f)
    }
}
