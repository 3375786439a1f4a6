//! Pub/sub hub for resolution and shutdown events.
//!
//! Listener failures never abort dispatch: every error or panic raised by a
//! listener is captured and kept until the dispatcher collects it at
//! shutdown. Dispatch iterates over a snapshot of the listener list, so
//! listeners may register further listeners while being notified.

use super::ResolvedRoute;
use crate::error::{panic_message, Failure};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Notified after every successful resolution.
pub trait OnResolveListener: Send + Sync {
    fn on_resolve(&self, resolved: &ResolvedRoute) -> Result<(), Failure>;
}

/// Notified once when the dispatcher shuts down.
pub trait OnShutdownListener: Send + Sync {
    fn on_shutdown(&self) -> Result<(), Failure>;
}

struct FnResolveListener<F>(F);

impl<F> OnResolveListener for FnResolveListener<F>
where
    F: Fn(&ResolvedRoute) -> Result<(), Failure> + Send + Sync,
{
    fn on_resolve(&self, resolved: &ResolvedRoute) -> Result<(), Failure> {
        (self.0)(resolved)
    }
}

struct FnShutdownListener<F>(F);

impl<F> OnShutdownListener for FnShutdownListener<F>
where
    F: Fn() -> Result<(), Failure> + Send + Sync,
{
    fn on_shutdown(&self) -> Result<(), Failure> {
        (self.0)()
    }
}

/// Subscription handle used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listeners<L> = RwLock<Vec<(ListenerId, Arc<L>)>>;

#[derive(Default)]
pub struct RoutingObserver {
    next_id: AtomicU64,
    on_resolve: Listeners<dyn OnResolveListener>,
    on_shutdown: Listeners<dyn OnShutdownListener>,
    failures: Mutex<Vec<Failure>>,
}

impl RoutingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_on_resolve_listener(&self, listener: Arc<dyn OnResolveListener>) -> ListenerId {
        let id = self.next_id();
        self.on_resolve.write().push((id, listener));
        id
    }

    /// Register a closure as an on-resolve listener.
    pub fn on_resolve<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&ResolvedRoute) -> Result<(), Failure> + Send + Sync + 'static,
    {
        self.add_on_resolve_listener(Arc::new(FnResolveListener(f)))
    }

    pub fn remove_on_resolve_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.on_resolve.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn add_on_shutdown_listener(&self, listener: Arc<dyn OnShutdownListener>) -> ListenerId {
        let id = self.next_id();
        self.on_shutdown.write().push((id, listener));
        id
    }

    /// Register a closure as an on-shutdown listener.
    pub fn on_shutdown<F>(&self, f: F) -> ListenerId
    where
        F: Fn() -> Result<(), Failure> + Send + Sync + 'static,
    {
        self.add_on_shutdown_listener(Arc::new(FnShutdownListener(f)))
    }

    pub fn remove_on_shutdown_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.on_shutdown.write();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Notify every on-resolve listener of a successful resolution.
    pub fn dispatch_on_resolve(&self, resolved: &ResolvedRoute) {
        let listeners = snapshot(&self.on_resolve);
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_resolve(resolved)));
            self.collect(outcome);
        }
    }

    /// Notify every on-shutdown listener.
    pub fn dispatch_on_shutdown(&self) {
        let listeners = snapshot(&self.on_shutdown);
        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_shutdown()));
            self.collect(outcome);
        }
    }

    fn collect(&self, outcome: std::thread::Result<Result<(), Failure>>) {
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(failure)) => failure,
            Err(payload) => Failure::ListenerPanic(panic_message(payload.as_ref())),
        };
        warn!("Routing listener failed: {}", failure);
        self.failures.lock().push(failure);
    }

    /// Failures captured so far, without draining them.
    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    /// Drain the captured failures.
    pub fn take_failures(&self) -> Vec<Failure> {
        std::mem::take(&mut *self.failures.lock())
    }
}

fn snapshot<L: ?Sized>(listeners: &Listeners<L>) -> Vec<Arc<L>> {
    listeners
        .read()
        .iter()
        .map(|(_, listener)| Arc::clone(listener))
        .collect()
}
