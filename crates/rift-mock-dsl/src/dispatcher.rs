//! Per-request entry point of the mock transport.
//!
//! The dispatcher resolves every incoming request through a
//! [`CompositeRouting`], turns unmatched requests and resolution errors into
//! deferred failures, and reports all of them together at shutdown. An
//! optional await gate holds dispatches until [`RoutingDispatcher::unlock`]
//! is called or the gate times out.

use crate::error::{panic_message, Failure, MultipleFailures, ShutdownError};
use crate::routing::{CompositeRouting, Routing, RoutingObserver};
use crate::types::{MockResponse, RecordedRequest};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One-shot gate; opened by an unlock or by its timeout.
struct AwaitGate {
    open: Mutex<bool>,
    opened: Condvar,
    timeout: Duration,
}

impl AwaitGate {
    fn new(timeout: Duration) -> Self {
        Self {
            open: Mutex::new(false),
            opened: Condvar::new(),
            timeout,
        }
    }

    /// Block until the gate opens; `false` if the timeout elapsed first.
    fn wait(&self) -> bool {
        let mut open = self.open.lock();
        if !*open {
            self.opened
                .wait_while_for(&mut open, |open| !*open, self.timeout);
        }
        *open
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }
}

pub struct RoutingDispatcher {
    routing: CompositeRouting,
    failures: Mutex<Vec<Failure>>,
    gate: Mutex<Option<Arc<AwaitGate>>>,
    await_elapsed: AtomicBool,
}

impl Default for RoutingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingDispatcher {
    pub fn new() -> Self {
        Self {
            routing: CompositeRouting::new(Arc::new(RoutingObserver::new())),
            failures: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            await_elapsed: AtomicBool::new(false),
        }
    }

    pub fn routing(&self) -> &CompositeRouting {
        &self.routing
    }

    pub fn observer(&self) -> &Arc<RoutingObserver> {
        self.routing.observer()
    }

    /// Resolve `request`, falling back to a 404 response.
    ///
    /// Never fails: errors and panics raised while resolving are recorded and
    /// the request is treated as unmatched.
    pub fn dispatch(&self, request: &RecordedRequest) -> MockResponse {
        self.pass_gate();

        let outcome = catch_unwind(AssertUnwindSafe(|| self.routing.resolve(request)));
        let resolved = match outcome {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(error)) => {
                warn!("Failed to resolve {}: {}", request.request_line(), error);
                self.record(Failure::Resolution(error));
                None
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("Resolving {} panicked: {}", request.request_line(), message);
                self.record(Failure::ResolutionPanic(message));
                None
            }
        };

        match resolved {
            Some(resolved) => {
                self.routing.observer().dispatch_on_resolve(&resolved);
                resolved.response
            }
            None => {
                warn!("Received no mock for the request {}", request.request_line());
                self.record(Failure::Unmatched {
                    request: request.to_string(),
                });
                MockResponse::not_found()
            }
        }
    }

    fn pass_gate(&self) {
        let Some(gate) = self.gate.lock().clone() else {
            return;
        };
        if gate.wait() {
            return;
        }

        warn!(
            "Await gate elapsed after {:?} without unlock",
            gate.timeout
        );
        self.await_elapsed.store(true, Ordering::SeqCst);
        let mut slot = self.gate.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, &gate)) {
            *slot = None;
        }
        drop(slot);
        // Release the other requests held by the same gate
        gate.open();
    }

    fn record(&self, failure: Failure) {
        self.failures.lock().push(failure);
    }

    /// Hold subsequent dispatches until [`Self::unlock`] or `timeout`.
    ///
    /// Arming a new gate releases the previous one.
    pub fn await_unlock(&self, timeout: Duration) {
        debug!("Arming await gate for {:?}", timeout);
        let previous = self
            .gate
            .lock()
            .replace(Arc::new(AwaitGate::new(timeout)));
        if let Some(previous) = previous {
            previous.open();
        }
    }

    /// Open the armed gate, if any.
    pub fn unlock(&self) {
        if let Some(gate) = self.gate.lock().take() {
            debug!("Unlocking await gate");
            gate.open();
        }
    }

    /// Whether a gate ever timed out before being unlocked.
    pub fn is_await_elapsed(&self) -> bool {
        self.await_elapsed.load(Ordering::SeqCst)
    }

    /// Run the shutdown listeners and report every collected failure.
    ///
    /// Failures are drained, so a second call only reports what happened
    /// after the first.
    pub fn shutdown(&self) -> Result<(), MultipleFailures> {
        let observer = self.routing.observer();
        observer.dispatch_on_shutdown();

        let mut failures = std::mem::take(&mut *self.failures.lock());
        failures.extend(observer.take_failures());
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MultipleFailures::new(failures))
        }
    }

    /// [`Self::shutdown`], then surface an elapsed await gate.
    pub fn finish(&self) -> Result<(), ShutdownError> {
        self.shutdown()?;
        if self.is_await_elapsed() {
            return Err(ShutdownError::AwaitElapsed);
        }
        Ok(())
    }
}
