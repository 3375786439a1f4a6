//! Error types for route declaration, resolution and end-of-test reporting.

use std::fmt;
use std::net::SocketAddr;

/// Construction-time errors raised while declaring a request predicate.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("{0}(...) is already defined. Only one {0}(...) is allowed.")]
    AlreadyDefined(&'static str),
    #[error("Invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("Invalid JSON path '{0}'")]
    InvalidJsonPath(String),
}

/// Errors raised by a route while it resolves a request.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Route \"{route}\" failed to produce a response: {source:#}")]
    Responder {
        route: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Assertion mismatch rendered the way a test report shows it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}\nExpected: {expected}\n     but: {actual}")]
pub struct AssertionFailure {
    pub reason: String,
    pub expected: String,
    pub actual: String,
}

/// A single deferred failure collected during a test run.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("Received no mock for the request {request}")]
    Unmatched { request: String },
    #[error(transparent)]
    Resolution(#[from] RouteError),
    #[error("Route resolution panicked: {0}")]
    ResolutionPanic(String),
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),
    #[error("Listener panicked: {0}")]
    ListenerPanic(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Every failure collected by a dispatcher, reported together at shutdown.
#[derive(Debug)]
pub struct MultipleFailures(Vec<Failure>);

impl MultipleFailures {
    pub fn new(failures: Vec<Failure>) -> Self {
        Self(failures)
    }

    pub fn failures(&self) -> &[Failure] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Failure> {
        self.0
    }
}

impl fmt::Display for MultipleFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "There were {} failure(s):", self.0.len())?;
        for (index, failure) in self.0.iter().enumerate() {
            write!(f, "\n  {}) {}", index + 1, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultipleFailures {}

/// Fatal conditions surfaced when a mock server shuts down.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error(transparent)]
    Failures(#[from] MultipleFailures),
    #[error("Mock server waiting time elapsed before unlock called")]
    AwaitElapsed,
}

/// Transport errors of the mock web server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Render a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
