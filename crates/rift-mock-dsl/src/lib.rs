//! Declarative request routing for HTTP mock servers in tests.
//!
//! Routes pair a request predicate with a response and live in three
//! priority tiers (one-off, root, stub). Every request a [`MockWebServer`]
//! receives is resolved by a [`RoutingDispatcher`]; unmatched requests,
//! responder errors and assertion mismatches are collected and reported
//! together when the server shuts down.

pub mod assertions;
pub mod config;
pub mod dispatcher;
pub mod dsl;
pub mod error;
pub mod predicate;
pub mod routing;
pub mod server;
pub mod types;

pub use assertions::{CallCount, RouteAssertions};
pub use config::{RoutesFile, ServerConfig};
pub use dispatcher::RoutingDispatcher;
pub use error::{
    AssertionFailure, Failure, MultipleFailures, PredicateError, RouteError, ServerError,
    ShutdownError,
};
pub use predicate::{Matcher, RequestMatcher, ValueMatcher};
pub use routing::{
    CompositeRouting, Responder, Route, RouteExt, Routing, RoutingExt, SharedRoute,
};
pub use server::MockWebServer;
pub use types::{MockResponse, RecordedRequest};
