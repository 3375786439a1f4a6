//! Configuration types for the mock server and its route files.

mod routes;
mod server;

pub use routes::{ResponseConfig, RouteConfig, RoutesFile};
pub use server::ServerConfig;
