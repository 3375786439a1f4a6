//! Route files: stub, root and one-off routes declared in YAML or JSON.

use super::server::ServerConfig;
use crate::predicate::{RequestMatcher, RequestPredicate};
use crate::routing::{CompositeRouting, Routing, RoutingExt};
use crate::types::MockResponse;
use anyhow::Context;
use hyper::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RoutesFile {
    #[serde(default)]
    pub server: ServerConfig,
    /// Persistent routes, below root routes in priority
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stubs: Vec<RouteConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteConfig>,
    /// Routes consumed by their first matching request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_off: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    pub description: String,
    #[serde(default)]
    pub request: RequestPredicate,
    #[serde(default)]
    pub response: ResponseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// A string is served as is, any other value as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

fn default_status_code() -> u16 {
    200
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: BTreeMap::new(),
            body: None,
            delay_ms: None,
        }
    }
}

impl ResponseConfig {
    pub fn to_response(&self) -> Result<MockResponse, serde_json::Error> {
        let mut response = MockResponse::new().status(self.status_code);
        response = match &self.body {
            None => response,
            Some(serde_json::Value::String(text)) => response.body(text.clone()),
            Some(value) => response.json(value)?,
        };
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                response.headers.remove(CONTENT_TYPE);
            }
            response = response.header(name, value);
        }
        if let Some(delay_ms) = self.delay_ms {
            response = response.delay(Duration::from_millis(delay_ms));
        }
        Ok(response)
    }
}

impl RouteConfig {
    fn compile(&self) -> anyhow::Result<(RequestMatcher, MockResponse)> {
        let matcher = RequestMatcher::compile(&self.request)
            .with_context(|| format!("Invalid request predicate in route '{}'", self.description))?;
        let response = self
            .response
            .to_response()
            .with_context(|| format!("Invalid response in route '{}'", self.description))?;
        Ok((matcher, response))
    }

    fn install_into(&self, routing: &dyn Routing) -> anyhow::Result<()> {
        let (matcher, response) = self.compile()?;
        routing.route_with(&self.description, matcher, response);
        Ok(())
    }
}

impl RoutesFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route file {}", path.display()))?;
        let file = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to load route file {}", path.display()))?;
        info!(
            "Loaded {} route(s) from {}",
            file.route_count(),
            path.display()
        );
        Ok(file)
    }

    /// Parse and validate YAML (or JSON) route definitions.
    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let file: RoutesFile = serde_yaml::from_str(contents)?;
        file.validate()?;
        Ok(file)
    }

    /// Compile every predicate and response without registering anything.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for route in self.all_routes() {
            if route.description.trim().is_empty() {
                anyhow::bail!("Route description must not be empty");
            }
            route.compile()?;
        }
        self.server.socket_addr()?;
        Ok(())
    }

    pub fn route_count(&self) -> usize {
        self.stubs.len() + self.routes.len() + self.one_off.len()
    }

    fn all_routes(&self) -> impl Iterator<Item = &RouteConfig> {
        self.stubs
            .iter()
            .chain(self.routes.iter())
            .chain(self.one_off.iter())
    }

    /// Register the routes in their tiers, in file order.
    pub fn install(&self, routing: &CompositeRouting) -> Result<(), anyhow::Error> {
        for route in &self.stubs {
            route.install_into(routing.stubs())?;
        }
        for route in &self.routes {
            route.install_into(routing)?;
        }
        for route in &self.one_off {
            route.install_into(routing.one_offs())?;
        }
        Ok(())
    }
}
