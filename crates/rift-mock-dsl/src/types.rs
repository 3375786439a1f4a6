//! Request and response descriptions exchanged with the mock transport.
//!
//! The transport builds a [`RecordedRequest`] for every incoming request and
//! serves whatever [`MockResponse`] the dispatcher hands back.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::HeaderMap;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

// ============================================================================
// Recorded Request
// ============================================================================

/// An incoming request as seen by the routing layer.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Percent-decoded path, without the query
    pub path: String,
    /// Raw query string (without `?`), `None` when the target had no `?`
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Position of this request in the server's arrival order
    pub sequence_number: usize,
    pub request_from: Option<SocketAddr>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RecordedRequest {
    /// Build a request from a method and a request target such as `/feed?page=1`.
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (raw_path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let path = urlencoding::decode(raw_path)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| raw_path.to_string());

        Self {
            method: method.into(),
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            sequence_number: 0,
            request_from: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    pub fn post(target: &str) -> Self {
        Self::new("POST", target)
    }

    /// Append a header value (invalid names or values are skipped).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: usize) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Body decoded as UTF-8 (lossy).
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Request line in HTTP/1.1 form, e.g. `GET /feed?page=1 HTTP/1.1`.
    pub fn request_line(&self) -> String {
        match &self.query {
            Some(query) => format!("{} {}?{} HTTP/1.1", self.method, self.path, query),
            None => format!("{} {} HTTP/1.1", self.method, self.path),
        }
    }
}

impl fmt::Display for RecordedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request_line())?;
        if !self.body.is_empty() {
            write!(f, " {}", self.body_text())?;
        }
        Ok(())
    }
}

// ============================================================================
// Mock Response
// ============================================================================

/// Response served for a matched route.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Delay applied by the transport before the response is written
    pub delay: Option<Duration>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            delay: None,
        }
    }
}

impl MockResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fallback served when no route resolves a request.
    pub fn not_found() -> Self {
        Self::new().status(404)
    }

    pub fn status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Append a header value (invalid names or values are skipped).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        append_header(&mut self.headers, name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `content-type`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.body = Bytes::from(serde_json::to_vec(value)?);
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

pub(crate) fn append_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            headers.append(name, value);
        }
        _ => warn!("Skipping invalid header {:?}: {:?}", name, value),
    }
}
