//! HTTP/1 transport serving a [`RoutingDispatcher`].
//!
//! The accept loop runs on the tokio runtime; each request body is collected,
//! turned into a [`RecordedRequest`] and dispatched on the blocking pool so
//! that an armed await gate never stalls the runtime. Shutdown closes every
//! connection and waits for dispatches already running, so their failures
//! are part of the report.

use crate::config::ServerConfig;
use crate::dispatcher::RoutingDispatcher;
use crate::error::{ServerError, ShutdownError};
use crate::routing::CompositeRouting;
use crate::types::{MockResponse, RecordedRequest};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

struct ServerState {
    dispatcher: Arc<RoutingDispatcher>,
    sequence: AtomicUsize,
    /// Dispatches running on the blocking pool
    in_flight: AtomicUsize,
    idle: Notify,
}

impl ServerState {
    fn begin_dispatch(self: &Arc<Self>) -> DispatchGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        DispatchGuard(Arc::clone(self))
    }

    async fn drained(&self) {
        // A notification sent before we wait is kept as a permit
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            self.idle.notified().await;
        }
    }
}

struct DispatchGuard(Arc<ServerState>);

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_one();
        }
    }
}

/// A mock HTTP server whose responses come from declared routes.
///
/// Dropping the server stops its accept loop; call [`MockWebServer::shutdown`]
/// to also collect the deferred failures.
pub struct MockWebServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    await_timeout: Duration,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<JoinSet<()>>>>,
}

impl MockWebServer {
    pub async fn start(config: &ServerConfig) -> Result<Self, ServerError> {
        Self::start_with(config, Arc::new(RoutingDispatcher::new())).await
    }

    /// Start serving an existing dispatcher, e.g. one with routes installed.
    pub async fn start_with(
        config: &ServerConfig,
        dispatcher: Arc<RoutingDispatcher>,
    ) -> Result<Self, ServerError> {
        let bind_addr = config.socket_addr()?;
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::Bind(bind_addr, e))?;
        let addr = listener.local_addr()?;
        info!("Mock server bound to {}", addr);

        let state = Arc::new(ServerState {
            dispatcher,
            sequence: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        });
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut shutdown_rx = shutdown_tx.subscribe();

        let loop_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, client_addr)) => {
                                let state = Arc::clone(&loop_state);
                                connections.spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let state = Arc::clone(&state);
                                        async move { handle_request(req, state, client_addr).await }
                                    });
                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection error on {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", addr, e);
                            }
                        }
                    }
                    Some(_) = connections.join_next(), if !connections.is_empty() => {}
                    _ = shutdown_rx.recv() => {
                        info!("Mock server on {} shutting down", addr);
                        break;
                    }
                }
            }
            connections
        });

        Ok(Self {
            addr,
            state,
            await_timeout: config.await_timeout(),
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("http://{}{}", self.addr, path)
        } else {
            format!("http://{}/{}", self.addr, path)
        }
    }

    pub fn dispatcher(&self) -> &Arc<RoutingDispatcher> {
        &self.state.dispatcher
    }

    pub fn routing(&self) -> &CompositeRouting {
        self.state.dispatcher.routing()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.state.sequence.load(Ordering::SeqCst)
    }

    /// Hold incoming requests until [`Self::unlock`], up to the configured timeout.
    pub fn await_unlock(&self) {
        self.await_unlock_for(self.await_timeout);
    }

    pub fn await_unlock_for(&self, timeout: Duration) {
        self.state.dispatcher.await_unlock(timeout);
    }

    pub fn unlock(&self) {
        self.state.dispatcher.unlock();
    }

    /// Stop accepting connections, then report every deferred failure.
    ///
    /// Open connections are closed and dispatches already running are waited
    /// for, so a request still being resolved is part of the report. An
    /// elapsed await gate is reported after the collected failures.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // No receiver left means the loop already stopped
        let _ = self.shutdown_tx.send(());
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            match handle.await {
                Ok(mut connections) => connections.shutdown().await,
                Err(e) => warn!("Mock server accept loop ended abnormally: {}", e),
            }
        }
        let in_flight = self.state.in_flight.load(Ordering::SeqCst);
        if in_flight > 0 {
            debug!("Waiting for {} dispatch(es) to finish", in_flight);
        }
        self.state.drained().await;
        info!(
            "Mock server on {} stopped after {} request(s)",
            self.addr,
            self.request_count()
        );
        self.state.dispatcher.finish()
    }
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let sequence_number = state.sequence.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("Failed to read body from {}: {}", client_addr, e);
            Bytes::new()
        }
    };

    let mut request = RecordedRequest::new(parts.method.as_str(), &target)
        .with_body(body)
        .with_sequence_number(sequence_number);
    request.headers = parts.headers;
    request.request_from = Some(client_addr);
    debug!("Received {} from {}", request.request_line(), client_addr);

    let dispatcher = Arc::clone(&state.dispatcher);
    let guard = state.begin_dispatch();
    let mock = match tokio::task::spawn_blocking(move || {
        let _guard = guard;
        dispatcher.dispatch(&request)
    })
    .await
    {
        Ok(mock) => mock,
        Err(e) => {
            error!("Dispatch task failed: {}", e);
            return Ok(build_response(
                MockResponse::new().status(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
            ));
        }
    };

    if let Some(delay) = mock.delay {
        tokio::time::sleep(delay).await;
    }
    Ok(build_response(mock))
}

fn build_response(mock: MockResponse) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(mock.status_code).unwrap_or_else(|_| {
        warn!("Invalid status code {}, serving 500", mock.status_code);
        StatusCode::INTERNAL_SERVER_ERROR
    });
    let mut response = Response::new(Full::new(mock.body));
    *response.status_mut() = status;
    *response.headers_mut() = mock.headers;
    response
}
