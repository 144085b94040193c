//! HTTP/1.1 host adapter.
//!
//! Accepts TCP connections, serves each with hyper's HTTP/1.1 connection
//! driver, buffers the request body and hands the request to
//! [`Engine::serve_request`]. Framing is entirely hyper's.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard_server::{Engine, EngineConfig, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchyard_server::ServerError> {
//!     let engine = Engine::with_defaults(EngineConfig::default());
//!     let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
//!     Server::new(engine, config).run().await
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use switchyard_core::{Request, Response};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves an [`Engine`] over TCP.
#[derive(Debug, Clone)]
pub struct Server {
    engine: Arc<Engine>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server for `engine`.
    #[must_use]
    pub fn new(engine: Engine, config: ServerConfig) -> Self {
        Self::from_shared(Arc::new(engine), config)
    }

    /// Creates a server for an engine that is shared elsewhere.
    #[must_use]
    pub fn from_shared(engine: Arc<Engine>, config: ServerConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Returns the server settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Binds the configured address and runs until `shutdown` triggers.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Accepts connections on `listener` until `shutdown` triggers, then
    /// waits up to the shutdown timeout for open connections.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        info!(addr = %local, routes = self.engine.routes().count(), "server listening");

        let tracker = ConnectionTracker::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let engine = Arc::clone(&self.engine);
                        let config = self.config.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(err) = serve_connection(engine, &config, stream, remote, shutdown).await {
                                debug!(remote = %remote, error = %err, "connection closed with error");
                            }
                            drop(token);
                        });
                    }
                    Err(err) => error!(error = %err, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout();
        info!(
            open = tracker.active_connections(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "waiting for connections to close"
        );
        tokio::select! {
            () = tracker.wait_for_shutdown() => info!("all connections closed"),
            () = tokio::time::sleep(timeout) => warn!(
                open = tracker.active_connections(),
                "shutdown timeout reached, dropping open connections"
            ),
        }

        info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    engine: Arc<Engine>,
    config: &ServerConfig,
    stream: TcpStream,
    remote: SocketAddr,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let max_body = config.max_body_bytes();
    let service = service_fn(move |request: http::Request<Incoming>| {
        let engine = Arc::clone(&engine);
        async move { Ok::<_, Infallible>(handle_request(&engine, request, max_body).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(config.keep_alive())
        .serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            debug!(remote = %remote, "draining connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn handle_request(engine: &Engine, request: http::Request<Incoming>, max_body: usize) -> Response {
    let (parts, body) = request.into_parts();
    match Limited::new(body, max_body).collect().await {
        Ok(collected) => {
            let request = Request::from_parts(parts, collected.to_bytes());
            engine.serve_request(request).await
        }
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(path = parts.uri.path(), limit = max_body, "request body too large");
            plain(StatusCode::PAYLOAD_TOO_LARGE, "413 payload too large")
        }
        Err(err) => {
            warn!(path = parts.uri.path(), error = %err, "failed to read request body");
            plain(StatusCode::BAD_REQUEST, "400 bad request")
        }
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
