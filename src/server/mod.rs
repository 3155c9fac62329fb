//! Minimal HTTP endpoint serving the cached ratios and the metrics text

pub mod handlers;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::metrics::RefreshMetrics;
use crate::rates::RatesCache;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind HTTP server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

struct ServerState {
    cache: Arc<RatesCache>,
    metrics: RefreshMetrics,
}

pub struct HttpServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl HttpServer {
    pub async fn bind(addr: SocketAddr, cache: Arc<RatesCache>, metrics: RefreshMetrics) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            state: Arc::new(ServerState { cache, metrics }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` fires, then lets open
    /// connections finish for at most `grace`
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>, grace: Duration) -> Result<(), ServerError> {
        info!("HTTP server listening on http://{}", self.local_addr()?);

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    debug!("Accepted connection from {}", peer);
                    connections.spawn(serve_connection(
                        TokioIo::new(stream),
                        self.state.clone(),
                        shutdown.clone(),
                    ));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        drop(self.listener);
        info!(
            "HTTP server stopped accepting connections, waiting up to {:?} for {} in flight",
            grace,
            connections.len()
        );

        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!("Grace period elapsed, aborting {} connections", connections.len());
            connections.abort_all();
        }

        info!("HTTP server shut down");

        Ok(())
    }
}

async fn serve_connection(
    io: TokioIo<tokio::net::TcpStream>,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) {
    let service = service_fn(move |request: hyper::Request<hyper::body::Incoming>| {
        let state = state.clone();
        async move {
            let response = handlers::handle(
                request.method(),
                request.uri().path(),
                &state.cache,
                &state.metrics,
            )
            .await;
            Ok::<_, Infallible>(response)
        }
    });

    let connection = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(connection);

    tokio::select! {
        result = connection.as_mut() => {
            if let Err(e) = result {
                debug!("Connection closed with error: {}", e);
            }
        }
        _ = shutdown.changed() => {
            connection.as_mut().graceful_shutdown();
            if let Err(e) = connection.as_mut().await {
                debug!("Connection closed with error during shutdown: {}", e);
            }
        }
    }
}
