//! Web server module.
//!
//! A small HTTP/1.0 server on top of tokio's TCP listener. Each accepted
//! connection runs as its own task on the single-threaded runtime; the
//! number of open connections is capped.

pub mod assets;
pub mod connection;
pub mod request;
pub mod response;
pub mod routes;
pub mod sse;
pub mod templates;

use crate::config::Config;
use crate::device::{DeviceError, DeviceHandle};
use assets::AssetError;
use response::{ResponseEmitter, Status};
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Semaphore};

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Rejected connections answered at once; further ones are dropped unanswered
const MAX_PENDING_REJECTS: usize = 4;

/// Longest a rejected client's request bytes are drained before closing
const REJECT_DRAIN: Duration = Duration::from_millis(100);

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[source] std::io::Error),

    #[error("Peer disconnected: {0}")]
    PeerDisconnected(#[source] std::io::Error),

    #[error("Event stream already closed")]
    StreamClosed,

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// HTTP server for the dashboard, JSON API and event streams
pub struct WebServer {
    state: AppState,
    slots: Arc<Semaphore>,
    rejects: Arc<Semaphore>,
    max_connections: usize,
}

impl WebServer {
    /// Create a new web server
    pub fn new(config: &Config, device: DeviceHandle) -> Self {
        Self {
            state: AppState::new(config, device),
            slots: Arc::new(Semaphore::new(config.max_connections)),
            rejects: Arc::new(Semaphore::new(MAX_PENDING_REJECTS)),
            max_connections: config.max_connections,
        }
    }

    /// Bind the listening socket
    pub async fn bind(addr: SocketAddr) -> Result<TcpListener, WebError> {
        let listener = TcpListener::bind(addr).await.map_err(WebError::BindError)?;
        tracing::info!("Web server listening on http://{}", addr);
        Ok(listener)
    }

    /// Connections currently being served
    pub fn active_connections(&self) -> usize {
        self.max_connections - self.slots.available_permits()
    }

    /// Accept connections until shutdown
    ///
    /// Failures of individual connections never end this loop.
    pub async fn run_with_shutdown(
        &self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), WebError> {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer, &shutdown),
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Web server shutting down gracefully");
                    return Ok(());
                }
            }
        }
    }

    /// Hand a connection to its own task, or turn it away when full
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, shutdown: &broadcast::Receiver<()>) {
        let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
            tracing::warn!(
                "Connection limit ({}) reached, rejecting {}",
                self.max_connections,
                peer
            );
            match Arc::clone(&self.rejects).try_acquire_owned() {
                Ok(reject_permit) => {
                    tokio::spawn(async move {
                        reject(stream).await;
                        drop(reject_permit);
                    });
                }
                // Dropping the stream closes it
                Err(_) => tracing::debug!("Too many pending rejections, closing {}", peer),
            }
            return;
        };

        tracing::debug!(
            "Accepted connection from {} ({} open)",
            peer,
            self.active_connections()
        );
        let state = self.state.clone();
        let shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            connection::handle_connection(stream, state, shutdown).await;
            drop(permit);
            tracing::debug!("Connection from {} closed", peer);
        });
    }
}

/// Answer 503 without waiting for the request, then close
async fn reject(stream: TcpStream) {
    let (mut read_half, write_half) = stream.into_split();

    let mut emitter = ResponseEmitter::new(write_half);
    if emitter
        .emit_error(Status::ServiceUnavailable, "Too many open connections")
        .await
        .is_err()
    {
        return;
    }
    let _ = emitter.into_inner().shutdown().await;

    // Closing with unread request bytes would reset the connection
    let _ = tokio::time::timeout(
        REJECT_DRAIN,
        tokio::io::copy(&mut read_half, &mut tokio::io::sink()),
    )
    .await;
}
