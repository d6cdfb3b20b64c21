//! HTTP listener and its shutdown sequence.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::auth::Authenticator;
use crate::clipboard;
use crate::config::Settings;
use crate::error::ClipError;
use crate::http::{router, AppState, RequestMetrics};

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Clipboard HTTP server.
pub struct Server {
    listener: TcpListener,
    app_state: AppState,
    grace: Duration,
    state: watch::Sender<ServerState>,
}

impl Server {
    /// Build the authenticator and clipboard backend from `settings` and
    /// bind the listening socket.
    pub async fn bind(settings: &Settings) -> Result<Self, ClipError> {
        let addr = settings.server.socket_addr()?;

        let authenticator = Arc::new(Authenticator::from_settings(&settings.security)?);
        info!(
            digest = ?settings.security.digest,
            header = authenticator.tag_header(),
            freshness_window_seconds = settings.security.freshness_window_seconds,
            replay_capacity = settings.security.replay_capacity,
            "Authentication configured"
        );

        let clipboard = clipboard::from_config(&settings.clipboard)?;
        info!(backend = clipboard.name(), "Clipboard backend ready");

        let app_state = AppState {
            authenticator,
            clipboard,
            payload: settings.request.payload,
            max_body_bytes: settings.server.max_body_bytes,
            metrics: Arc::new(RequestMetrics::new()),
        };

        Self::bind_with(addr, app_state, settings.server.shutdown_grace()).await
    }

    /// Bind `addr` and serve `app_state` on it.
    pub async fn bind_with(
        addr: SocketAddr,
        app_state: AppState,
        grace: Duration,
    ) -> Result<Self, ClipError> {
        let (state, _) = watch::channel(ServerState::Starting);

        let listener = TcpListener::bind(addr).await.map_err(|e| ClipError::Server {
            message: format!("Failed to bind to {}: {}", addr, e),
        })?;

        info!(addr = %addr, "Listener bound");

        Ok(Self {
            listener,
            app_state,
            grace,
            state,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ClipError> {
        Ok(self.listener.local_addr()?)
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Get request metrics.
    pub fn metrics(&self) -> Arc<RequestMetrics> {
        Arc::clone(&self.app_state.metrics)
    }

    /// Serve until `shutdown` resolves.
    ///
    /// After `shutdown` resolves no new connections are accepted. In-flight
    /// requests get the grace period to finish. After that the server stops
    /// waiting for them; their tasks end when the runtime shuts down.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ClipError>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            listener,
            app_state,
            grace,
            state,
        } = self;
        let metrics = Arc::clone(&app_state.metrics);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serve = axum::serve(listener, router(app_state)).with_graceful_shutdown(async move {
            let _ = stop_rx.await;
        });
        let mut server_task = tokio::spawn(async move { serve.await });

        state.send_replace(ServerState::Listening);
        info!("Server listening, waiting for requests...");

        tokio::select! {
            joined = &mut server_task => {
                state.send_replace(ServerState::Stopped);
                let result = flatten(joined);
                if let Err(e) = &result {
                    error!(error = %e, "Server stopped unexpectedly");
                }
                return result;
            }
            _ = shutdown => {}
        }

        info!("Shutting down server...");
        state.send_replace(ServerState::ShuttingDown);
        let _ = stop_tx.send(());

        match tokio::time::timeout(grace, &mut server_task).await {
            Ok(joined) => {
                flatten(joined)?;
                info!("Graceful shutdown complete");
            }
            Err(_) => {
                warn!(
                    grace_ms = grace.as_millis() as u64,
                    active = metrics.active(),
                    "Server forced to shutdown, abandoning in-flight requests"
                );
                server_task.abort();
            }
        }

        state.send_replace(ServerState::Stopped);
        info!(
            requests_total = metrics.total(),
            requests_rejected = metrics.rejected(),
            requests_failed = metrics.failed(),
            "Server stopped"
        );
        Ok(())
    }
}

fn flatten(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ClipError> {
    match joined {
        Ok(result) => result.map_err(|e| ClipError::Server {
            message: format!("Server error: {}", e),
        }),
        Err(e) => {
            debug!(error = %e, "Server task ended");
            Err(ClipError::Server {
                message: format!("Server task failed: {}", e),
            })
        }
    }
}
