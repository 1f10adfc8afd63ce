use crate::config::ServerConfig;
use crate::engine::{EngineHandle, RelayEngine};
use crate::signaling::{SignalingService, ws_handler, ws_handler_assigned};
use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler_assigned))
        .route("/ws/{connection_id}", get(ws_handler))
        .with_state(service)
}

/// A bound listener with its relay engine already running.
pub struct HuddleServer {
    listener: TcpListener,
    app: Router,
    engine: EngineHandle,
}

impl HuddleServer {
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

        let capacity = config.event_queue_capacity.max(1);
        if capacity != config.event_queue_capacity {
            warn!("Event queue capacity must be positive, using {}", capacity);
        }
        let (events_tx, events_rx) = mpsc::channel(capacity);
        let service = SignalingService::new(events_tx);

        let engine = RelayEngine::new(Arc::new(service.output()), config).start(events_rx);

        Ok(Self {
            listener,
            app: router(service),
            engine,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Listener has no local address")
    }

    pub fn engine(&self) -> EngineHandle {
        self.engine.clone()
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serves until `shutdown` resolves, then stops the relay engine.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Signaling server listening on ws://{}", self.local_addr()?);

        let result = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server terminated");

        info!("Shutdown signal received");
        self.engine.shutdown().await;
        result
    }
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    HuddleServer::bind(&config).await?.run().await
}
