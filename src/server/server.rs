//! HTTP server lifecycle

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::auth::JwtVerifier;
use super::router::{AppState, create_router};
use crate::analytics::EndpointName;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::store::{ConversationStore, MemoryStore};
use crate::{Error, Result};

/// The chat service
pub struct Server {
    config: Config,
    state: Arc<AppState>,
}

impl Server {
    /// Build the pipeline, open chat history and prepare auth
    pub async fn new(config: Config) -> Result<Self> {
        let pipeline = Arc::new(Pipeline::from_config(&config)?);

        let store: Arc<dyn ConversationStore> = match &config.store.path {
            Some(path) => Arc::new(MemoryStore::open(path).await?),
            None => Arc::new(MemoryStore::new()),
        };

        let state = Arc::new(AppState {
            pipeline,
            store,
            auth: Arc::new(JwtVerifier::from_config(&config.auth)),
            max_body_size: config.server.max_body_size,
        });

        Ok(Self { config, state })
    }

    /// The HTTP router over this server's state
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    /// Bind and serve until SIGINT/SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("CRUNCHBOT v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(model = %self.config.llm.model, analytics = %self.config.analytics.base_url, "Upstreams");
        info!(endpoints = EndpointName::ALL.len(), deadline = ?self.config.server.request_timeout, "Query pipeline ready");
        match &self.config.store.path {
            Some(path) => info!(path = %path.display(), "Chat history persisted"),
            None => info!("Chat history is memory-only"),
        }
        info!("============================================================");

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let grace = self.config.server.shutdown_timeout;
        let drain_deadline = async move {
            let _ = shutdown_rx.recv().await;
            tokio::time::sleep(grace).await;
        };

        let app = self.router();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown_tx))
            .into_future();

        tokio::select! {
            result = serve => result?,
            () = drain_deadline => {
                warn!(timeout = ?grace, "Shutdown timeout expired, dropping in-flight requests");
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
