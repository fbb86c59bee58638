//! HTTP surface: one [`WidgetTree`](crate::tree::WidgetTree) per session,
//! JSON in and out.

mod error;
mod router;
mod sessions;
mod shutdown;

pub use error::ServerError;
pub use router::{build_router, AppState, EventRequest, EventResponse, SessionCreated};
pub use sessions::{RootFactory, SessionManager};
pub use shutdown::ShutdownManager;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::view::Services;

pub struct AppServer {
    pub addr: SocketAddr,
    /// Populated by `bind()`, consumed by `run()`.
    listener: Option<TcpListener>,
    config: Arc<Config>,
    sessions: Arc<SessionManager>,
    shutdown: Arc<ShutdownManager>,
}

impl AppServer {
    pub fn new(config: Arc<Config>, factory: RootFactory, services: Services) -> Self {
        let sessions = Arc::new(SessionManager::new(config.clone(), factory, services));
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            listener: None,
            config,
            sessions,
            shutdown: Arc::new(ShutdownManager::new()),
        }
    }

    /// Bind the configured address. Port 0 picks a free port; the actual
    /// address is returned and stored in `addr`.
    pub async fn bind(&mut self) -> anyhow::Result<SocketAddr> {
        let bind_addr: SocketAddr = self
            .config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.config.server.bind_addr))?;
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        self.addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!(addr = %self.addr, "server bound");
        Ok(self.addr)
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownManager> {
        self.shutdown.clone()
    }

    pub fn router(&self) -> Router {
        build_router(AppState::new(self.sessions.clone(), self.shutdown.clone()))
    }

    /// Serve until shutdown is signaled, then dispose every session.
    ///
    /// In-flight requests get `shutdown_grace_seconds` to finish.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("bind() must be called before run()")?;
        tracing::info!(addr = %self.addr, "starting server");

        let shutdown = self.shutdown.clone();
        let serve = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                if let Err(err) = shutdown.wait_for_shutdown().await {
                    tracing::error!(error = %err, "failed to install signal handler");
                    shutdown.signal_shutdown();
                }
            })
            .into_future();

        let grace = Duration::from_secs(self.config.server.shutdown_grace_seconds);
        let shutdown = self.shutdown.clone();
        let deadline = async move {
            shutdown.signaled().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = serve => result.context("server error")?,
            _ = deadline => {
                tracing::warn!(grace_seconds = grace.as_secs(), "grace period elapsed, dropping open connections");
            }
        }

        self.sessions.dispose_all().await;
        tracing::info!("server stopped");
        Ok(())
    }
}
