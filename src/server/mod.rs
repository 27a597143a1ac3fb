//! HTTP server for chirpy
//!
//! [`Server::bind`] resolves the listen address from [`ServerConfig`] and
//! claims the socket up front, so the bound address (including an OS-assigned
//! port) is known before any request is served. [`Server::serve`] then runs
//! the router until the shutdown future resolves.

pub mod error;
pub mod middleware;
pub mod router;

pub use error::ApiError;
pub use middleware::AuthenticatedUser;
pub use router::{build_router, AppState};

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::database::Database;

/// Errors from binding or running the HTTP listener
#[derive(Debug, Error)]
pub enum ServerError {
    /// `server.host` is not an IP address
    #[error("Invalid listen host {0:?}: expected an IP address")]
    InvalidHost(String),

    /// The socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while serving
    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),
}

/// Socket address for `server.host` and `server.port`
pub fn listen_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    let ip: IpAddr = config
        .host
        .parse()
        .map_err(|_| ServerError::InvalidHost(config.host.clone()))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// A bound chirpy listener with its router
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    /// Bind the listener and build the router for `state`
    pub async fn bind<D: Database + 'static>(
        config: &ServerConfig,
        state: AppState<D>,
    ) -> Result<Self, ServerError> {
        let addr = listen_addr(config)?;

        if !state.filepath_root.is_dir() {
            tracing::warn!(
                filepath_root = %state.filepath_root.display(),
                "File server root is not a directory, /app will return 404"
            );
        }

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let app = build_router(state).layer(TraceLayer::new_for_http());

        Ok(Self { listener, app })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until `shutdown` resolves, then drain in-flight requests
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "Server listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!(%addr, "Server stopped");
        Ok(())
    }
}
