//! Local static file server.
//!
//! Serves the working directory over HTTP so a generated image can be
//! referenced by URL when every public upload service is down. The server
//! is an explicitly owned resource: it is bound on demand, reports its
//! address, and is stopped through [`StaticServer::shutdown`].

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

/// Default port for the fallback server.
pub const DEFAULT_SERVE_PORT: u16 = 8000;

/// A running static file server with an owned shutdown handle.
pub struct StaticServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Bind the server to `port` (0 picks a free port) and start serving
    /// `dir` recursively.
    ///
    /// # Errors
    ///
    /// Returns `ServeError::BindError` if the port cannot be bound.
    pub async fn bind(dir: &Path, port: u16) -> Result<Self, ServeError> {
        let app = Router::new().fallback_service(ServeDir::new(dir.to_path_buf()));

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::BindError { port, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServeError::BindError { port, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                log::error!("Static server stopped with error: {}", e);
            }
        });

        log::info!("Serving {} on http://{}", dir.display(), local_addr);

        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL under which a file in the served directory is reachable.
    pub fn url_for(&self, file_name: &str) -> String {
        format!("http://{}/{}", self.local_addr, file_name)
    }

    /// Stop the server and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        // Signal shutdown even if the owner forgot to call it.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Errors that can occur while serving files.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("Failed to bind port {port}: {source}")]
    BindError {
        port: u16,
        source: std::io::Error,
    },
}
