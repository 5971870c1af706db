//! # Server — HTTP lifecycle wrapper
//!
//! A thin layer over Axum: feature crates hand in their routers, the server
//! merges them into one surface, binds the listener and shuts down cleanly
//! on Ctrl+C.

use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tokio::{signal, task::JoinHandle};
use tracing::info;

/// Serializable server info, served at `/info`.
#[derive(Clone, Serialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Base URL
    pub base_url: String,
    /// HTTP port
    pub http_port: u16,
}

/// Main HTTP server.
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Router,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// # Arguments
    ///
    /// * `name` - Server name (for logs)
    /// * `base_url` - Advertised base URL (e.g. "http://192.168.1.10:8008")
    /// * `http_port` - HTTP port to listen on
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Router::new(),
            join_handle: None,
        }
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.http_port,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Merges a router into the server's surface. Routers carry absolute
    /// paths, so ordering does not matter as long as paths are disjoint.
    pub fn add_router(&mut self, router: Router) {
        self.router = std::mem::take(&mut self.router).merge(router);
    }

    /// Binds the listener and starts serving in a background task.
    pub async fn start(&mut self) -> std::io::Result<()> {
        let router = self.router.clone();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(server = %self.name, %addr, base_url = %self.base_url, "HTTP server listening");

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                tracing::error!(error = %err, "HTTP server terminated with error");
            }
        });
        self.join_handle = Some(handle);
        Ok(())
    }

    /// Waits for the server task to finish (Ctrl+C).
    pub async fn wait(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => tracing::error!(error = %err, "Failed to install Ctrl+C handler"),
    }
}
