//! HTTP server hosting the interactions endpoint and keep-alive routes.
//!
//! Route fragments are merged into one axum app, wrapped in a request trace
//! layer, and served until [`WebhookServer::shutdown`] is called.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::ChannelError;

/// Configuration for the webhook server.
pub struct WebhookServerConfig {
    /// Address to bind the server to.
    pub addr: SocketAddr,
}

/// Single HTTP server for everything Discord and uptime monitors call.
pub struct WebhookServer {
    config: WebhookServerConfig,
    routes: Vec<Router>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WebhookServer {
    pub fn new(config: WebhookServerConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Accumulate a route fragment with its state already applied.
    pub fn add_routes(&mut self, router: Router) {
        self.routes.push(router);
    }

    /// Address actually bound, once started. Differs from the configured
    /// address when port 0 was requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener, merge all route fragments, and spawn the server.
    pub async fn start(&mut self) -> Result<SocketAddr, ChannelError> {
        let mut app = Router::new();
        for fragment in self.routes.drain(..) {
            app = app.merge(fragment);
        }
        let app = app.layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "webhook_server".to_string(),
                reason: format!("Failed to bind to {}: {}", self.config.addr, e),
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ChannelError::StartupFailed {
                name: "webhook_server".to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Webhook server listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("Webhook server shutting down");
                })
                .await
            {
                tracing::error!("Webhook server error: {}", e);
            }
        });

        self.local_addr = Some(local_addr);
        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::routing::get;

    use super::*;

    fn auto_config() -> WebhookServerConfig {
        WebhookServerConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn start_reports_bound_port_and_serves_routes() {
        let mut server = WebhookServer::new(auto_config());
        server.add_routes(Router::new().route("/", get(|| async { "alive" })));
        let addr = server.start().await.expect("server should start on port 0");
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));

        let body = reqwest::get(format!("http://{}/", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "alive");

        server.shutdown().await;
        assert!(server.handle.is_none());
        assert!(server.shutdown_tx.is_none());
    }

    #[tokio::test]
    async fn start_on_occupied_port_returns_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap();
        let occupied_addr = listener.local_addr().unwrap();

        let mut server = WebhookServer::new(WebhookServerConfig {
            addr: occupied_addr,
        });
        match server.start().await.unwrap_err() {
            ChannelError::StartupFailed { name, reason } => {
                assert_eq!(name, "webhook_server");
                assert!(reason.contains("Failed to bind"));
            }
            other => panic!("expected StartupFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn shutdown_when_not_started_is_noop() {
        let mut server = WebhookServer::new(auto_config());
        server.shutdown().await;
    }
}
