// ────────────────────────────────
// src/server/builder.rs
// ────────────────────────────────
use crate::server::listener::bind_tcp;
use anyhow::{anyhow, Result};
use hyper::{server::conn::Http, Body, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Service;

/// Pause after a failed `accept()` (e.g. EMFILE) before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Builder pattern so `main.rs` can inject its handler.
pub struct ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    addr: SocketAddr,
    handler: Option<H>,
}

impl<H> ServerBuilder<H>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
{
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, handler: None }
    }

    pub fn with_handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Bind, then accept connections until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handler = self
            .handler
            .ok_or_else(|| anyhow!("handler must be set via with_handler()"))?;

        let listener = bind_tcp(self.addr).await?;
        tracing::info!("HTTP server listening on {}", self.addr);

        serve_listener(listener, handler, shutdown).await
    }
}

/// Accept loop over an already bound listener, one Tokio task per connection.
/// Connections already accepted keep running after `shutdown` resolves.
pub async fn serve_listener<H, F>(listener: TcpListener, handler: H, shutdown: F) -> Result<()>
where
    H: Service<Request<Body>, Response = Response<Body>> + Send + Clone + 'static,
    H::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    H::Future: Send + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                tracing::info!("HTTP server shutting down");
                return Ok(());
            }
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(%err, "accept error, backing off for {:?}", ACCEPT_BACKOFF);
                if backoff_or_shutdown(shutdown.as_mut()).await {
                    tracing::info!("HTTP server shutting down");
                    return Ok(());
                }
                continue;
            }
        };

        let svc = handler.clone();
        tokio::spawn(async move {
            let http = Http::new();
            if let Err(err) = http.serve_connection(stream, svc).await {
                tracing::warn!(%peer, %err, "connection error");
            }
        });
    }
}

/// Sleep for [`ACCEPT_BACKOFF`]; `true` if `shutdown` resolved first.
async fn backoff_or_shutdown<F>(shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => false,
        _ = shutdown => true,
    }
}
