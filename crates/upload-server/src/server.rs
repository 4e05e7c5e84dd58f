//! Upload HTTP server.
//!
//! Listens on a TCP port and serves the upload routes until its
//! cancellation token fires.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chunkyard_transfer::SessionRegistry;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::routes::create_router;
use crate::sweep::run_sweeper;
use crate::{DEFAULT_MAX_CHUNK_SIZE, ServerError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    /// Largest accepted chunk body in bytes.
    pub max_chunk_size: usize,
    /// How often to purge expired sessions. `None` keeps them until they
    /// are committed or discarded.
    pub sweep_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            sweep_interval: None,
        }
    }
}

/// The upload server.
pub struct UploadServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    running: AtomicBool,
}

impl UploadServer {
    /// Creates a new server serving `registry`.
    pub fn new(config: ServerConfig, registry: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Gracefully shuts down the server.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until [`shutdown`](Self::shutdown) is called.
    ///
    /// In-flight requests are allowed to finish.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
        let listener = TcpListener::bind(addr).await?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!(
            content_root = %self.registry.content_root().display(),
            "upload server listening on {local_addr}"
        );

        if let Some(interval) = self.config.sweep_interval.filter(|i| !i.is_zero()) {
            tracing::info!(interval_secs = interval.as_secs(), "expired-session sweep enabled");
            tokio::spawn(run_sweeper(
                Arc::clone(&self.registry),
                interval,
                self.cancel.child_token(),
            ));
        }

        let router = create_router(Arc::clone(&self.registry), self.config.max_chunk_size);
        let cancel = self.cancel.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!("server shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkyard_protocol::{ChunkAccepted, UploadCommitted};

    async fn start(root: &std::path::Path) -> (Arc<UploadServer>, tokio::task::JoinHandle<()>) {
        let registry = Arc::new(SessionRegistry::new(root));
        let server = UploadServer::new(ServerConfig::default(), registry);
        let server2 = Arc::clone(&server);

        let handle = tokio::spawn(async move {
            server2.run().await.unwrap();
        });

        // Wait for the server to bind.
        for _ in 0..100 {
            if server.port().await > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        (server, handle)
    }

    #[tokio::test]
    async fn server_binds_dynamic_port() {
        let root = tempfile::tempdir().unwrap();
        let (server, handle) = start(root.path()).await;

        let port = server.port().await;
        assert!(port > 0, "should have bound to a dynamic port");
        assert!(server.local_addr().await.is_some());

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn server_rejects_second_run() {
        let root = tempfile::tempdir().unwrap();
        let (server, handle) = start(root.path()).await;

        let result = server.run().await;
        assert!(matches!(result, Err(ServerError::AlreadyRunning)));

        server.shutdown();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn server_round_trip_over_http() {
        let root = tempfile::tempdir().unwrap();
        let (server, handle) = start(root.path()).await;
        let base = format!("http://127.0.0.1:{}", server.port().await);
        let http = reqwest::Client::new();

        let ack: ChunkAccepted = http
            .put(format!("{base}/upload/0/0"))
            .body("AAAA")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ack.offset, 4);

        let ack: ChunkAccepted = http
            .put(format!("{base}/upload/{}/4", ack.id))
            .body("BB")
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ack.offset, 6);

        let resp = http
            .post(format!("{base}/upload/{}/out.txt", ack.id))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let committed: UploadCommitted = resp.json().await.unwrap();
        assert_eq!(committed.bytes, 6);
        assert_eq!(std::fs::read(root.path().join("out.txt")).unwrap(), b"AAAABB");

        server.shutdown();
        handle.await.unwrap();
    }
}
