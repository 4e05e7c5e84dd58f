//! Daemon commands: `serve` wires the registry into the HTTP server, `push`
//! drives the upload client.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chunkyard_transfer::SessionRegistry;
use chunkyard_upload_client::UploadClient;
use chunkyard_upload_server::{ServerConfig, UploadServer};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

/// Runs the upload server until ctrl-c.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.content_path)
        .with_context(|| format!("creating content path {}", config.content_path.display()))?;

    let registry = SessionRegistry::new(&config.content_path)
        .with_ttl(config.session_ttl())
        .context("invalid session_ttl_secs")?;

    let server_config = ServerConfig {
        port: config.port,
        max_chunk_size: config.max_chunk_size,
        sweep_interval: config.sweep_interval(),
    };
    let server = UploadServer::new(server_config, Arc::new(registry));

    let server_run = Arc::clone(&server);
    let mut task = tokio::spawn(async move { server_run.run().await });

    tokio::select! {
        res = &mut task => {
            res??;
            anyhow::bail!("server stopped unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    server.shutdown();
    task.await??;

    let abandoned = server.registry().len();
    if abandoned > 0 {
        tracing::info!(sessions = abandoned, "uncommitted sessions left on disk");
    }
    Ok(())
}

/// Uploads `file` to the server at `server_url`.
pub async fn push(
    file: &Path,
    server_url: &str,
    name: Option<String>,
    chunk_size: usize,
) -> anyhow::Result<()> {
    let name = destination_name(file, name)?;
    let client = UploadClient::new(server_url)?;
    let cancel = CancellationToken::new();

    let upload = client.upload_file(file, &name, chunk_size, &cancel);
    tokio::pin!(upload);

    let result = tokio::select! {
        res = &mut upload => res,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, cancelling upload");
            cancel.cancel();
            upload.await
        }
    };
    let receipt = result.with_context(|| format!("uploading {}", file.display()))?;

    tracing::info!(
        session = %receipt.id,
        bytes = receipt.bytes,
        name = %receipt.name,
        "pushed"
    );
    Ok(())
}

/// Explicit `--name`, or the file's own name.
fn destination_name(file: &Path, name: Option<String>) -> anyhow::Result<String> {
    match name {
        Some(name) => Ok(name),
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("cannot derive a name from {}; pass --name", file.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn destination_name_defaults_to_file_name() {
        let name = destination_name(&PathBuf::from("/tmp/video.mp4"), None).unwrap();
        assert_eq!(name, "video.mp4");
    }

    #[test]
    fn destination_name_prefers_explicit_name() {
        let name = destination_name(&PathBuf::from("/tmp/video.mp4"), Some("clip.mp4".into()))
            .unwrap();
        assert_eq!(name, "clip.mp4");
    }

    #[test]
    fn destination_name_requires_a_file_name() {
        assert!(destination_name(&PathBuf::from("/"), None).is_err());
    }

    #[tokio::test]
    async fn serve_rejects_zero_ttl() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            content_path: tmp.path().join("content"),
            session_ttl_secs: 0,
            ..Config::default()
        };
        assert!(serve(config).await.is_err());
        // The content path is created before the registry is configured.
        assert!(tmp.path().join("content").is_dir());
    }

    #[tokio::test]
    async fn push_to_a_running_server() {
        let content = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(content.path()));
        let server = UploadServer::new(ServerConfig::default(), registry);
        let server_run = Arc::clone(&server);
        let handle = tokio::spawn(async move { server_run.run().await });

        let port = loop {
            let p = server.port().await;
            if p > 0 {
                break p;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        };

        let src = tempfile::tempdir().unwrap();
        let file = src.path().join("notes.txt");
        std::fs::write(&file, b"hello chunkyard").unwrap();

        push(&file, &format!("http://127.0.0.1:{port}"), None, 4)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(content.path().join("notes.txt")).unwrap(),
            b"hello chunkyard"
        );

        server.shutdown();
        handle.await.unwrap().unwrap();
    }
}
