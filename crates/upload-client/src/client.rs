//! Upload client.
//!
//! Async HTTP client using `reqwest`.

use std::path::Path;

use chunkyard_protocol::{
    ChunkAccepted, ErrorResponse, NEW_SESSION_ID, UploadCommitted, UploadDiscarded,
};
use chunkyard_transfer::{ChunkReader, TransferError};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Errors from the upload client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server offset {offset} is past the end of the {file_size}-byte file")]
    Diverged { offset: u64, file_size: u64 },

    #[error("upload cancelled")]
    Cancelled,
}

/// Result of sending one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The chunk was stored; carries the session's new offset.
    Accepted(ChunkAccepted),
    /// The asserted offset was wrong; the session is really at `offset`.
    Conflict { id: String, offset: u64 },
}

/// Client for one upload server.
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    /// Creates a client for the server at `base_url`, e.g.
    /// `http://127.0.0.1:19502`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: &str, item: &str) -> String {
        format!(
            "{}/upload/{}/{}",
            self.base_url,
            utf8_percent_encode(id, NON_ALPHANUMERIC),
            utf8_percent_encode(item, NON_ALPHANUMERIC)
        )
    }

    /// Sends `data` as the chunk starting at `offset`.
    ///
    /// Pass [`NEW_SESSION_ID`] as `id` to open a new session.
    pub async fn put_chunk(
        &self,
        id: &str,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<PutOutcome, ClientError> {
        let url = self.item_url(id, &offset.to_string());
        let resp = self.http.put(&url).body(data).send().await?;

        if resp.status() == StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            return match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    id: Some(id),
                    offset: Some(offset),
                    ..
                }) => Ok(PutOutcome::Conflict { id, offset }),
                _ => Err(ClientError::Api { status: 409, body }),
            };
        }

        Ok(PutOutcome::Accepted(decode(resp).await?))
    }

    /// Assembles session `id` into `name` on the server.
    pub async fn commit(&self, id: &str, name: &str) -> Result<UploadCommitted, ClientError> {
        let resp = self.http.post(self.item_url(id, name)).send().await?;
        decode(resp).await
    }

    /// Drops session `id` and its chunks on the server.
    pub async fn discard(&self, id: &str) -> Result<UploadDiscarded, ClientError> {
        let url = format!(
            "{}/upload/{}",
            self.base_url,
            utf8_percent_encode(id, NON_ALPHANUMERIC)
        );
        let resp = self.http.delete(&url).send().await?;
        decode(resp).await
    }

    /// Uploads the file at `path` in a new session and commits it as `name`.
    ///
    /// If `chunk_size` is 0, the default chunk size is used. When `cancel`
    /// fires between chunks, the partial session is discarded.
    pub async fn upload_file(
        &self,
        path: &Path,
        name: &str,
        chunk_size: usize,
        cancel: &CancellationToken,
    ) -> Result<UploadCommitted, ClientError> {
        self.resume_file(NEW_SESSION_ID, path, name, chunk_size, cancel)
            .await
    }

    /// Continues uploading `path` into the existing session `id`.
    ///
    /// The first chunk is sent at offset 0; the server's conflict reply
    /// tells the client where the session really is and the file is read
    /// from there on.
    pub async fn resume_file(
        &self,
        id: &str,
        path: &Path,
        name: &str,
        chunk_size: usize,
        cancel: &CancellationToken,
    ) -> Result<UploadCommitted, ClientError> {
        let mut reader = tokio::task::spawn_blocking({
            let path = path.to_path_buf();
            move || ChunkReader::new(&path, chunk_size)
        })
        .await
        .map_err(std::io::Error::other)??;
        let file_size = reader.file_size();
        let mut id = id.to_string();

        loop {
            if cancel.is_cancelled() {
                self.abandon(&id).await;
                return Err(ClientError::Cancelled);
            }

            let (r, next) = tokio::task::spawn_blocking(move || {
                let next = reader.next_chunk();
                (reader, next)
            })
            .await
            .map_err(std::io::Error::other)?;
            reader = r;
            let Some(chunk) = next? else {
                break;
            };

            let (next_id, server_offset) =
                match self.put_chunk(&id, chunk.offset, chunk.data).await? {
                    PutOutcome::Accepted(ack) => (ack.id, ack.offset),
                    PutOutcome::Conflict { id, offset } => {
                        tracing::info!(session = %id, offset, "resuming at server offset");
                        (id, offset)
                    }
                };
            id = next_id;

            if server_offset != reader.offset() {
                if server_offset > file_size {
                    return Err(ClientError::Diverged {
                        offset: server_offset,
                        file_size,
                    });
                }
                reader.seek_to(server_offset)?;
            }
            tracing::debug!(session = %id, offset = server_offset, "chunk sent");
        }

        // An empty file never produced a chunk; open the session with an
        // empty one so there is something to commit.
        if id == NEW_SESSION_ID {
            id = match self.put_chunk(NEW_SESSION_ID, 0, Vec::new()).await? {
                PutOutcome::Accepted(ChunkAccepted { id, .. }) | PutOutcome::Conflict { id, .. } => {
                    id
                }
            };
        }

        let receipt = self.commit(&id, name).await?;
        tracing::info!(
            session = %receipt.id,
            bytes = receipt.bytes,
            name = %receipt.name,
            "upload committed"
        );
        Ok(receipt)
    }

    async fn abandon(&self, id: &str) {
        if id == NEW_SESSION_ID {
            return;
        }
        if let Err(e) = self.discard(id).await {
            tracing::warn!(session = %id, "failed to discard cancelled upload: {e}");
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            body,
        });
    }
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
