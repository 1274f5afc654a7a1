//! Outbox publisher for dry runs: posts are appended to a JSONL file
//! instead of being sent anywhere.

use async_trait::async_trait;
use cosmos_poster_domain::model::RenderedPost;
use cosmos_poster_domain::ports::{PublishError, PublishResult, Publisher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn open(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Publisher that records posts for the named platform without sending them
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    platform: &'static str,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, platform: &'static str) -> Self {
        Self { writer, platform }
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    platform: &'a str,
    content_id: &'a str,
    text: &'a str,
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn authenticate(&self) -> Result<(), PublishError> {
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    async fn publish(&self, post: &RenderedPost) -> Result<PublishResult, PublishError> {
        let entry = OutboxEntry {
            platform: self.platform,
            content_id: &post.content_id,
            text: &post.text,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(
            content_id = %post.content_id,
            outbox = %self.writer.path().display(),
            "Post written to outbox"
        );

        Ok(PublishResult {
            id: Uuid::new_v4().to_string(),
            url: None,
        })
    }

    async fn close(&self) {
        let mut file = self.writer.file.lock().await;
        if let Err(error) = file.flush().await {
            tracing::warn!(error = %error, "Failed to flush outbox");
        }
    }

    fn platform(&self) -> &'static str {
        "outbox"
    }
}
