use crate::error::{DrawError, Result};
use crate::storage::{document_digest, RemoteTier};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Remote tier backed by one JSON file per key in a shared directory.
/// Change notifications come from polling the file's digest.
#[derive(Debug, Clone)]
pub struct FileRemote {
    root: PathBuf,
    poll_interval: Duration,
}

impl FileRemote {
    pub async fn new(root: &Path, poll_interval: Duration) -> Result<Self> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| DrawError::internal(format!("Failed to create directory: {}", e)))?;

        Ok(Self {
            root: root.to_path_buf(),
            poll_interval,
        })
    }

    pub fn document_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

async fn read_document(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RemoteTier for FileRemote {
    async fn write(&self, key: &str, document: &str) -> Result<()> {
        let path = self.document_path(key);
        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));

        // rename keeps readers from seeing a half-written document
        tokio::fs::write(&tmp, document)
            .await
            .map_err(|e| DrawError::persistence(format!("Failed to write {}: {}", tmp.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(DrawError::persistence(format!(
                "Failed to replace {}: {}",
                path.display(),
                e
            )));
        }

        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        read_document(&self.document_path(key)).await
    }

    async fn on_change(&self, key: &str) -> Result<mpsc::UnboundedReceiver<String>> {
        let path = self.document_path(key);
        let interval = self.poll_interval;
        let (tx, rx) = mpsc::unbounded_channel();

        // Content already on disk is the baseline, not a change.
        let baseline = match read_document(&path).await {
            Ok(body) => body.map(|body| document_digest(&body)),
            Err(e) => {
                tracing::warn!("Failed to read {} before watching: {}", path.display(), e);
                None
            }
        };

        tokio::spawn(async move {
            let mut last_digest = baseline;
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let body = match read_document(&path).await {
                    Ok(Some(body)) => body,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!("Failed to poll {}: {}", path.display(), e);
                        continue;
                    }
                };

                let digest = document_digest(&body);
                if last_digest.as_deref() == Some(digest.as_str()) {
                    continue;
                }
                last_digest = Some(digest);

                if tx.send(body).is_err() {
                    break;
                }
            }

            tracing::debug!("Stopped watching {}", path.display());
        });

        Ok(rx)
    }
}
