use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use futures::future::join_all;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::storage::{Storage, StorageClient, UploadedPart};

/// Files above this size are sent as multipart uploads. It is also S3's
/// minimum size for every part except the last.
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Tries per part before the whole file is given up.
pub const PART_ATTEMPTS: usize = 3;

/// One user-selected file.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Started { bytes: usize },
    /// `sent` bytes of `total` are stored; emitted once per part.
    Progress { sent: usize, total: usize },
    Completed { url: String },
    Failed { error: String },
}

/// Progress event for the file at `index` of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub index: usize,
    pub file_name: String,
    pub state: UploadState,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No images selected")]
    Empty,

    #[error("Image upload failed")]
    Failed { failed: usize, total: usize },
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `cars/<owner>/<unix-millis>-<uuid>.<ext>`
fn object_key(owner: Uuid, content_type: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("cars/{}/{}-{}.{}", owner, millis, Uuid::new_v4(), ext)
}

type Report<'a> = &'a (dyn Fn(UploadState) + Sync);

/// Uploads listing images to the object store.
#[derive(Clone)]
pub struct UploadCoordinator {
    storage: Arc<dyn StorageClient>,
    part_size: usize,
}

impl UploadCoordinator {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Coordinator over the S3/MinIO bucket described by `cfg`.
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let storage = Storage::new(cfg).await.context("object store client")?;
        info!(endpoint = %cfg.endpoint, bucket = %cfg.bucket, "upload coordinator ready");
        Ok(Self::new(Arc::new(storage)))
    }

    /// Same as [`connect`](Self::connect) with the `S3_*` environment variables.
    pub async fn from_env() -> anyhow::Result<Self> {
        Self::connect(&StorageConfig::from_env()?).await
    }

    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    /// Uploads every file concurrently and returns their URLs in input order.
    ///
    /// All or nothing: if any file fails, the objects that did upload are
    /// removed again and no URL is returned.
    pub async fn upload_batch(
        &self,
        owner: Uuid,
        items: Vec<UploadItem>,
        progress: Option<UnboundedSender<UploadProgress>>,
    ) -> Result<Vec<String>, UploadError> {
        if items.is_empty() {
            return Err(UploadError::Empty);
        }
        let total = items.len();

        let report = |index: usize, file_name: &str, state: UploadState| {
            if let Some(tx) = &progress {
                // receiver may be gone; progress is advisory
                let _ = tx.send(UploadProgress {
                    index,
                    file_name: file_name.to_string(),
                    state,
                });
            }
        };

        let uploads = items.into_iter().enumerate().map(|(index, item)| {
            let report = &report;
            async move {
                let key = object_key(owner, &item.content_type);
                let file_report = |state: UploadState| report(index, &item.file_name, state);
                file_report(UploadState::Started { bytes: item.body.len() });
                let res = self
                    .upload_one(&key, &item, &file_report)
                    .await
                    .with_context(|| format!("upload {}", item.file_name));
                match res {
                    Ok(()) => {
                        let url = self.storage.object_url(&key);
                        debug!(%key, "image uploaded");
                        file_report(UploadState::Completed { url: url.clone() });
                        Ok((key, url))
                    }
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), file = %item.file_name, "image upload failed");
                        file_report(UploadState::Failed { error: e.to_string() });
                        Err(e)
                    }
                }
            }
        });
        let results = join_all(uploads).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            let stored: Vec<String> = results.into_iter().filter_map(|r| r.ok()).map(|(k, _)| k).collect();
            self.discard(&stored).await;
            return Err(UploadError::Failed { failed, total });
        }

        let urls: Vec<String> = results.into_iter().filter_map(|r| r.ok()).map(|(_, u)| u).collect();
        info!(%owner, count = urls.len(), "image batch uploaded");
        Ok(urls)
    }

    async fn upload_one(&self, key: &str, item: &UploadItem, report: Report<'_>) -> anyhow::Result<()> {
        let total = item.body.len();
        if total <= self.part_size {
            self.storage
                .put_object(key, item.body.clone(), &item.content_type)
                .await?;
            report(UploadState::Progress { sent: total, total });
            return Ok(());
        }

        let upload_id = self.storage.create_multipart(key, &item.content_type).await?;
        let res = match self.send_parts(key, &upload_id, &item.body, report).await {
            Ok(parts) => self.storage.complete_multipart(key, &upload_id, &parts).await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            if let Err(abort) = self.storage.abort_multipart(key, &upload_id).await {
                warn!(error = %format!("{abort:#}"), %key, "could not abort multipart upload");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Sends the parts in order. A failed part is retried on the same
    /// upload id, so parts already stored are not sent again.
    async fn send_parts(
        &self,
        key: &str,
        upload_id: &str,
        body: &Bytes,
        report: Report<'_>,
    ) -> anyhow::Result<Vec<UploadedPart>> {
        let total = body.len();
        let mut parts = Vec::with_capacity(total.div_ceil(self.part_size));
        for (i, start) in (0..total).step_by(self.part_size).enumerate() {
            let end = (start + self.part_size).min(total);
            let number = i32::try_from(i + 1).context("too many parts")?;
            let part = self
                .send_part(key, upload_id, number, body.slice(start..end))
                .await?;
            parts.push(part);
            report(UploadState::Progress { sent: end, total });
        }
        Ok(parts)
    }

    async fn send_part(
        &self,
        key: &str,
        upload_id: &str,
        number: i32,
        chunk: Bytes,
    ) -> anyhow::Result<UploadedPart> {
        let mut attempt = 1;
        loop {
            match self.storage.upload_part(key, upload_id, number, chunk.clone()).await {
                Ok(part) => return Ok(part),
                Err(e) if attempt < PART_ATTEMPTS => {
                    warn!(error = %format!("{e:#}"), %key, part = number, attempt, "part upload failed; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn discard(&self, keys: &[String]) {
        let deletions = keys.iter().map(|key| async move {
            if let Err(e) = self.storage.delete_object(key).await {
                warn!(error = %format!("{e:#}"), %key, "could not remove orphaned upload");
            }
        });
        join_all(deletions).await;
    }
}
