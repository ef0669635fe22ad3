//! File operations
//!
//! Upload streams the payload in fixed chunks so progress can be computed
//! from byte counts; download writes through a `.part` temp file that is
//! renamed into place on success and removed on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::models::{FileEntry, Id, Listing};
use crate::progress::ProgressSender;

/// Chunk size for upload streaming; small enough for useful progress
/// granularity on desktop-sized files.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Payload for an upload: in-memory bytes or a file on disk.
pub enum UploadSource {
    Bytes { filename: String, data: Vec<u8> },
    Path(PathBuf),
}

impl UploadSource {
    async fn resolve(self) -> Result<(String, Vec<u8>), ApiError> {
        match self {
            UploadSource::Bytes { filename, data } => Ok((filename, data)),
            UploadSource::Path(path) => {
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| {
                        ApiError::InvalidConfig(format!("no filename in {}", path.display()))
                    })?
                    .to_string();
                let data = tokio::fs::read(&path).await?;
                Ok((filename, data))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: FileEntry,
}

#[derive(Debug, Deserialize)]
struct FilesEnvelope {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
struct RenamePayload<'a> {
    filename: &'a str,
}

#[derive(Debug, Serialize)]
struct TargetFolderPayload {
    folder_id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct FavoritePayload {
    is_favorite: bool,
}

#[derive(Clone)]
pub struct FileService {
    gateway: Arc<ApiGateway>,
}

impl FileService {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Immediate children of `folder_id` (workspace root when `None`).
    /// Never recursive.
    pub async fn list(&self, folder_id: Option<Id>) -> Result<Listing, ApiError> {
        let mut query = Vec::new();
        if let Some(id) = folder_id {
            query.push(("folder_id", id.to_string()));
        }
        self.gateway.get_json("/files/list", &query).await
    }

    pub async fn get(&self, id: Id) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self.gateway.get_json(&format!("/files/{}", id), &[]).await?;
        Ok(env.file)
    }

    /// Upload into `folder_id` (root when `None`). Progress, when a sender
    /// is supplied, is a non-decreasing 0-100 sequence ending at 100 on
    /// success.
    pub async fn upload(
        &self,
        source: UploadSource,
        folder_id: Option<Id>,
        progress: Option<ProgressSender>,
    ) -> Result<FileEntry, ApiError> {
        let (filename, data) = source.resolve().await?;
        let total = data.len() as u64;
        let mime = mime_guess::from_path(&filename).first_or_octet_stream();

        if let Some(sender) = &progress {
            sender.report(0, total);
        }
        let body = reqwest::Body::wrap_stream(upload_stream(data, progress.clone()));
        let part = multipart::Part::stream_with_length(body, total)
            .file_name(filename.clone())
            .mime_str(mime.as_ref())
            .map_err(|e| ApiError::InvalidConfig(format!("multipart: {}", e)))?;

        let mut form = multipart::Form::new().part("file", part);
        if let Some(id) = folder_id {
            form = form.text("folder_id", id.to_string());
        }

        let env: FileEnvelope = self.gateway.post_multipart("/files/upload", form).await?;
        if let Some(sender) = &progress {
            sender.finish();
        }
        info!("Uploaded {} ({} bytes)", env.file.filename, total);
        Ok(env.file)
    }

    pub async fn rename(&self, id: Id, new_name: &str) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self
            .gateway
            .put_json(&format!("/files/{}/rename", id), &RenamePayload { filename: new_name })
            .await?;
        Ok(env.file)
    }

    /// Delete a file. Whether this trashes or destroys is a backend
    /// decision; the client only observes the next listing.
    pub async fn delete(&self, id: Id) -> Result<(), ApiError> {
        self.gateway.delete(&format!("/files/{}", id)).await
    }

    pub async fn move_to(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self
            .gateway
            .post_json(&format!("/files/{}/move", id), &TargetFolderPayload { folder_id: target })
            .await?;
        Ok(env.file)
    }

    pub async fn copy_to(&self, id: Id, target: Option<Id>) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self
            .gateway
            .post_json(&format!("/files/{}/copy", id), &TargetFolderPayload { folder_id: target })
            .await?;
        Ok(env.file)
    }

    /// Stream a file's content to `dest`. Writes through `dest.part`,
    /// renames into place on success, removes the temp file on failure.
    pub async fn download(
        &self,
        id: Id,
        dest: &Path,
        progress: Option<ProgressSender>,
    ) -> Result<(), ApiError> {
        let resp = self
            .gateway
            .get_stream(&format!("/files/{}/download", id), &[])
            .await?;
        let total = resp.content_length().unwrap_or(0);

        let part_path = part_path(dest);
        let mut out = tokio::fs::File::create(&part_path).await?;
        let mut stream = resp.bytes_stream();
        let mut downloaded = 0u64;

        let write_result: Result<(), ApiError> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(ApiError::from_reqwest)?;
                out.write_all(&chunk).await?;
                downloaded += chunk.len() as u64;
                if total > 0 {
                    if let Some(sender) = &progress {
                        sender.report(downloaded, total);
                    }
                }
            }
            out.flush().await?;
            Ok(())
        }
        .await;

        match write_result {
            Ok(()) => {
                tokio::fs::rename(&part_path, dest).await?;
                if let Some(sender) = &progress {
                    sender.finish();
                }
                debug!("Downloaded file {} to {} ({} bytes)", id, dest.display(), downloaded);
                Ok(())
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(err)
            }
        }
    }

    // ─── Trash & favorites ───────────────────────────────────────────────

    pub async fn list_trash(&self) -> Result<Vec<FileEntry>, ApiError> {
        let env: FilesEnvelope = self.gateway.get_json("/files/trash", &[]).await?;
        Ok(env.files)
    }

    pub async fn restore(&self, id: Id) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self.gateway.post(&format!("/files/{}/restore", id)).await?;
        Ok(env.file)
    }

    pub async fn set_favorite(&self, id: Id, is_favorite: bool) -> Result<FileEntry, ApiError> {
        let env: FileEnvelope = self
            .gateway
            .put_json(&format!("/files/{}/favorite", id), &FavoritePayload { is_favorite })
            .await?;
        Ok(env.file)
    }

    pub async fn list_favorites(&self) -> Result<Vec<FileEntry>, ApiError> {
        let env: FilesEnvelope = self.gateway.get_json("/files/favorites", &[]).await?;
        Ok(env.files)
    }

    /// URL for rendering an inline preview/thumbnail outside the gateway
    /// pipeline.
    pub async fn preview_url(&self, id: Id) -> Result<Url, ApiError> {
        self.gateway.resource_url(&format!("/files/{}/preview", id)).await
    }
}

/// Chunked byte stream over the upload payload, reporting cumulative
/// progress as each chunk is handed to the transport.
fn upload_stream(
    data: Vec<u8>,
    progress: Option<ProgressSender>,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send {
    let total = data.len() as u64;
    let data = Bytes::from(data);
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(UPLOAD_CHUNK)
        .map(|start| data.slice(start..(start + UPLOAD_CHUNK).min(data.len())))
        .collect();

    futures_util::stream::iter(chunks).scan(0u64, move |sent, chunk| {
        *sent += chunk.len() as u64;
        if let Some(sender) = &progress {
            sender.report(*sent, total);
        }
        futures_util::future::ready(Some(Ok(chunk)))
    })
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::progress_channel;

    #[tokio::test]
    async fn test_upload_stream_reports_monotonic_progress() {
        let (sender, events) = progress_channel();
        let payload = vec![7u8; UPLOAD_CHUNK * 2 + 100];
        let total = payload.len();

        sender.report(0, total as u64);
        let chunks: Vec<_> = upload_stream(payload, Some(sender.clone()))
            .collect::<Vec<_>>()
            .await;
        sender.finish();
        drop(sender);

        let streamed: usize = chunks.iter().map(|c| c.as_ref().unwrap().len()).sum();
        assert_eq!(streamed, total);

        let seen = events.collect().await;
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_upload_source_path_resolves_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        tokio::fs::write(&path, b"content").await.unwrap();

        let (filename, data) = UploadSource::Path(path).resolve().await.unwrap();
        assert_eq!(filename, "report.pdf");
        assert_eq!(data, b"content");
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/report.pdf")),
            PathBuf::from("/tmp/report.pdf.part")
        );
        assert_eq!(part_path(Path::new("/tmp/LICENSE")), PathBuf::from("/tmp/LICENSE.part"));
    }
}
