//! Local disk uploads
//!
//! Files land in the configured directory as `<field>-<original>-<millis>`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::users::StoredFile;

/// A file received from a multipart request, not yet written.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_files: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            dir: dir.into(),
            max_files,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Writes every file and returns their metadata in the same order.
    pub async fn save_all(&self, files: Vec<IncomingFile>) -> Result<Vec<StoredFile>> {
        if files.is_empty() {
            return Err(AppError::Upload("No files were uploaded.".to_string()));
        }
        if files.len() > self.max_files {
            return Err(AppError::Upload(format!(
                "At most {} files may be uploaded at once.",
                self.max_files
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Upload(format!("cannot create upload directory: {}", e)))?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            stored.push(self.save(file).await?);
        }
        info!("Uploaded {} files", stored.len());
        Ok(stored)
    }

    /// Deletes files written by [`UploadStore::save_all`] that never got
    /// recorded against a user.
    pub async fn discard(&self, files: &[StoredFile]) {
        for file in files {
            if let Err(e) = tokio::fs::remove_file(&file.path).await {
                warn!(path = %file.path, error = %e, "Failed to remove unrecorded upload");
            }
        }
    }

    async fn save(&self, file: IncomingFile) -> Result<StoredFile> {
        let original_name = sanitize_file_name(&file.original_name);
        let now = Utc::now();
        let file_name = stored_file_name(&file.field_name, &original_name, now.timestamp_millis());
        let path = unique_path(&self.dir, &file_name).await;

        tokio::fs::write(&path, &file.data)
            .await
            .map_err(|e| AppError::Upload(format!("cannot write {}: {}", file_name, e)))?;

        Ok(StoredFile {
            field_name: file.field_name,
            original_name,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(file_name),
            path: path.to_string_lossy().into_owned(),
            size: file.data.len() as u64,
            content_type: file.content_type,
            uploaded_at: now,
        })
    }
}

/// Keeps only the final path component and drops characters that are
/// awkward in file names.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned.trim_matches('.').trim();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn stored_file_name(field_name: &str, original_name: &str, millis: i64) -> String {
    format!("{}-{}-{}", sanitize_file_name(field_name), original_name, millis)
}

/// Appends a counter when two uploads in the same millisecond collide.
async fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}", file_name, n));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}
