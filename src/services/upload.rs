use crate::error::{AppError, AppResult};
use crate::normalize::{media_url, UPLOAD_SUBDIR};
use anyhow::Context;
use axum::body::Bytes;
use std::path::Path;
use tokio::fs;

#[derive(Clone)]
pub struct UploadConfig {
    pub upload_dir: String,
}

pub const MAX_FILE_SIZE: usize = 50 * 1024 * 1024; // 50 MB
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
    "video/mp4",
    "video/quicktime",
];

/// A file part pulled out of a multipart submission, held in memory until
/// the whole request has been validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }
}

/// Public URLs of the files written for one submission, split by kind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SavedMedia {
    pub photos: Vec<String>,
    pub videos: Vec<String>,
}

pub fn validate_file(file: &UploadedFile) -> AppResult<()> {
    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}",
            file.content_type
        )));
    }

    if file.data.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File too large: {:.1} MB (max 50MB)",
            file.data.len() as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

/// Keep letters, digits and `. _ ( ) -`; whitespace runs become `_`.
pub fn sanitize_file_name(original: &str) -> String {
    let mut out = String::with_capacity(original.len());
    let mut in_whitespace = false;
    for c in original.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '(' | ')' | '-') {
            out.push(c);
        }
    }

    if out.is_empty() {
        "file".to_string()
    } else {
        out
    }
}

pub fn stored_file_name(original: &str, millis: i64) -> String {
    format!("{}_{}", millis, sanitize_file_name(original))
}

pub struct UploadService;

impl UploadService {
    /// Validate every file, then write them all under the incident upload
    /// subdirectory. Nothing is written if any file fails validation.
    pub async fn save_media(config: &UploadConfig, files: &[UploadedFile]) -> AppResult<SavedMedia> {
        for file in files {
            validate_file(file)?;
        }

        let mut saved = SavedMedia::default();
        if files.is_empty() {
            return Ok(saved);
        }

        let dir = Path::new(&config.upload_dir).join(UPLOAD_SUBDIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        for file in files {
            let name = stored_file_name(&file.file_name, chrono::Utc::now().timestamp_millis());
            let path = dir.join(&name);
            fs::write(&path, &file.data)
                .await
                .with_context(|| format!("Failed to write file {}", path.display()))?;

            tracing::debug!("Stored upload {} ({} bytes)", name, file.data.len());

            let url = media_url(&name);
            if file.is_video() {
                saved.videos.push(url);
            } else {
                saved.photos.push(url);
            }
        }

        Ok(saved)
    }
}
