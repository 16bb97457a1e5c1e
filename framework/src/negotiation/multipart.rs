//! Multipart form data parsing
//!
//! The negotiator only talks to the [`MultipartParser`] trait. The default
//! [`MulterParser`] streams file parts to disk under a configured directory,
//! naming each file with a fixed prefix plus a random suffix so the cleanup
//! hook can tell its own temp files from anything else.

use super::cleanup::UploadCleanupContext;
use super::params::Params;
use crate::config::NegotiationConfig;
use crate::http::{nest_pairs, UploadedFile};
use async_trait::async_trait;
use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Errors raised while parsing a multipart body
#[derive(Debug, Error)]
pub enum MultipartError {
    /// The Content-Type carries no usable boundary
    #[error("Invalid multipart boundary: {0}")]
    Boundary(String),

    /// The body does not follow the multipart format
    #[error("Malformed multipart body: {0}")]
    Malformed(String),

    /// A file part exceeded the size limit
    #[error("Uploaded file '{field}' exceeds the limit of {max} bytes")]
    FileTooLarge {
        /// Field the file was sent under
        field: String,
        /// Configured limit in bytes
        max: usize,
    },

    /// Writing an upload to disk failed
    #[error("Failed to store uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<multer::Error> for MultipartError {
    fn from(e: multer::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Fields and files decoded from a multipart body
#[derive(Debug, Clone)]
pub struct ParsedMultipart {
    /// Non-file parts, nested by bracketed field names
    pub fields: Params,
    /// File parts stored on disk
    pub files: Vec<UploadedFile>,
    upload_dir: PathBuf,
    prefix: String,
}

impl ParsedMultipart {
    pub fn new(upload_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            fields: Params::new(),
            files: Vec::new(),
            upload_dir: upload_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// Directory the files were written to
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Filename prefix of the files written
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Cleanup context identifying the files this parse wrote
    pub fn cleanup_context(&self) -> UploadCleanupContext {
        UploadCleanupContext::new(&self.upload_dir, &self.prefix)
    }
}

/// Parser for `multipart/form-data` bodies
#[async_trait]
pub trait MultipartParser: Send + Sync {
    /// Parse `body` using the boundary from `content_type`
    async fn parse(&self, content_type: &str, body: Bytes)
        -> Result<ParsedMultipart, MultipartError>;
}

/// Multipart parser backed by `multer`
#[derive(Debug, Clone)]
pub struct MulterParser {
    upload_dir: PathBuf,
    prefix: String,
    max_file_size: usize,
}

impl MulterParser {
    pub fn new(upload_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            prefix: prefix.into(),
            max_file_size: crate::config::DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn from_config(config: &NegotiationConfig) -> Self {
        Self::new(&config.upload_dir, &config.upload_prefix).max_file_size(config.max_file_size)
    }

    /// Set the maximum size of a single uploaded file
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.max_file_size = size;
        self
    }

    async fn read_parts(
        &self,
        multipart: &mut multer::Multipart<'static>,
        parsed: &mut ParsedMultipart,
    ) -> Result<(), MultipartError> {
        let mut pairs = Vec::new();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(original_name) = field.file_name().map(str::to_string) else {
                pairs.push((name, field.text().await?));
                continue;
            };

            let content_type = field.content_type().map(|mime| mime.to_string());
            let path = self.upload_dir.join(format!("{}{}", self.prefix, random_suffix()));
            let size = self.store(&mut field, &name, &path).await?;

            // Browsers send an empty part when no file was chosen
            if size == 0 && original_name.is_empty() {
                let _ = tokio::fs::remove_file(&path).await;
                continue;
            }

            parsed.files.push(UploadedFile {
                field: name,
                original_name,
                temp_path: path,
                size,
                content_type,
            });
        }

        parsed.fields = nest_pairs(pairs);
        Ok(())
    }

    /// Write one file part to `path`, removing it again on failure
    async fn store(
        &self,
        field: &mut multer::Field<'static>,
        name: &str,
        path: &Path,
    ) -> Result<u64, MultipartError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let mut file = tokio::fs::File::create(path).await?;

        let result = async {
            let mut size = 0usize;
            while let Some(chunk) = field.chunk().await? {
                size += chunk.len();
                if size > self.max_file_size {
                    return Err(MultipartError::FileTooLarge {
                        field: name.to_string(),
                        max: self.max_file_size,
                    });
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<u64, MultipartError>(size as u64)
        }
        .await;

        drop(file);
        if result.is_err() {
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}

#[async_trait]
impl MultipartParser for MulterParser {
    async fn parse(
        &self,
        content_type: &str,
        body: Bytes,
    ) -> Result<ParsedMultipart, MultipartError> {
        let boundary =
            multer::parse_boundary(content_type).map_err(|e| MultipartError::Boundary(e.to_string()))?;

        let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
        let mut multipart = multer::Multipart::new(stream, boundary);
        let mut parsed = ParsedMultipart::new(&self.upload_dir, &self.prefix);

        if let Err(err) = self.read_parts(&mut multipart, &mut parsed).await {
            for file in &parsed.files {
                let _ = tokio::fs::remove_file(&file.temp_path).await;
            }
            return Err(err);
        }

        Ok(parsed)
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
