//! Removal of orphaned multipart temp files
//!
//! When a multipart body with files is decoded, a cleanup hook is armed on the
//! request lifecycle. At the end of the request it deletes every uploaded file
//! still sitting where the parser wrote it. Files the handler moved elsewhere
//! are left alone.

use crate::http::{RequestLifecycle, UploadedFile};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Priority of the cleanup hook; runs after ordinary end-of-request hooks
pub const CLEANUP_PRIORITY: i32 = 1000;

/// Identifies temp files written by the multipart parser for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCleanupContext {
    dir: PathBuf,
    prefix: String,
}

impl UploadCleanupContext {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `path` names a file the parser would have created
    pub fn owns(&self, path: &Path) -> bool {
        let in_dir = path.parent().is_some_and(|parent| parent == self.dir);
        let prefixed = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&self.prefix));
        in_dir && prefixed
    }
}

/// Register the cleanup hook for this request
pub fn arm(context: UploadCleanupContext, lifecycle: &mut RequestLifecycle) {
    lifecycle.on_finish(CLEANUP_PRIORITY, move |uploads| {
        run_cleanup(&context, uploads);
    });
}

/// Delete uploaded files still at their temp path; returns how many were removed
pub fn run_cleanup(context: &UploadCleanupContext, uploads: &[UploadedFile]) -> usize {
    let mut removed = 0;

    for upload in uploads {
        let path = &upload.temp_path;
        if !context.owns(path) || !path.exists() {
            continue;
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), field = %upload.field, "removed orphaned upload");
                removed += 1;
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove orphaned upload");
            }
        }
    }

    removed
}
