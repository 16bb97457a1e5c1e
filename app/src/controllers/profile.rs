use kit::{Config, FrameworkError, HttpResponse, Request, Response};
use serde_json::json;
use std::path::Path;

use crate::config::StorageConfig;

/// Keep the uploaded `avatar` file; any other upload is left to temp cleanup
pub async fn avatar(req: Request) -> Response {
    let id = req.param("id")?;
    let upload = req
        .uploads()
        .iter()
        .find(|file| file.field == "avatar")
        .ok_or_else(|| FrameworkError::domain("An avatar file is required", 422))?;

    let storage = Config::get::<StorageConfig>().unwrap_or_else(StorageConfig::from_env);
    let dir = storage.avatars();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FrameworkError::internal(e.to_string()))?;

    let name = Path::new(&upload.original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("avatar");
    let target = dir.join(format!("{}-{}", id, name));
    move_file(&upload.temp_path, &target)
        .await
        .map_err(|e| FrameworkError::internal(e.to_string()))?;
    tracing::info!(user = id, path = %target.display(), size = upload.size, "avatar stored");

    Ok(HttpResponse::json(json!({
        "id": id,
        "avatar": target.display().to_string(),
        "size": upload.size,
    })))
}

/// Move a file, copying across filesystems when a rename is not possible
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Err(err) = tokio::fs::rename(from, to).await {
        tracing::debug!(error = %err, "rename failed, copying instead");
        tokio::fs::copy(from, to).await?;
        tokio::fs::remove_file(from).await?;
    }
    Ok(())
}
