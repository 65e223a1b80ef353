//! Artifact persistence.
//!
//! Exports may contain conversation content and runtime URLs, so every
//! artifact is written atomically and readable by the owner only.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{ExportError, ExportResult};

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> ExportResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(0o600);
    tokio::fs::set_permissions(path, perms)
        .await
        .map_err(|e| ExportError::io(path, e))?;

    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> ExportResult<()> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

async fn create_parent_dirs(path: &Path) -> ExportResult<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !tokio::fs::try_exists(parent).await.unwrap_or(false) {
        debug!(path = %parent.display(), "Creating directory");
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExportError::io(parent, e))?;
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes bytes atomically (temp file + rename) with owner-only permissions.
///
/// Parent directories are created as needed.
pub async fn save_bytes(path: &Path, data: &[u8]) -> ExportResult<()> {
    debug!(path = %path.display(), bytes = data.len(), "Saving artifact");

    create_parent_dirs(path).await?;

    let temp = temp_path(path);
    tokio::fs::write(&temp, data)
        .await
        .map_err(|e| ExportError::io(&temp, e))?;
    set_restrictive_permissions(&temp).await?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| ExportError::io(path, e))?;

    debug!(path = %path.display(), "Artifact saved");
    Ok(())
}

/// Writes UTF-8 text.
pub async fn save_text(path: &Path, text: &str) -> ExportResult<()> {
    save_bytes(path, text.as_bytes()).await
}

/// Writes pretty-printed JSON.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> ExportResult<()> {
    let json = serde_json::to_string_pretty(data)?;
    save_text(path, &json).await
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> ExportResult<T> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

// ============================================================================
// Tests
// ============================================================================
