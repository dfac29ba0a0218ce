use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

/// Stored paths are relative to the upload root and always start with this prefix.
pub const PROFILE_DIR: &str = "uploads/profiles";
pub const MAX_PICTURE_BYTES: usize = 2 * 1024 * 1024;

/// Profile pictures on local disk, served back through `/uploads`.
#[derive(Debug, Clone)]
pub struct PictureStorage {
    root: PathBuf,
}

impl PictureStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the picture and returns the relative path to store on the user.
    pub async fn save(&self, user_id: i64, content_type: &str, body: Bytes) -> anyhow::Result<String> {
        let ext = ext_from_mime(content_type)
            .with_context(|| format!("unsupported picture type {content_type}"))?;
        let relative = format!("{PROFILE_DIR}/{user_id}_{}.{ext}", Uuid::new_v4().simple());

        let dir = self.root.join(PROFILE_DIR);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
        let target = self.root.join(&relative);
        tokio::fs::write(&target, &body)
            .await
            .with_context(|| format!("write {}", target.display()))?;

        debug!(path = %relative, bytes = body.len(), "profile picture stored");
        Ok(relative)
    }

    /// Best effort: failures are logged, never returned.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = relative, "refusing to delete path outside the picture directory");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = relative, "old profile picture removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, path = relative, "could not remove old profile picture"),
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        let contained = rel.starts_with(PROFILE_DIR)
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        contained.then(|| self.root.join(rel))
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
