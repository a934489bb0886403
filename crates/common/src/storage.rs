//! File storage for uploaded movie covers.

use std::path::PathBuf;

use crate::{AppError, AppResult, IdGenerator};

/// Directory (relative to the media root) movie covers are stored under.
pub const COVER_DIR: &str = "peliculas/portadas";

/// Stored file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the media root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file under `key`, replacing any previous content.
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile>;

    /// Delete a file. Missing files are not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(&self, key: &str, data: &[u8], content_type: &str) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), "Stored file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

/// Generate a unique storage key for a movie cover.
///
/// The extension of `original_name` is kept when it looks sane, otherwise `bin`.
#[must_use]
pub fn cover_storage_key(movie_id: &str, original_name: &str) -> String {
    let extension = original_name
        .rfind('.')
        .filter(|&pos| pos > 0 && pos < original_name.len() - 1)
        .map(|pos| &original_name[pos + 1..])
        .filter(|ext| ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(|| "bin".to_string(), str::to_ascii_lowercase);

    format!(
        "{COVER_DIR}/{movie_id}_{}.{extension}",
        IdGenerator::new().generate()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_storage_key() {
        let key = cover_storage_key("movie1", "Poster.JPG");
        assert!(key.starts_with("peliculas/portadas/movie1_"));
        assert!(key.ends_with(".jpg"));
    }

    #[test]
    fn test_cover_storage_key_no_extension() {
        let key = cover_storage_key("movie1", "poster");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_cover_storage_key_rejects_odd_extension() {
        let key = cover_storage_key("movie1", "poster.j/pg");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_public_url_joins_base() {
        let storage = LocalStorage::new(PathBuf::from("/tmp"), "/media/".to_string());
        assert_eq!(
            storage.public_url("peliculas/portadas/a.png"),
            "/media/peliculas/portadas/a.png"
        );
    }

    #[tokio::test]
    async fn test_local_upload_and_delete() {
        let dir = std::env::temp_dir().join(format!("cinelog-{}", IdGenerator::new().generate()));
        let storage = LocalStorage::new(dir.clone(), "/media".to_string());

        let file = storage
            .upload("peliculas/portadas/x.png", b"png-bytes", "image/png")
            .await
            .unwrap();
        assert_eq!(file.size, 9);
        assert_eq!(file.url, "/media/peliculas/portadas/x.png");
        assert!(storage.exists("peliculas/portadas/x.png").await.unwrap());

        storage.delete("peliculas/portadas/x.png").await.unwrap();
        assert!(!storage.exists("peliculas/portadas/x.png").await.unwrap());

        tokio::fs::remove_dir_all(dir).await.ok();
    }
}
