use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;

const WRITE_CHUNK: usize = 64 * 1024;

/// On-disk blob storage for note images and board backgrounds.
///
/// Blobs live under `{root}/{key}`, where keys are relative slash-separated
/// paths produced by [`note_image_key`] and [`board_background_key`]. The
/// key is the durable reference stored on the entity; [`BlobStore::url`]
/// turns it into the address clients fetch.
pub struct BlobStore {
    root: PathBuf,
    public_base: String,
}

impl BlobStore {
    pub async fn new(root: PathBuf) -> Result<Self, StoreError> {
        Self::with_public_base(root, "/blobs").await
    }

    pub async fn with_public_base(
        root: PathBuf,
        public_base: impl Into<String>,
    ) -> Result<Self, StoreError> {
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::storage("blob-store-error", e))?;
        info!("Blob storage directory: {}", root.display());
        Ok(Self {
            root,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public address of a stored blob.
    pub fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    pub async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.upload_with_progress(key, data, |_| {}).await
    }

    /// Write a blob, reporting progress as whole percentages. Each distinct
    /// value is reported once, in increasing order, ending with 100.
    pub async fn upload_with_progress<F>(
        &self,
        key: &str,
        data: &[u8],
        mut on_progress: F,
    ) -> Result<(), StoreError>
    where
        F: FnMut(u8),
    {
        let path = self.blob_path(key)?;
        let write = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let mut file = fs::File::create(&path).await?;
            let mut written = 0usize;
            let mut last_pct = None;
            for chunk in data.chunks(WRITE_CHUNK) {
                file.write_all(chunk).await?;
                written += chunk.len();
                let pct = (written * 100 / data.len()) as u8;
                if last_pct != Some(pct) {
                    on_progress(pct);
                    last_pct = Some(pct);
                }
            }
            if last_pct.is_none() {
                // Zero-length blob: nothing was chunked, still completed.
                on_progress(100);
            }
            file.flush().await
        };
        write
            .await
            .map_err(|e| StoreError::storage("blob-upload-error", e))?;
        info!("Blob {} stored ({} bytes)", key, data.len());
        Ok(())
    }

    pub async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::blob_not_found(key))
            }
            Err(e) => Err(StoreError::storage("blob-read-error", e)),
        }
    }

    /// Delete a blob. A missing blob is not an error; entities can carry
    /// references to blobs deleted through another path.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Blob {} deleted", key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", key);
                Ok(())
            }
            Err(e) => Err(StoreError::storage("blob-delete-error", e)),
        }
    }

    /// Keys of every blob stored under `prefix`, sorted. An empty prefix
    /// lists everything; a prefix with no blobs lists nothing.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.blob_path(prefix)?
        };
        let walk = async {
            let mut keys = Vec::new();
            let mut pending = vec![start];
            while let Some(dir) = pending.pop() {
                let mut entries = match fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                };
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    if entry.file_type().await?.is_dir() {
                        pending.push(path);
                    } else if let Ok(rel) = path.strip_prefix(&self.root) {
                        keys.push(rel.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
            keys.sort();
            Ok(keys)
        };
        walk.await
            .map_err(|e| StoreError::storage("blob-list-error", e))
    }

    /// Resolve a key below the root. Keys are relative paths; anything that
    /// could escape the root is rejected.
    fn blob_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StoreError::invalid(
                "invalid-blob-key",
                format!("blob key {key:?} is not a plain relative path"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

/// Storage key for an image attached to a note:
/// `boards/{board}/notes/{note}/images/{millis}_{name}`.
pub fn note_image_key(
    board_id: Uuid,
    note_id: Uuid,
    uploaded_at: DateTime<Utc>,
    file_name: &str,
) -> String {
    format!(
        "boards/{board_id}/notes/{note_id}/images/{}_{}",
        uploaded_at.timestamp_millis(),
        sanitize(file_name)
    )
}

/// Storage key for a board background:
/// `boards/{board}/backgrounds/background_{millis}_{name}`.
pub fn board_background_key(board_id: Uuid, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!(
        "boards/{board_id}/backgrounds/background_{}_{}",
        uploaded_at.timestamp_millis(),
        sanitize(file_name)
    )
}

/// Client file names go into storage keys verbatim except for anything
/// path- or shell-hostile.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_names() {
        assert_eq!(sanitize("photo-1.png"), "photo-1.png");
        assert_eq!(sanitize("my photo (2).png"), "my_photo__2_.png");
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize("///"), "file");
        assert_eq!(sanitize(""), "file");
    }

    #[test]
    fn keys_have_expected_shape() {
        let board = Uuid::new_v4();
        let note = Uuid::new_v4();
        let at = chrono::DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        let key = note_image_key(board, note, at, "cat.jpg");
        assert_eq!(
            key,
            format!("boards/{board}/notes/{note}/images/1700000000123_cat.jpg")
        );

        let key = board_background_key(board, at, "sky.png");
        assert_eq!(
            key,
            format!("boards/{board}/backgrounds/background_1700000000123_sky.png")
        );
    }

    #[tokio::test]
    async fn upload_reports_monotonic_progress() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();

        let data = vec![7u8; WRITE_CHUNK * 3 + 100];
        let mut seen = Vec::new();
        store
            .upload_with_progress("boards/b/notes/n/images/1_x.bin", &data, |pct| {
                seen.push(pct)
            })
            .await
            .unwrap();

        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "progress must rise");
        assert_eq!(
            store.download("boards/b/notes/n/images/1_x.bin").await.unwrap(),
            data
        );
    }

    #[tokio::test]
    async fn empty_blob_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();

        let mut seen = Vec::new();
        store
            .upload_with_progress("empty.bin", &[], |pct| seen.push(pct))
            .await
            .unwrap();
        assert_eq!(seen, vec![100]);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();

        let err = store.upload("../escape.bin", b"x").await.unwrap_err();
        assert_eq!(err.code(), "invalid-blob-key");
        let err = store.upload("/abs.bin", b"x").await.unwrap_err();
        assert_eq!(err.code(), "invalid-blob-key");
    }

    #[tokio::test]
    async fn list_by_prefix_walks_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();

        store.upload("boards/b1/notes/n1/images/1_a.png", b"a").await.unwrap();
        store.upload("boards/b1/notes/n2/images/2_b.png", b"b").await.unwrap();
        store
            .upload("boards/b2/backgrounds/background_3_c.png", b"c")
            .await
            .unwrap();

        let under_b1 = store.list("boards/b1").await.unwrap();
        assert_eq!(
            under_b1,
            vec![
                "boards/b1/notes/n1/images/1_a.png".to_string(),
                "boards/b1/notes/n2/images/2_b.png".to_string(),
            ]
        );

        let all = store.list("").await.unwrap();
        assert_eq!(all.len(), 3);

        assert!(store.list("boards/none").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_joins_public_base_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::with_public_base(dir.path().to_path_buf(), "/blobs/")
            .await
            .unwrap();
        assert_eq!(store.url("boards/b/x.png"), "/blobs/boards/b/x.png");
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();
        store.delete("boards/never/was.png").await.unwrap();
    }
}
