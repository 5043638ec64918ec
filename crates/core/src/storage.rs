//! Upload persistence.
//!
//! Uploads are streamed into a hidden temporary file inside the uploads directory and renamed to
//! their final name only once the whole request has been received:
//!
//! ```text
//! uploads/
//! ├── .file-1767225600123-42-report.pdf.part   # in flight
//! ├── file-1767225600000-7-scan.png            # committed
//! └── logs.txt                                 # audit log
//! ```
//!
//! A request that fails part-way leaves nothing behind. Committed files are never modified or
//! deleted by the service; a second commit under an identical generated name would replace the
//! first (the rename is not guarded).

use crate::constants::{AUDIT_LOG_FILENAME, TEMP_FILE_SUFFIX};
use crate::filename::is_plain_file_name;
use crate::{UploadError, UploadResult};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// A committed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated filename (also the name reported to the client and the audit log)
    pub filename: String,

    /// Absolute or config-relative path of the stored file
    pub path: PathBuf,

    /// Size of the stored file in bytes
    pub size_bytes: u64,
}

/// Writes uploads into a single pre-existing directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
}

impl FileStore {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Start receiving an upload under `filename`.
    ///
    /// # Errors
    /// - [`UploadError::InvalidStoredName`] if `filename` is not a single plain path component
    /// - [`UploadError::Persistence`] if the temporary file cannot be created
    pub async fn begin(&self, filename: String) -> UploadResult<PendingFile> {
        if !is_plain_file_name(&filename) {
            return Err(UploadError::InvalidStoredName(filename));
        }

        let final_path = self.uploads_dir.join(&filename);
        let temp_path = self
            .uploads_dir
            .join(format!(".{filename}{TEMP_FILE_SUFFIX}"));
        let file = tokio::fs::File::create(&temp_path).await?;

        Ok(PendingFile {
            filename,
            final_path,
            temp_path,
            file,
            size_bytes: 0,
        })
    }

    /// List committed uploads, sorted by filename.
    ///
    /// The audit log and in-flight temporary files are skipped. A missing directory lists as
    /// empty.
    pub fn list(&self) -> UploadResult<Vec<StoredFile>> {
        let entries = match fs::read_dir(&self.uploads_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let Some(filename) = entry.file_name().to_str().map(str::to_owned) else {
                tracing::warn!("skipping non UTF-8 filename: {}", entry.path().display());
                continue;
            };
            if filename == AUDIT_LOG_FILENAME || is_temp_upload_name(&filename) {
                continue;
            }

            files.push(StoredFile {
                filename,
                path: entry.path(),
                size_bytes: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }
}

fn is_temp_upload_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_FILE_SUFFIX)
}

/// An upload being streamed to disk. Finish with [`PendingFile::commit`] or
/// [`PendingFile::abort`].
#[derive(Debug)]
pub struct PendingFile {
    filename: String,
    final_path: PathBuf,
    temp_path: PathBuf,
    file: tokio::fs::File,
    size_bytes: u64,
}

impl PendingFile {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Append a chunk of the upload body.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> UploadResult<()> {
        self.file.write_all(chunk).await?;
        self.size_bytes += chunk.len() as u64;
        Ok(())
    }

    /// Flush, sync and move the upload to its final name.
    ///
    /// On failure the temporary file is removed.
    pub async fn commit(self) -> UploadResult<StoredFile> {
        let PendingFile {
            filename,
            final_path,
            temp_path,
            file,
            size_bytes,
        } = self;

        if let Err(e) = finish(file, &temp_path, &final_path).await {
            remove_temp(&temp_path).await;
            return Err(e.into());
        }

        Ok(StoredFile {
            filename,
            path: final_path,
            size_bytes,
        })
    }

    /// Discard the upload and remove its temporary file.
    pub async fn abort(self) {
        drop(self.file);
        remove_temp(&self.temp_path).await;
    }
}

async fn finish(
    mut file: tokio::fs::File,
    temp_path: &Path,
    final_path: &Path,
) -> std::io::Result<()> {
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(temp_path, final_path).await
}

async fn remove_temp(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                "failed to remove temporary upload {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_commit_writes_identical_bytes() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        let binary_data: Vec<u8> = (0..=255).collect();
        let mut pending = store.begin("file-1-2-blob.bin".into()).await.unwrap();
        pending.write_chunk(&binary_data[..100]).await.unwrap();
        pending.write_chunk(&binary_data[100..]).await.unwrap();
        assert_eq!(pending.size_bytes(), 256);

        let stored = pending.commit().await.unwrap();

        assert_eq!(stored.filename, "file-1-2-blob.bin");
        assert_eq!(stored.size_bytes, 256);
        assert_eq!(fs::read(&stored.path).unwrap(), binary_data);
        assert_eq!(dir_names(temp.path()), vec!["file-1-2-blob.bin"]);
    }

    #[tokio::test]
    async fn test_pending_file_is_hidden_until_commit() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        let mut pending = store.begin("file-1-2-a.txt".into()).await.unwrap();
        pending.write_chunk(b"partial").await.unwrap();

        assert_eq!(dir_names(temp.path()), vec![".file-1-2-a.txt.part"]);
        assert!(store.list().unwrap().is_empty());

        pending.commit().await.unwrap();
        assert_eq!(dir_names(temp.path()), vec!["file-1-2-a.txt"]);
    }

    #[tokio::test]
    async fn test_abort_removes_temporary_file() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        let mut pending = store.begin("file-1-2-a.txt".into()).await.unwrap();
        pending.write_chunk(b"discard me").await.unwrap();
        pending.abort().await;

        assert!(dir_names(temp.path()).is_empty());
    }

    #[tokio::test]
    async fn test_begin_rejects_names_with_separators() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("uploads"));
        fs::create_dir_all(store.uploads_dir()).unwrap();

        let result = store.begin("file-1-2-../escape.txt".into()).await;

        assert!(matches!(result, Err(UploadError::InvalidStoredName(_))));
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_begin_fails_when_directory_is_missing() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("missing"));

        let result = store.begin("file-1-2-a.txt".into()).await;

        assert!(matches!(result, Err(UploadError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_empty_upload_is_stored() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path());

        let stored = store
            .begin("file-1-2-empty.txt".into())
            .await
            .unwrap()
            .commit()
            .await
            .unwrap();

        assert_eq!(stored.size_bytes, 0);
        assert!(fs::read(&stored.path).unwrap().is_empty());
    }

    #[test]
    fn test_list_skips_log_and_temp_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file-2-1-b.txt"), b"bb").unwrap();
        fs::write(temp.path().join("file-1-1-a.txt"), b"a").unwrap();
        fs::write(temp.path().join("logs.txt"), b"[...]\n").unwrap();
        fs::write(temp.path().join(".file-3-1-c.txt.part"), b"c").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        let files = FileStore::new(temp.path()).list().unwrap();
        let names: Vec<(&str, u64)> = files
            .iter()
            .map(|f| (f.filename.as_str(), f.size_bytes))
            .collect();

        assert_eq!(names, vec![("file-1-1-a.txt", 1), ("file-2-1-b.txt", 2)]);
    }

    #[test]
    fn test_list_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let files = FileStore::new(temp.path().join("absent")).list().unwrap();
        assert!(files.is_empty());
    }
}
