//! File-backed object store and snapshot table.
//!
//! Objects are written below a root directory using their key as a relative
//! path. Table rows are appended to a JSON-lines file.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use weather_core::error::{Result, WeatherError};
use weather_core::traits::{ObjectStore, SnapshotTable};
use weather_core::types::SnapshotRecord;

/// Object store rooted at a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never observes a half-written object.
#[derive(Clone, Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to a path inside the root, rejecting escapes.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(WeatherError::StorageError(format!("invalid object key: {:?}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    #[instrument(skip(self, body))]
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        debug!(path = ?path, bytes = body.len(), "Stored object");
        Ok(())
    }
}

/// Snapshot table persisted as JSON lines.
///
/// Rows are only appended; a later row for the same city and hour bucket
/// supersedes earlier ones when read back with [`Self::load`].
#[derive(Debug)]
pub struct FileSnapshotTable {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSnapshotTable {
    /// Creates a table backed by the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every row, keeping the latest per `(city, timestamp)`.
    pub async fn load(&self) -> Result<Vec<SnapshotRecord>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows: Vec<SnapshotRecord> = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let record: SnapshotRecord = serde_json::from_str(line)?;
            rows.retain(|r| !(r.city == record.city && r.timestamp == record.timestamp));
            rows.push(record);
        }
        Ok(rows)
    }
}

#[async_trait]
impl SnapshotTable for FileSnapshotTable {
    #[instrument(skip(self, record), fields(city = %record.city))]
    async fn put_item(&self, record: SnapshotRecord) -> Result<()> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!("Appended snapshot row");
        Ok(())
    }
}
