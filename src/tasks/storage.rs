use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};

use super::types::{Task, TaskList};
use crate::shared::errors::StorageError;

/// Maximum number of attempts when re-reading a document that may be mid-write.
const MAX_PARSE_RETRIES: u32 = 3;
/// Backoff between parse retries in milliseconds (multiplied by the attempt number).
const PARSE_RETRY_BACKOFF_MS: u64 = 50;

/// Durable task collection backed by a single JSON document.
///
/// Every mutation goes through [`TaskStore::update`], which serializes
/// read-modify-write cycles behind one async mutex and only publishes a
/// collection to subscribers after it has been written to disk.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    write_timeout: Option<Duration>,
    writer: Mutex<()>,
    tx: watch::Sender<TaskList>,
}

enum Document {
    Loaded(Vec<Task>),
    Missing,
    Corrupt(serde_json::Error),
    Unreadable(std::io::Error),
}

impl TaskStore {
    /// Opens the document at `path`. A missing or corrupt file yields an empty store.
    pub async fn open(path: impl Into<PathBuf>, write_timeout: Option<Duration>) -> Self {
        let path = path.into();
        let tasks = match read_document(&path).await {
            Document::Loaded(tasks) => tasks,
            Document::Missing => Vec::new(),
            Document::Corrupt(e) => {
                tracing::warn!(
                    target: "tasks::storage",
                    path = %path.display(),
                    error = %e,
                    "Task file is corrupt, starting with an empty collection"
                );
                Vec::new()
            }
            Document::Unreadable(e) => {
                tracing::warn!(
                    target: "tasks::storage",
                    path = %path.display(),
                    error = %e,
                    "Task file is unreadable, starting with an empty collection"
                );
                Vec::new()
            }
        };

        tracing::info!(
            target: "tasks::storage",
            path = %path.display(),
            count = tasks.len(),
            "Task store opened"
        );

        let (tx, _rx) = watch::channel(Arc::new(tasks));
        Self {
            inner: Arc::new(StoreInner {
                path,
                write_timeout,
                writer: Mutex::new(()),
                tx,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Latest committed collection.
    pub fn current(&self) -> TaskList {
        Arc::clone(&self.inner.tx.borrow())
    }

    /// Subscribes to committed collections. The receiver starts at the latest value.
    pub fn observe(&self) -> watch::Receiver<TaskList> {
        self.inner.tx.subscribe()
    }

    /// Applies `transform` to the latest committed collection and persists the result.
    ///
    /// Updates never interleave. Once admitted, an update runs to completion even
    /// if the returned future is dropped. On error the durable document and the
    /// published collection are left untouched.
    pub async fn update<F>(&self, transform: F) -> Result<TaskList, StorageError>
    where
        F: FnOnce(Vec<Task>) -> Vec<Task> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.apply(transform).await })
            .await
            .map_err(|e| StorageError::aborted(e.to_string()))?
    }

    /// Re-reads the document from disk and publishes it if it differs from the
    /// committed collection. Returns true when a new collection was published.
    pub async fn reload(&self) -> bool {
        let inner = &self.inner;
        let _writer = inner.writer.lock().await;

        let tasks = read_with_retry(&inner.path).await;
        let current = Arc::clone(&inner.tx.borrow());
        if *current == tasks {
            tracing::trace!(
                target: "tasks::storage",
                path = %inner.path.display(),
                "Reload found no changes"
            );
            return false;
        }

        tracing::info!(
            target: "tasks::storage",
            path = %inner.path.display(),
            before = current.len(),
            after = tasks.len(),
            "Task file changed externally, reloaded"
        );
        inner.tx.send_replace(Arc::new(tasks));
        true
    }
}

impl StoreInner {
    async fn apply<F>(&self, transform: F) -> Result<TaskList, StorageError>
    where
        F: FnOnce(Vec<Task>) -> Vec<Task>,
    {
        let _writer = self.writer.lock().await;

        let current = Arc::clone(&self.tx.borrow());
        let next = transform(current.as_ref().clone());

        if next == *current {
            tracing::trace!(target: "tasks::storage", "Update produced no changes, skipping write");
            return Ok(current);
        }

        if let Err(e) = self.persist(&next).await {
            tracing::error!(
                target: "tasks::storage",
                path = %self.path.display(),
                error = %e,
                "Failed to persist task collection"
            );
            return Err(e);
        }

        let next: TaskList = Arc::new(next);
        self.tx.send_replace(Arc::clone(&next));

        tracing::debug!(
            target: "tasks::storage",
            count = next.len(),
            "Task collection committed"
        );
        Ok(next)
    }

    /// Writes to a sibling temp file, syncs it, then renames it over the document.
    async fn persist(&self, tasks: &[Task]) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(tasks)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::directory(format!("{}: {}", parent.display(), e))
            })?;
        }

        let temp = temp_path(&self.path);
        let write = write_synced(&temp, &content);
        let written = match self.write_timeout {
            Some(limit) => match tokio::time::timeout(limit, write).await {
                Ok(result) => result.map_err(StorageError::from),
                Err(_) => Err(StorageError::Timeout(limit)),
            },
            None => write.await.map_err(StorageError::from),
        };

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    Ok(())
}

/// Decodes a task document (a JSON array of tasks).
pub fn decode_tasks(bytes: &[u8]) -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

async fn read_document(path: &Path) -> Document {
    match tokio::fs::read(path).await {
        Ok(bytes) => match decode_tasks(&bytes) {
            Ok(tasks) => Document::Loaded(tasks),
            Err(e) => Document::Corrupt(e),
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::Missing,
        Err(e) => Document::Unreadable(e),
    }
}

/// Reads the document, retrying parse failures to ride out external writers
/// that are still flushing. Falls back to an empty collection.
async fn read_with_retry(path: &Path) -> Vec<Task> {
    for attempt in 0..MAX_PARSE_RETRIES {
        match read_document(path).await {
            Document::Loaded(tasks) => {
                if attempt > 0 {
                    tracing::debug!(
                        target: "tasks::storage",
                        attempt = attempt + 1,
                        "Loaded task file after retry"
                    );
                }
                return tasks;
            }
            Document::Missing => return Vec::new(),
            Document::Unreadable(e) => {
                tracing::warn!(
                    target: "tasks::storage",
                    path = %path.display(),
                    error = %e,
                    "Task file is unreadable, treating as empty"
                );
                return Vec::new();
            }
            Document::Corrupt(e) if attempt + 1 < MAX_PARSE_RETRIES => {
                tracing::debug!(
                    target: "tasks::storage",
                    attempt = attempt + 1,
                    error = %e,
                    "JSON parse failed, retrying..."
                );
                tokio::time::sleep(Duration::from_millis(
                    PARSE_RETRY_BACKOFF_MS * (attempt as u64 + 1),
                ))
                .await;
            }
            Document::Corrupt(e) => {
                tracing::warn!(
                    target: "tasks::storage",
                    path = %path.display(),
                    error = %e,
                    "Task file is corrupt, treating as empty"
                );
            }
        }
    }

    Vec::new()
}
