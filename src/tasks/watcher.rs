//! File watcher for the task document.
//!
//! Watches the directory holding the task file and asks the store to reload
//! when the file is changed by another program. Our own writes reload to the
//! same content, so the store does not re-publish them.

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use tokio::runtime::Handle;

use super::storage::TaskStore;

const DEBOUNCE_DURATION_MS: u64 = 200;

pub struct TaskFileWatcher {
    debouncer: Debouncer<RecommendedWatcher>,
    watched_dir: PathBuf,
}

impl TaskFileWatcher {
    /// Starts watching the store's file. Must be called from within a tokio runtime.
    /// Reloads are spawned onto that runtime, so they only make progress while
    /// it is being driven.
    pub fn new(store: TaskStore) -> Result<Self, notify::Error> {
        let runtime = Handle::try_current().map_err(|e| notify::Error::generic(&e.to_string()))?;

        let task_file = store.path().to_path_buf();
        let watched_dir = task_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !watched_dir.exists() {
            std::fs::create_dir_all(&watched_dir).map_err(|e| {
                notify::Error::generic(&format!("Failed to create tasks directory: {}", e))
            })?;
        }

        let (tx, rx) = channel::<Result<Vec<DebouncedEvent>, notify::Error>>();
        let debouncer = new_debouncer(Duration::from_millis(DEBOUNCE_DURATION_MS), tx)?;

        std::thread::spawn(move || {
            handle_events(rx, store, task_file, runtime);
        });

        let mut watcher = Self {
            debouncer,
            watched_dir,
        };
        watcher.start()?;

        tracing::info!(
            target: "tasks::watcher",
            path = %watcher.watched_dir.display(),
            "File watcher started"
        );

        Ok(watcher)
    }

    fn start(&mut self) -> Result<(), notify::Error> {
        self.debouncer
            .watcher()
            .watch(&self.watched_dir, RecursiveMode::NonRecursive)
    }

    pub fn stop(&mut self) -> Result<(), notify::Error> {
        self.debouncer.watcher().unwatch(&self.watched_dir)?;
        tracing::info!(target: "tasks::watcher", "File watcher stopped");
        Ok(())
    }
}

/// Only the task document itself matters; temp files and neighbours are ignored.
fn is_task_file(event_path: &Path, task_file: &Path) -> bool {
    match (event_path.file_name(), task_file.file_name()) {
        (Some(event_name), Some(task_name)) => event_name == task_name,
        _ => false,
    }
}

fn handle_events(
    rx: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    store: TaskStore,
    task_file: PathBuf,
    runtime: Handle,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if !events.iter().any(|event| is_task_file(&event.path, &task_file)) {
                    continue;
                }

                tracing::debug!(
                    target: "tasks::watcher",
                    path = %task_file.display(),
                    "Task file change detected"
                );
                let store = store.clone();
                runtime.spawn(async move {
                    store.reload().await;
                });
            }
            Ok(Err(e)) => {
                tracing::error!(
                    target: "tasks::watcher",
                    error = %e,
                    "Watcher error"
                );
            }
            Err(_) => {
                // Debouncer dropped
                tracing::info!(
                    target: "tasks::watcher",
                    "Watcher channel closed, stopping event handler"
                );
                break;
            }
        }
    }
}
