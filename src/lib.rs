pub mod core;
pub mod shared;
pub mod tasks;

use std::sync::Arc;

use crate::core::logging::{init_logging, LoggingGuards};
use crate::core::settings::{load_settings, AppSettings};
use crate::shared::errors::{StartupError, StorageError};
use crate::shared::paths::ensure_dir;
use crate::tasks::repository::FileTaskRepository;
use crate::tasks::state::TaskStateManager;
use crate::tasks::storage::TaskStore;
use crate::tasks::watcher::TaskFileWatcher;

/// The wired task core: store, state manager and optional file watcher.
pub struct TaskApp {
    pub manager: TaskStateManager,
    pub store: TaskStore,
    watcher: Option<TaskFileWatcher>,
}

impl TaskApp {
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

/// Opens the task document described by `settings` and builds the state manager.
/// Must be called from within a tokio runtime.
pub async fn start(settings: &AppSettings) -> Result<TaskApp, StartupError> {
    let data_dir = settings.data_dir();
    ensure_dir(&data_dir)
        .map_err(|e| StorageError::directory(format!("{}: {}", data_dir.display(), e)))?;

    let store = TaskStore::open(settings.tasks_path(), settings.write_timeout()).await;
    let repository = Arc::new(FileTaskRepository::new(store.clone()));
    let manager = TaskStateManager::new(repository);

    let watcher = if settings.watch_external_changes {
        Some(TaskFileWatcher::new(store.clone())?)
    } else {
        None
    };

    tracing::info!(
        target: "tasks",
        path = %store.path().display(),
        tasks = store.current().len(),
        watching = watcher.is_some(),
        "Task core started"
    );

    Ok(TaskApp {
        manager,
        store,
        watcher,
    })
}

/// Loads settings, initializes logging and starts the task core.
/// Keep the returned guards alive for as long as logs should be written.
pub async fn bootstrap() -> Result<(TaskApp, LoggingGuards), StartupError> {
    let settings = load_settings();
    let guards = init_logging(&settings.log_dir(), &settings.log_level)?;
    let app = start(&settings).await?;
    Ok((app, guards))
}
