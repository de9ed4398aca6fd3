//! UI-facing task state.
//!
//! [`TaskStateManager`] holds the sorted snapshot the presentation layer
//! renders. It never edits the snapshot itself: every mutation is forwarded to
//! the repository and the snapshot refreshes when the store re-emits.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::helpers::{find_task, now_ms};
use super::repository::TaskRepository;
use super::types::{StatusCounts, StatusFilter, Task, TaskList, TaskStatus};
use super::TaskError;

/// Orders tasks for display: deadline ascending, completed tasks last.
/// Both passes are stable, so ties keep their stored order.
pub fn sort_for_display(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| task.deadline);
    sorted.sort_by_key(|task| task.status.is_completed());
    sorted
}

pub struct TaskStateManager {
    repository: Arc<dyn TaskRepository>,
    snapshot: watch::Receiver<TaskList>,
    sync: JoinHandle<()>,
}

impl TaskStateManager {
    /// Builds the manager and clears tasks that expired before now.
    /// Must be called from within a tokio runtime.
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self::starting_at(repository, now_ms())
    }

    /// Like [`TaskStateManager::new`] with an explicit startup time for expiry.
    pub fn starting_at(repository: Arc<dyn TaskRepository>, now_ms: i64) -> Self {
        let cleanup = Arc::clone(&repository);
        tokio::spawn(async move {
            if let Err(e) = cleanup.delete_expired_tasks(now_ms).await {
                tracing::error!(
                    target: "tasks::state",
                    error = %e,
                    "Startup expiry cleanup failed"
                );
            }
        });

        let mut source = repository.get_tasks();
        let initial = Arc::new(sort_for_display(&source.borrow_and_update()));
        let (tx, snapshot) = watch::channel(initial);

        let sync = tokio::spawn(async move {
            while source.changed().await.is_ok() {
                let sorted = sort_for_display(&source.borrow_and_update());
                tracing::trace!(
                    target: "tasks::state",
                    count = sorted.len(),
                    "Snapshot refreshed"
                );
                tx.send_replace(Arc::new(sorted));
            }
            tracing::debug!(target: "tasks::state", "Task source closed, snapshot frozen");
        });

        Self {
            repository,
            snapshot,
            sync,
        }
    }

    /// Current sorted snapshot.
    pub fn snapshot(&self) -> TaskList {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Receiver of sorted snapshots, starting at the current one.
    pub fn subscribe(&self) -> watch::Receiver<TaskList> {
        self.snapshot.clone()
    }

    pub fn find(&self, id: &str) -> Option<Task> {
        find_task(&self.snapshot.borrow(), id).cloned()
    }

    pub fn filtered(&self, filter: StatusFilter) -> Vec<Task> {
        self.snapshot
            .borrow()
            .iter()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_tasks(&self.snapshot.borrow())
    }

    pub async fn insert_task(&self, task: Task) -> Result<(), TaskError> {
        task.validate()?;
        tracing::debug!(target: "tasks::state", task_id = %task.id, "Inserting task");
        self.repository.insert_task(task).await?;
        Ok(())
    }

    pub async fn update_task(&self, task: Task) -> Result<(), TaskError> {
        task.validate()?;
        tracing::debug!(target: "tasks::state", task_id = %task.id, "Updating task");
        self.repository.update_task(task).await?;
        Ok(())
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), TaskError> {
        tracing::debug!(target: "tasks::state", task_id = %id, "Deleting task");
        self.repository.delete_task(id).await?;
        Ok(())
    }

    /// Updates only the status of `task`.
    pub async fn set_status(&self, task: &Task, status: TaskStatus) -> Result<(), TaskError> {
        self.update_task(task.with_status(status)).await
    }

    pub async fn clear_expired_tasks(&self, now_ms: i64) -> Result<(), TaskError> {
        self.repository.delete_expired_tasks(now_ms).await?;
        Ok(())
    }
}

impl Drop for TaskStateManager {
    fn drop(&mut self) {
        self.sync.abort();
    }
}
