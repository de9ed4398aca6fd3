use async_trait::async_trait;
use tokio::sync::watch;

use super::helpers::find_task_mut;
use super::storage::TaskStore;
use super::types::{Task, TaskList};
use crate::shared::errors::StorageError;

/// Domain-level operations over the task collection.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stream of committed collections, starting at the latest one.
    fn get_tasks(&self) -> watch::Receiver<TaskList>;

    async fn insert_task(&self, task: Task) -> Result<(), StorageError>;

    /// Replaces the task with the same id. Unknown ids leave the collection unchanged.
    async fn update_task(&self, task: Task) -> Result<(), StorageError>;

    /// Removes the task with this id. Unknown ids are a no-op.
    async fn delete_task(&self, id: &str) -> Result<(), StorageError>;

    /// Removes every non-completed task whose deadline's UTC day is before `now_ms`'s.
    async fn delete_expired_tasks(&self, now_ms: i64) -> Result<(), StorageError>;
}

/// Repository persisting to a [`TaskStore`] document.
#[derive(Clone)]
pub struct FileTaskRepository {
    store: TaskStore,
}

impl FileTaskRepository {
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }
}

#[async_trait]
impl TaskRepository for FileTaskRepository {
    fn get_tasks(&self) -> watch::Receiver<TaskList> {
        self.store.observe()
    }

    async fn insert_task(&self, task: Task) -> Result<(), StorageError> {
        self.store
            .update(move |mut tasks| {
                if let Some(existing) = find_task_mut(&mut tasks, &task.id) {
                    tracing::warn!(
                        target: "tasks::repository",
                        task_id = %task.id,
                        "Insert with an existing id, replacing the stored task"
                    );
                    *existing = task;
                } else {
                    tasks.push(task);
                }
                tasks
            })
            .await?;
        Ok(())
    }

    async fn update_task(&self, task: Task) -> Result<(), StorageError> {
        self.store
            .update(move |mut tasks| {
                match find_task_mut(&mut tasks, &task.id) {
                    Some(existing) => *existing = task,
                    None => tracing::debug!(
                        target: "tasks::repository",
                        task_id = %task.id,
                        "Update ignored, task not found"
                    ),
                }
                tasks
            })
            .await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.store
            .update(move |mut tasks| {
                let before = tasks.len();
                tasks.retain(|task| task.id != id);
                if tasks.len() == before {
                    tracing::debug!(
                        target: "tasks::repository",
                        task_id = %id,
                        "Delete ignored, task not found"
                    );
                }
                tasks
            })
            .await?;
        Ok(())
    }

    async fn delete_expired_tasks(&self, now_ms: i64) -> Result<(), StorageError> {
        self.store
            .update(move |mut tasks| {
                let before = tasks.len();
                tasks.retain(|task| !task.is_expired_at(now_ms));
                let removed = before - tasks.len();
                if removed > 0 {
                    tracing::info!(
                        target: "tasks::repository",
                        removed = removed,
                        "Removed expired tasks"
                    );
                }
                tasks
            })
            .await?;
        Ok(())
    }
}
