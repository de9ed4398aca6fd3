use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::helpers::{start_of_utc_day, utc_day};

/// Shared, immutable view of a committed task collection.
pub type TaskList = Arc<Vec<Task>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Display label shown next to the status chip.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pendente",
            TaskStatus::InProgress => "Em andamento",
            TaskStatus::Completed => "Concluído",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Epoch milliseconds at the start of a UTC day.
    pub deadline: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

impl Task {
    /// Checks the invariants every stored task must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// True when the task is not completed and its deadline's UTC day is
    /// strictly before the UTC day of `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        !self.status.is_completed() && utc_day(self.deadline) < utc_day(now_ms)
    }

    pub fn with_status(&self, status: TaskStatus) -> Task {
        Task {
            status,
            ..self.clone()
        }
    }

    /// Applies an edit form to this task, keeping its id.
    /// A draft without a deadline keeps the current one.
    pub fn edited(&self, draft: TaskDraft, status: TaskStatus) -> Result<Task, ValidationError> {
        let title = normalize_title(&draft.title)?;
        let deadline = draft
            .deadline
            .map(start_of_utc_day)
            .unwrap_or(self.deadline);

        Ok(Task {
            id: self.id.clone(),
            title,
            description: normalize_description(draft.description.as_deref()),
            status,
            deadline,
            image_uri: draft.image_uri,
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Task deadline is required")]
    MissingDeadline,
}

/// Raw values collected by the add/edit forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<i64>,
    pub image_uri: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn deadline(mut self, deadline_ms: i64) -> Self {
        self.deadline = Some(deadline_ms);
        self
    }

    pub fn image_uri(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }

    /// Builds a fresh pending task with a new id.
    pub fn into_task(self) -> Result<Task, ValidationError> {
        let title = normalize_title(&self.title)?;
        let deadline = self.deadline.ok_or(ValidationError::MissingDeadline)?;

        Ok(Task {
            id: Uuid::new_v4().to_string(),
            title,
            description: normalize_description(self.description.as_deref()),
            status: TaskStatus::Pending,
            deadline: start_of_utc_day(deadline),
            image_uri: self.image_uri,
        })
    }
}

fn normalize_title(title: &str) -> Result<String, ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// View-level filter matching the home screen tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => task.status == *status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut counts, task| {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }
}
