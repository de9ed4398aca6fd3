//! End-to-end tests for the task core.
//!
//! These go through the public API the presentation layer uses: settings,
//! `start`, the state manager and its snapshot stream, and the JSON document
//! left on disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atividades_lib::core::settings::AppSettings;
use atividades_lib::start;
use atividades_lib::tasks::helpers::{now_ms, start_of_utc_day};
use atividades_lib::tasks::repository::{FileTaskRepository, TaskRepository};
use atividades_lib::tasks::state::TaskStateManager;
use atividades_lib::tasks::storage::TaskStore;
use atividades_lib::tasks::types::{Task, TaskDraft, TaskList, TaskStatus};
use tempfile::tempdir;

const DAY_MS: i64 = 86_400_000;

fn settings_in(dir: &Path) -> AppSettings {
    AppSettings {
        data_dir: Some(dir.to_path_buf()),
        ..AppSettings::default()
    }
}

fn today() -> i64 {
    start_of_utc_day(now_ms())
}

async fn wait_for<F>(manager: &TaskStateManager, predicate: F) -> TaskList
where
    F: Fn(&[Task]) -> bool,
{
    let mut rx = manager.subscribe();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|tasks| predicate(tasks.as_slice())),
    )
    .await
    .expect("snapshot did not reach expected state")
    .expect("snapshot channel closed");
    Arc::clone(&snapshot)
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

// =============================================================================
// Ordering scenario
// =============================================================================

#[tokio::test]
async fn test_completed_task_moves_after_later_deadline() {
    let temp = tempdir().unwrap();
    let app = start(&settings_in(temp.path())).await.unwrap();
    let d0 = today() + DAY_MS;

    let a = Task {
        id: "a".to_string(),
        title: "Buy milk".to_string(),
        description: None,
        status: TaskStatus::Pending,
        deadline: d0,
        image_uri: None,
    };
    let b = Task {
        id: "b".to_string(),
        title: "Pay bills".to_string(),
        deadline: d0 - DAY_MS,
        ..a.clone()
    };

    app.manager.insert_task(a).await.unwrap();
    app.manager.insert_task(b.clone()).await.unwrap();

    let snapshot = wait_for(&app.manager, |tasks| tasks.len() == 2).await;
    assert_eq!(ids(&snapshot), vec!["b", "a"]);

    app.manager
        .set_status(&b, TaskStatus::Completed)
        .await
        .unwrap();
    let snapshot = wait_for(&app.manager, |tasks| {
        tasks.last().map(|t| t.status) == Some(TaskStatus::Completed)
    })
    .await;
    assert_eq!(ids(&snapshot), vec!["a", "b"]);
}

// =============================================================================
// Expiry scenario
// =============================================================================

#[tokio::test]
async fn test_expiry_removes_pending_and_keeps_completed() {
    let temp = tempdir().unwrap();
    let store = TaskStore::open(temp.path().join("tasks.json"), None).await;
    let repository = FileTaskRepository::new(store.clone());
    let now = now_ms();
    let yesterday = today() - DAY_MS;

    let pending = TaskDraft::new("Expired errand")
        .deadline(yesterday)
        .into_task()
        .unwrap();
    repository.insert_task(pending).await.unwrap();
    repository.delete_expired_tasks(now).await.unwrap();
    assert!(store.current().is_empty());

    let completed = TaskDraft::new("Finished errand")
        .deadline(yesterday)
        .into_task()
        .unwrap()
        .with_status(TaskStatus::Completed);
    repository.insert_task(completed.clone()).await.unwrap();
    repository.delete_expired_tasks(now).await.unwrap();
    assert_eq!(store.current().as_slice(), &[completed]);
}

#[tokio::test]
async fn test_startup_cleanup_runs_against_existing_document() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path());

    let stale = TaskDraft::new("Old")
        .deadline(today() - 3 * DAY_MS)
        .into_task()
        .unwrap();
    let upcoming = TaskDraft::new("Upcoming")
        .deadline(today() + DAY_MS)
        .into_task()
        .unwrap();
    std::fs::write(
        settings.tasks_path(),
        serde_json::to_string(&vec![stale, upcoming.clone()]).unwrap(),
    )
    .unwrap();

    let app = start(&settings).await.unwrap();
    let snapshot = wait_for(&app.manager, |tasks| tasks.len() == 1).await;
    assert_eq!(snapshot.as_slice(), &[upcoming]);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_tasks_survive_restart() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path());

    let task = TaskDraft::new("Criar UI")
        .description("interface de maneira intuitiva")
        .deadline(today() + 2 * DAY_MS + 5_000)
        .image_uri("content://media/external/images/7")
        .into_task()
        .unwrap();

    {
        let app = start(&settings).await.unwrap();
        app.manager.insert_task(task.clone()).await.unwrap();
        wait_for(&app.manager, |tasks| tasks.len() == 1).await;
    }

    let app = start(&settings).await.unwrap();
    assert!(!app.is_watching());
    let snapshot = app.manager.snapshot();
    assert_eq!(snapshot.as_slice(), &[task.clone()]);
    assert_eq!(snapshot[0].deadline, today() + 2 * DAY_MS);
}

#[tokio::test]
async fn test_corrupt_document_starts_empty_and_heals() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path());
    std::fs::write(settings.tasks_path(), "this is not json").unwrap();

    let app = start(&settings).await.unwrap();
    assert!(app.manager.snapshot().is_empty());

    let task = TaskDraft::new("Fresh start")
        .deadline(today())
        .into_task()
        .unwrap();
    app.manager.insert_task(task.clone()).await.unwrap();

    let raw = std::fs::read_to_string(settings.tasks_path()).unwrap();
    let on_disk: Vec<Task> = serde_json::from_str(&raw).unwrap();
    assert_eq!(on_disk, vec![task]);
}

#[tokio::test]
async fn test_edit_form_keeps_identity() {
    let temp = tempdir().unwrap();
    let app = start(&settings_in(temp.path())).await.unwrap();

    let original = TaskDraft::new("Draft title")
        .deadline(today() + DAY_MS)
        .into_task()
        .unwrap();
    app.manager.insert_task(original.clone()).await.unwrap();

    let edited = original
        .edited(
            TaskDraft::new("Final title").description("with notes"),
            TaskStatus::InProgress,
        )
        .unwrap();
    app.manager.update_task(edited).await.unwrap();

    let snapshot = wait_for(&app.manager, |tasks| {
        tasks.len() == 1 && tasks[0].title == "Final title"
    })
    .await;
    assert_eq!(snapshot[0].id, original.id);
    assert_eq!(snapshot[0].deadline, original.deadline);
    assert_eq!(snapshot[0].status, TaskStatus::InProgress);
    assert_eq!(snapshot[0].description.as_deref(), Some("with notes"));
}
