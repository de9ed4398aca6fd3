use chrono::{DateTime, NaiveDate, Utc};

use super::types::Task;

const DAY_MS: i64 = 86_400_000;

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// UTC calendar day containing `ms`.
pub fn utc_day(ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Truncates `ms` to 00:00:00.000 UTC of the same day. Saturates at `i64::MIN`.
pub fn start_of_utc_day(ms: i64) -> i64 {
    ms.saturating_sub(ms.rem_euclid(DAY_MS))
}

/// Formats a deadline the way the task list shows it (`dd/MM/yyyy`, UTC).
pub fn format_deadline(ms: i64) -> String {
    utc_day(ms).format("%d/%m/%Y").to_string()
}

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|task| task.id == id)
}

pub fn find_task_mut<'a>(tasks: &'a mut [Task], id: &str) -> Option<&'a mut Task> {
    tasks.iter_mut().find(|task| task.id == id)
}
