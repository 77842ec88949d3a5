use chrono::{DateTime, NaiveDate, Utc};
use planner_core::model::{
    Priority, Progress, SessionWithItem, StudyItem, StudyItemId, StudySession, StudySessionId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classify a driver error: key collisions are conflicts, dangling foreign
/// keys mean the parent row is missing.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn priority_from_i64(v: i64) -> Result<Priority, StorageError> {
    Priority::try_from(v).map_err(ser)
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<StudyItem, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let progress = Progress::new(row.try_get::<f64, _>("progress").map_err(ser)?).map_err(ser)?;
    let due_date: Option<NaiveDate> = row.try_get("due_date").map_err(ser)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

    StudyItem::from_persisted(
        id.parse::<StudyItemId>().map_err(ser)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        priority_from_i64(row.try_get("priority").map_err(ser)?)?,
        progress,
        due_date,
        created_at,
        updated_at,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<StudySession, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let item_id: String = row.try_get("study_item_id").map_err(ser)?;

    StudySession::from_persisted(
        id.parse::<StudySessionId>().map_err(ser)?,
        item_id.parse::<StudyItemId>().map_err(ser)?,
        row.try_get("start_time").map_err(ser)?,
        row.try_get("end_time").map_err(ser)?,
        row.try_get("completed").map_err(ser)?,
        row.try_get("notes").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Rows from a session query joined with `study_items`, which must alias the
/// item columns as `item_title` and `item_priority`.
pub(crate) fn map_session_with_item_row(row: &SqliteRow) -> Result<SessionWithItem, StorageError> {
    Ok(SessionWithItem {
        session: map_session_row(row)?,
        item_title: row.try_get("item_title").map_err(ser)?,
        item_priority: priority_from_i64(row.try_get("item_priority").map_err(ser)?)?,
    })
}
