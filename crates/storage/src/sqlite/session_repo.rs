use chrono::{DateTime, Utc};
use planner_core::aggregator;
use planner_core::model::{SessionWithItem, StudyItemId, StudySession, StudySessionId};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{db_err, map_session_row, map_session_with_item_row, ser};
use crate::repository::{
    ProgressUpdate, SessionFilter, SessionWrite, StorageError, StudySessionRepository,
    affected_items,
};

pub(super) async fn insert_session_row(
    conn: &mut SqliteConnection,
    session: &StudySession,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO study_sessions (id, study_item_id, start_time, end_time, completed, notes, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
    )
    .bind(session.id().as_str())
    .bind(session.study_item_id().as_str())
    .bind(session.start_time())
    .bind(session.end_time())
    .bind(session.completed())
    .bind(session.notes())
    .bind(session.created_at())
    .bind(session.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn owner_of(
    conn: &mut SqliteConnection,
    id: &StudySessionId,
) -> Result<Option<String>, StorageError> {
    let row = sqlx::query("SELECT study_item_id FROM study_sessions WHERE id = ?1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    row.map(|r| r.try_get::<String, _>("study_item_id").map_err(ser))
        .transpose()
}

async fn sessions_of(
    conn: &mut SqliteConnection,
    item_id: &StudyItemId,
) -> Result<Vec<StudySession>, StorageError> {
    let rows = sqlx::query(
        r"
        SELECT id, study_item_id, start_time, end_time, completed, notes, created_at, updated_at
        FROM study_sessions
        WHERE study_item_id = ?1
        ORDER BY start_time ASC, id ASC
        ",
    )
    .bind(item_id.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(map_session_row(&row)?);
    }
    Ok(out)
}

async fn refresh_progress(
    conn: &mut SqliteConnection,
    item_id: &StudyItemId,
    now: DateTime<Utc>,
) -> Result<ProgressUpdate, StorageError> {
    let progress = aggregator::recompute(&sessions_of(conn, item_id).await?).ok();
    if let Some(progress) = progress {
        sqlx::query("UPDATE study_items SET progress = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(item_id.as_str())
            .bind(progress.value())
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
    }
    Ok(ProgressUpdate {
        study_item_id: item_id.clone(),
        progress,
    })
}

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn get_session(
        &self,
        id: &StudySessionId,
    ) -> Result<Option<SessionWithItem>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT s.id, s.study_item_id, s.start_time, s.end_time, s.completed, s.notes,
                   s.created_at, s.updated_at,
                   i.title AS item_title, i.priority AS item_priority
            FROM study_sessions s
            JOIN study_items i ON i.id = s.study_item_id
            WHERE s.id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_session_with_item_row).transpose()
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionWithItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT s.id, s.study_item_id, s.start_time, s.end_time, s.completed, s.notes,
                   s.created_at, s.updated_at,
                   i.title AS item_title, i.priority AS item_priority
            FROM study_sessions s
            JOIN study_items i ON i.id = s.study_item_id
            WHERE (?1 IS NULL OR s.study_item_id = ?1)
              AND (?2 IS NULL OR s.start_time >= ?2)
              AND (?3 IS NULL OR s.start_time < ?3)
            ORDER BY s.start_time ASC, s.id ASC
            ",
        )
        .bind(filter.study_item_id.as_ref().map(StudyItemId::as_str))
        .bind(filter.starts_from)
        .bind(filter.starts_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_with_item_row(&row)?);
        }
        Ok(out)
    }

    async fn sessions_for_item(
        &self,
        item_id: &StudyItemId,
    ) -> Result<Vec<StudySession>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        sessions_of(&mut conn, item_id).await
    }

    async fn apply_write(
        &self,
        write: SessionWrite<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressUpdate>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let affected = match write {
            SessionWrite::Insert(sessions) => {
                for session in sessions {
                    insert_session_row(&mut tx, session).await?;
                }
                affected_items(sessions)
            }
            SessionWrite::Update(session) => {
                let owner = owner_of(&mut tx, session.id())
                    .await?
                    .ok_or(StorageError::NotFound)?;
                if owner != session.study_item_id().as_str() {
                    return Err(StorageError::Conflict);
                }
                sqlx::query(
                    r"
                    UPDATE study_sessions SET
                        start_time = ?2,
                        end_time = ?3,
                        completed = ?4,
                        notes = ?5,
                        updated_at = ?6
                    WHERE id = ?1
                    ",
                )
                .bind(session.id().as_str())
                .bind(session.start_time())
                .bind(session.end_time())
                .bind(session.completed())
                .bind(session.notes())
                .bind(session.updated_at())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
                vec![session.study_item_id().clone()]
            }
            SessionWrite::Delete(id) => {
                let owner = owner_of(&mut tx, id).await?.ok_or(StorageError::NotFound)?;
                sqlx::query("DELETE FROM study_sessions WHERE id = ?1")
                    .bind(id.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
                vec![owner.parse::<StudyItemId>().map_err(ser)?]
            }
        };

        let mut updates = Vec::with_capacity(affected.len());
        for item_id in &affected {
            updates.push(refresh_progress(&mut tx, item_id, now).await?);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(updates)
    }
}
