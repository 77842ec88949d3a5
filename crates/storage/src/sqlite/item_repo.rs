use planner_core::model::{Progress, StudyItem, StudyItemId, StudySession};

use super::SqliteRepository;
use super::mapping::{db_err, map_item_row};
use super::session_repo::insert_session_row;
use crate::repository::{StorageError, StudyItemRepository};

#[async_trait::async_trait]
impl StudyItemRepository for SqliteRepository {
    async fn insert_item(
        &self,
        item: &StudyItem,
        sessions: &[StudySession],
    ) -> Result<(), StorageError> {
        if sessions.iter().any(|s| s.study_item_id() != item.id()) {
            return Err(StorageError::NotFound);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO study_items (id, title, description, priority, progress, due_date, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(item.id().as_str())
        .bind(item.title())
        .bind(item.description())
        .bind(item.priority().as_i64())
        .bind(item.progress().value())
        .bind(item.due_date())
        .bind(item.created_at())
        .bind(item.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for session in sessions {
            insert_session_row(&mut tx, session).await?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn update_item(
        &self,
        item: &StudyItem,
        progress: Option<Progress>,
    ) -> Result<StudyItem, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Progress changes only while the item has no sessions.
        let res = sqlx::query(
            r"
            UPDATE study_items SET
                title = ?2,
                description = ?3,
                priority = ?4,
                due_date = ?5,
                updated_at = ?6,
                progress = COALESCE(?7, progress)
            WHERE id = ?1
              AND (?7 IS NULL
                   OR NOT EXISTS (SELECT 1 FROM study_sessions WHERE study_item_id = ?1))
            ",
        )
        .bind(item.id().as_str())
        .bind(item.title())
        .bind(item.description())
        .bind(item.priority().as_i64())
        .bind(item.due_date())
        .bind(item.updated_at())
        .bind(progress.map(Progress::value))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let row = sqlx::query(
            r"
            SELECT id, title, description, priority, progress, due_date, created_at, updated_at
            FROM study_items WHERE id = ?1
            ",
        )
        .bind(item.id().as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound);
        };
        if res.rows_affected() == 0 {
            return Err(StorageError::DerivedProgress);
        }
        let stored = map_item_row(&row)?;
        tx.commit().await.map_err(db_err)?;
        Ok(stored)
    }

    async fn get_item(&self, id: &StudyItemId) -> Result<Option<StudyItem>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, priority, progress, due_date, created_at, updated_at
            FROM study_items WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_item_row).transpose()
    }

    async fn list_items(&self) -> Result<Vec<StudyItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, priority, progress, due_date, created_at, updated_at
            FROM study_items
            ORDER BY priority DESC, created_at DESC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(map_item_row(&row)?);
        }
        Ok(items)
    }

    async fn delete_item(&self, id: &StudyItemId) -> Result<(), StorageError> {
        // Sessions go with it through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM study_items WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
