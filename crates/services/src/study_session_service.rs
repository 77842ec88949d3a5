use std::sync::Arc;

use chrono::{DateTime, Utc};
use planner_core::model::{
    Progress, SessionDraft, SessionWithItem, StudyItemId, StudySession, StudySessionId,
};
use storage::repository::{
    ProgressUpdate, SessionFilter, SessionWrite, StorageError, StudyItemRepository,
    StudySessionRepository,
};
use tracing::{debug, info};

use crate::error::StudySessionServiceError;
use crate::Clock;

/// Partial session update. `Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub completed: Option<bool>,
    pub notes: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SessionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed.is_none()
            && self.notes.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}

/// A freshly written session and its item's recomputed progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub session: SessionWithItem,
    pub item_progress: Option<Progress>,
}

fn progress_of(updates: &[ProgressUpdate], item_id: &StudyItemId) -> Option<Progress> {
    updates
        .iter()
        .find(|u| &u.study_item_id == item_id)
        .and_then(|u| u.progress)
}

/// Session CRUD that keeps every item's progress in step with its sessions.
#[derive(Clone)]
pub struct StudySessionService {
    clock: Clock,
    items: Arc<dyn StudyItemRepository>,
    sessions: Arc<dyn StudySessionRepository>,
}

impl StudySessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        items: Arc<dyn StudyItemRepository>,
        sessions: Arc<dyn StudySessionRepository>,
    ) -> Self {
        Self {
            clock,
            items,
            sessions,
        }
    }

    /// Sessions joined with their items, optionally for one item only.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::Storage` if repository access fails.
    pub async fn list_sessions(
        &self,
        item_id: Option<&StudyItemId>,
    ) -> Result<Vec<SessionWithItem>, StudySessionServiceError> {
        let filter = item_id
            .cloned()
            .map(SessionFilter::for_item)
            .unwrap_or_default();
        Ok(self.sessions.list_sessions(&filter).await?)
    }

    /// Sessions of an existing item, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::ItemNotFound` if the item does not exist.
    pub async fn sessions_for_item(
        &self,
        item_id: &StudyItemId,
    ) -> Result<Vec<StudySession>, StudySessionServiceError> {
        if self.items.get_item(item_id).await?.is_none() {
            return Err(StudySessionServiceError::ItemNotFound);
        }
        Ok(self.sessions.sessions_for_item(item_id).await?)
    }

    /// Fetch a session joined with its item.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NotFound` if the session does not exist.
    pub async fn get_session(
        &self,
        id: &StudySessionId,
    ) -> Result<SessionWithItem, StudySessionServiceError> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or(StudySessionServiceError::NotFound)
    }

    /// Add one session to an item.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::Session` when the end is not after
    /// the start, `StudySessionServiceError::ItemNotFound` if the item does
    /// not exist, or `StudySessionServiceError::Storage` on persistence failures.
    pub async fn create_session(
        &self,
        draft: SessionDraft,
    ) -> Result<SessionChange, StudySessionServiceError> {
        let now = self.clock.now();
        let session = draft.into_session(StudySessionId::generate(), now)?;
        let updates = self.write(SessionWrite::Insert(std::slice::from_ref(&session)), now).await?;
        info!(
            session_id = %session.id(),
            item_id = %session.study_item_id(),
            "created study session"
        );
        self.change(session.id(), progress_of(&updates, session.study_item_id()))
            .await
    }

    /// Add a batch of sessions, possibly for several items, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::EmptyBatch` for an empty batch,
    /// `StudySessionServiceError::Session` for an invalid time range,
    /// `StudySessionServiceError::ItemNotFound` if any owning item is missing,
    /// or `StudySessionServiceError::Storage` on persistence failures.
    pub async fn create_sessions(
        &self,
        drafts: Vec<SessionDraft>,
    ) -> Result<Vec<StudySession>, StudySessionServiceError> {
        if drafts.is_empty() {
            return Err(StudySessionServiceError::EmptyBatch);
        }
        let now = self.clock.now();
        let sessions = drafts
            .into_iter()
            .map(|draft| draft.into_session(StudySessionId::generate(), now))
            .collect::<Result<Vec<_>, _>>()?;

        let updates = self.write(SessionWrite::Insert(&sessions), now).await?;
        info!(
            sessions = sessions.len(),
            items = updates.len(),
            "created study sessions in bulk"
        );
        Ok(sessions)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NoChanges` for an empty patch,
    /// `StudySessionServiceError::NotFound` if the session does not exist,
    /// `StudySessionServiceError::Session` when the resulting time range is
    /// invalid, or `StudySessionServiceError::Storage` on persistence failures.
    pub async fn update_session(
        &self,
        id: &StudySessionId,
        patch: SessionPatch,
    ) -> Result<SessionChange, StudySessionServiceError> {
        if patch.is_empty() {
            return Err(StudySessionServiceError::NoChanges);
        }
        let mut session = self.get_session(id).await?.session;
        let now = self.clock.now();

        if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.unwrap_or(session.start_time());
            let end = patch.end_time.unwrap_or(session.end_time());
            session.reschedule(start, end, now)?;
        }
        if let Some(notes) = patch.notes {
            session.set_notes(notes, now);
        }
        if let Some(completed) = patch.completed {
            if completed != session.completed() {
                info!(session_id = %id, completed, "session completion changed");
            }
            session.set_completed(completed, now);
        }

        let updates = self.write(SessionWrite::Update(&session), now).await?;
        self.change(id, progress_of(&updates, session.study_item_id()))
            .await
    }

    /// Delete a session. Returns the owning item's recomputed progress, or
    /// `None` when the item has no sessions left.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NotFound` if the session does not exist.
    pub async fn delete_session(
        &self,
        id: &StudySessionId,
    ) -> Result<Option<Progress>, StudySessionServiceError> {
        let now = self.clock.now();
        let updates = self.write(SessionWrite::Delete(id), now).await?;
        info!(session_id = %id, "deleted study session");
        Ok(updates.first().and_then(|u| u.progress))
    }

    /// Delete a session through its owning item.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NotFound` if the session does not
    /// exist or belongs to another item.
    pub async fn delete_item_session(
        &self,
        item_id: &StudyItemId,
        id: &StudySessionId,
    ) -> Result<Option<Progress>, StudySessionServiceError> {
        let existing = self.get_session(id).await?;
        if existing.session.study_item_id() != item_id {
            return Err(StudySessionServiceError::NotFound);
        }
        self.delete_session(id).await
    }

    async fn write(
        &self,
        write: SessionWrite<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressUpdate>, StudySessionServiceError> {
        let missing = match write {
            SessionWrite::Insert(_) => StudySessionServiceError::ItemNotFound,
            SessionWrite::Update(_) | SessionWrite::Delete(_) => StudySessionServiceError::NotFound,
        };
        let updates = self.sessions.apply_write(write, now).await.map_err(|e| match e {
            StorageError::NotFound => missing,
            other => StudySessionServiceError::Storage(other),
        })?;
        for update in &updates {
            debug!(
                item_id = %update.study_item_id,
                progress = update.progress.map(Progress::value),
                "recomputed item progress"
            );
        }
        Ok(updates)
    }

    async fn change(
        &self,
        id: &StudySessionId,
        item_progress: Option<Progress>,
    ) -> Result<SessionChange, StudySessionServiceError> {
        Ok(SessionChange {
            session: self.get_session(id).await?,
            item_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use planner_core::model::{Priority, StudyItem, StudySessionError};
    use planner_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn setup() -> (StudySessionService, StudyItem) {
        let repo = InMemoryRepository::new();
        let item = StudyItem::new(
            StudyItemId::generate(),
            "Japanese",
            None,
            Priority::High,
            None,
            fixed_now(),
        )
        .unwrap();
        repo.insert_item(&item, &[]).await.unwrap();
        let service = StudySessionService::new(
            Clock::Fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        (service, item)
    }

    fn draft(item: &StudyItem, day: i64) -> SessionDraft {
        let start = fixed_now() + Duration::days(day);
        SessionDraft {
            study_item_id: item.id().clone(),
            start_time: start,
            end_time: start + Duration::hours(1),
            completed: false,
            notes: None,
        }
    }

    #[tokio::test]
    async fn completing_sessions_updates_item_progress() {
        let (service, item) = setup().await;
        let sessions = service
            .create_sessions((0..4).map(|d| draft(&item, d)).collect())
            .await
            .unwrap();

        let change = service
            .update_session(
                sessions[0].id(),
                SessionPatch {
                    completed: Some(true),
                    ..SessionPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(change.session.session.completed());
        assert_eq!(change.session.item_title, "Japanese");
        assert_eq!(change.item_progress, Some(Progress::new(0.25).unwrap()));

        let remaining = service.delete_session(sessions[1].id()).await.unwrap();
        let expected = Progress::ratio(1, 3).unwrap();
        assert_eq!(remaining, Some(expected));
    }

    #[tokio::test]
    async fn empty_patch_and_empty_batch_are_rejected() {
        let (service, item) = setup().await;
        let change = service.create_session(draft(&item, 0)).await.unwrap();
        assert!(matches!(
            service
                .update_session(change.session.session.id(), SessionPatch::default())
                .await,
            Err(StudySessionServiceError::NoChanges)
        ));
        assert!(matches!(
            service.create_sessions(Vec::new()).await,
            Err(StudySessionServiceError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn invalid_reschedule_leaves_session_untouched() {
        let (service, item) = setup().await;
        let change = service.create_session(draft(&item, 0)).await.unwrap();
        let id = change.session.session.id().clone();

        let err = service
            .update_session(
                &id,
                SessionPatch {
                    end_time: Some(change.session.session.start_time()),
                    ..SessionPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StudySessionServiceError::Session(StudySessionError::InvalidTimeRange)
        ));
        assert_eq!(service.get_session(&id).await.unwrap(), change.session);
    }

    #[tokio::test]
    async fn sessions_for_unknown_item_are_rejected() {
        let (service, item) = setup().await;
        let mut stray = draft(&item, 0);
        stray.study_item_id = StudyItemId::generate();
        assert!(matches!(
            service.create_session(stray).await,
            Err(StudySessionServiceError::ItemNotFound)
        ));
        assert!(matches!(
            service.sessions_for_item(&StudyItemId::generate()).await,
            Err(StudySessionServiceError::ItemNotFound)
        ));
    }

    #[tokio::test]
    async fn item_scoped_delete_checks_ownership() {
        let (service, item) = setup().await;
        let change = service.create_session(draft(&item, 0)).await.unwrap();
        let id = change.session.session.id().clone();

        assert!(matches!(
            service
                .delete_item_session(&StudyItemId::generate(), &id)
                .await,
            Err(StudySessionServiceError::NotFound)
        ));
        assert_eq!(
            service.delete_item_session(item.id(), &id).await.unwrap(),
            None
        );
    }
}
