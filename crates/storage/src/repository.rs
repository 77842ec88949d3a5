use async_trait::async_trait;
use chrono::{DateTime, Utc};
use planner_core::aggregator;
use planner_core::model::{
    Progress, SessionWithItem, StudyItem, StudyItemId, StudySession, StudySessionId,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("progress is derived from the item's sessions")]
    DerivedProgress,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Narrowing options for session listings. Empty filter returns everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub study_item_id: Option<StudyItemId>,
    /// Inclusive lower bound on `start_time`.
    pub starts_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `start_time`.
    pub starts_before: Option<DateTime<Utc>>,
}

impl SessionFilter {
    #[must_use]
    pub fn for_item(id: StudyItemId) -> Self {
        Self {
            study_item_id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn starting_between(from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        Self {
            study_item_id: None,
            starts_from: Some(from),
            starts_before: Some(before),
        }
    }

    #[must_use]
    pub fn matches(&self, session: &StudySession) -> bool {
        self.study_item_id
            .as_ref()
            .is_none_or(|id| session.study_item_id() == id)
            && self.starts_from.is_none_or(|from| session.start_time() >= from)
            && self
                .starts_before
                .is_none_or(|before| session.start_time() < before)
    }
}

/// A session mutation that may change the owning items' progress.
#[derive(Debug, Clone, Copy)]
pub enum SessionWrite<'a> {
    Insert(&'a [StudySession]),
    Update(&'a StudySession),
    Delete(&'a StudySessionId),
}

/// Progress stored for an item after a session write.
///
/// `progress` is `None` when the item has no sessions left, in which case the
/// stored value was left as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub study_item_id: StudyItemId,
    pub progress: Option<Progress>,
}

/// Repository contract for study items.
#[async_trait]
pub trait StudyItemRepository: Send + Sync {
    /// Persist a new item together with its initial sessions, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the item or a session ID already
    /// exists, or other storage errors.
    async fn insert_item(
        &self,
        item: &StudyItem,
        sessions: &[StudySession],
    ) -> Result<(), StorageError>;

    /// Overwrite an item's details and return the stored row.
    ///
    /// Stored progress is only replaced when `progress` is given, and only
    /// while the item has no sessions; otherwise the current value is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist and
    /// `StorageError::DerivedProgress` if `progress` is given for an item
    /// that has sessions.
    async fn update_item(
        &self,
        item: &StudyItem,
        progress: Option<Progress>,
    ) -> Result<StudyItem, StorageError>;

    /// Fetch an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing item is `Ok(None)`.
    async fn get_item(&self, id: &StudyItemId) -> Result<Option<StudyItem>, StorageError>;

    /// All items, highest priority first, newest first within a priority.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_items(&self) -> Result<Vec<StudyItem>, StorageError>;

    /// Delete an item and all of its sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the item does not exist.
    async fn delete_item(&self, id: &StudyItemId) -> Result<(), StorageError>;
}

/// Repository contract for study sessions.
#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// Fetch a session joined with its item.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing session is `Ok(None)`.
    async fn get_session(
        &self,
        id: &StudySessionId,
    ) -> Result<Option<SessionWithItem>, StorageError>;

    /// Sessions matching `filter`, ordered by start time ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionWithItem>, StorageError>;

    /// Every session of one item, ordered by start time ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn sessions_for_item(
        &self,
        item_id: &StudyItemId,
    ) -> Result<Vec<StudySession>, StorageError>;

    /// Apply a session write and re-derive the progress of every affected
    /// item in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the owning item (insert) or the
    /// session (update/delete) is missing, `StorageError::Conflict` on
    /// duplicate IDs, or other storage errors. Nothing is written on error.
    async fn apply_write(
        &self,
        write: SessionWrite<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressUpdate>, StorageError>;
}

/// Unique item IDs touched by a batch of sessions, in stable order.
pub(crate) fn affected_items(sessions: &[StudySession]) -> Vec<StudyItemId> {
    sessions
        .iter()
        .map(|s| s.study_item_id().clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sort items the way every listing returns them.
pub(crate) fn sort_items(items: &mut [StudyItem]) {
    items.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| b.created_at().cmp(&a.created_at()))
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[derive(Default)]
struct MemoryState {
    items: HashMap<StudyItemId, StudyItem>,
    sessions: HashMap<StudySessionId, StudySession>,
}

impl MemoryState {
    fn sessions_of(&self, item_id: &StudyItemId) -> Vec<StudySession> {
        let mut out: Vec<StudySession> = self
            .sessions
            .values()
            .filter(|s| s.study_item_id() == item_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.start_time(), s.id().clone()));
        out
    }

    fn join(&self, session: &StudySession) -> Result<SessionWithItem, StorageError> {
        let item = self
            .items
            .get(session.study_item_id())
            .ok_or_else(|| StorageError::Serialization("session without item".into()))?;
        Ok(SessionWithItem {
            session: session.clone(),
            item_title: item.title().to_owned(),
            item_priority: item.priority(),
        })
    }

    fn refresh_progress(&mut self, item_id: &StudyItemId, now: DateTime<Utc>) -> ProgressUpdate {
        let progress = aggregator::recompute(&self.sessions_of(item_id)).ok();
        if let (Some(progress), Some(item)) = (progress, self.items.get_mut(item_id)) {
            item.set_progress(progress, now);
        }
        ProgressUpdate {
            study_item_id: item_id.clone(),
            progress,
        }
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl StudyItemRepository for InMemoryRepository {
    async fn insert_item(
        &self,
        item: &StudyItem,
        sessions: &[StudySession],
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.items.contains_key(item.id()) {
            return Err(StorageError::Conflict);
        }
        let mut seen = BTreeSet::new();
        for session in sessions {
            if session.study_item_id() != item.id() {
                return Err(StorageError::NotFound);
            }
            if guard.sessions.contains_key(session.id()) || !seen.insert(session.id()) {
                return Err(StorageError::Conflict);
            }
        }
        guard.items.insert(item.id().clone(), item.clone());
        for session in sessions {
            guard.sessions.insert(session.id().clone(), session.clone());
        }
        Ok(())
    }

    async fn update_item(
        &self,
        item: &StudyItem,
        progress: Option<Progress>,
    ) -> Result<StudyItem, StorageError> {
        let mut guard = self.lock()?;
        let has_sessions = guard
            .sessions
            .values()
            .any(|s| s.study_item_id() == item.id());
        let Some(existing) = guard.items.get_mut(item.id()) else {
            return Err(StorageError::NotFound);
        };
        if progress.is_some() && has_sessions {
            return Err(StorageError::DerivedProgress);
        }

        let mut updated = item.clone();
        updated.set_progress(progress.unwrap_or(existing.progress()), item.updated_at());
        *existing = updated.clone();
        Ok(updated)
    }

    async fn get_item(&self, id: &StudyItemId) -> Result<Option<StudyItem>, StorageError> {
        Ok(self.lock()?.items.get(id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<StudyItem>, StorageError> {
        let mut items: Vec<StudyItem> = self.lock()?.items.values().cloned().collect();
        sort_items(&mut items);
        Ok(items)
    }

    async fn delete_item(&self, id: &StudyItemId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.items.remove(id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.sessions.retain(|_, s| s.study_item_id() != id);
        Ok(())
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn get_session(
        &self,
        id: &StudySessionId,
    ) -> Result<Option<SessionWithItem>, StorageError> {
        let guard = self.lock()?;
        guard
            .sessions
            .get(id)
            .map(|session| guard.join(session))
            .transpose()
    }

    async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionWithItem>, StorageError> {
        let guard = self.lock()?;
        let mut matching: Vec<&StudySession> =
            guard.sessions.values().filter(|s| filter.matches(s)).collect();
        matching.sort_by_key(|s| (s.start_time(), s.id().clone()));
        matching.into_iter().map(|s| guard.join(s)).collect()
    }

    async fn sessions_for_item(
        &self,
        item_id: &StudyItemId,
    ) -> Result<Vec<StudySession>, StorageError> {
        Ok(self.lock()?.sessions_of(item_id))
    }

    async fn apply_write(
        &self,
        write: SessionWrite<'_>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProgressUpdate>, StorageError> {
        let mut guard = self.lock()?;
        let affected = match write {
            SessionWrite::Insert(sessions) => {
                let mut seen = BTreeSet::new();
                for session in sessions {
                    if !guard.items.contains_key(session.study_item_id()) {
                        return Err(StorageError::NotFound);
                    }
                    if guard.sessions.contains_key(session.id()) || !seen.insert(session.id()) {
                        return Err(StorageError::Conflict);
                    }
                }
                for session in sessions {
                    guard.sessions.insert(session.id().clone(), session.clone());
                }
                affected_items(sessions)
            }
            SessionWrite::Update(session) => {
                let existing = guard
                    .sessions
                    .get_mut(session.id())
                    .ok_or(StorageError::NotFound)?;
                if existing.study_item_id() != session.study_item_id() {
                    return Err(StorageError::Conflict);
                }
                *existing = session.clone();
                vec![session.study_item_id().clone()]
            }
            SessionWrite::Delete(id) => {
                let removed = guard.sessions.remove(id).ok_or(StorageError::NotFound)?;
                vec![removed.study_item_id().clone()]
            }
        };
        Ok(affected
            .iter()
            .map(|item_id| guard.refresh_progress(item_id, now))
            .collect())
    }
}

/// Aggregates item and session repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn StudyItemRepository>,
    pub sessions: Arc<dyn StudySessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let items: Arc<dyn StudyItemRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn StudySessionRepository> = Arc::new(repo);
        Self { items, sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use planner_core::model::{Priority, SessionDraft};
    use planner_core::time::fixed_now;

    fn build_item(title: &str, priority: Priority, created_offset_min: i64) -> StudyItem {
        StudyItem::new(
            StudyItemId::generate(),
            title,
            None,
            priority,
            None,
            fixed_now() + Duration::minutes(created_offset_min),
        )
        .unwrap()
    }

    fn build_session(item: &StudyItem, day: i64, completed: bool) -> StudySession {
        let start = fixed_now() + Duration::days(day);
        SessionDraft {
            study_item_id: item.id().clone(),
            start_time: start,
            end_time: start + Duration::hours(1),
            completed,
            notes: None,
        }
        .into_session(StudySessionId::generate(), fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn lists_items_by_priority_then_newest() {
        let repo = InMemoryRepository::new();
        let low = build_item("low", Priority::Low, 10);
        let high_old = build_item("high old", Priority::High, 0);
        let high_new = build_item("high new", Priority::High, 5);
        for item in [&low, &high_old, &high_new] {
            repo.insert_item(item, &[]).await.unwrap();
        }

        let titles: Vec<String> = repo
            .list_items()
            .await
            .unwrap()
            .iter()
            .map(|i| i.title().to_owned())
            .collect();
        assert_eq!(titles, vec!["high new", "high old", "low"]);
    }

    #[tokio::test]
    async fn detail_update_from_stale_copy_keeps_derived_progress() {
        let repo = InMemoryRepository::new();
        let item = build_item("a", Priority::Medium, 0);
        repo.insert_item(&item, &[]).await.unwrap();
        let mut stale = repo.get_item(item.id()).await.unwrap().unwrap();

        let mut session = build_session(&item, 0, false);
        repo.apply_write(SessionWrite::Insert(std::slice::from_ref(&session)), fixed_now())
            .await
            .unwrap();
        session.set_completed(true, fixed_now());
        repo.apply_write(SessionWrite::Update(&session), fixed_now())
            .await
            .unwrap();

        stale.set_title("renamed", fixed_now()).unwrap();
        let stored = repo.update_item(&stale, None).await.unwrap();
        assert_eq!(stored.title(), "renamed");
        assert_eq!(stored.progress(), Progress::COMPLETE);

        let err = repo
            .update_item(&stale, Some(Progress::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DerivedProgress));
        let kept = repo.get_item(item.id()).await.unwrap().unwrap();
        assert_eq!(kept.progress(), Progress::COMPLETE);
    }

    #[tokio::test]
    async fn insert_with_foreign_session_writes_nothing() {
        let repo = InMemoryRepository::new();
        let item = build_item("a", Priority::Low, 0);
        let other = build_item("b", Priority::Low, 0);
        let stray = build_session(&other, 0, false);

        let err = repo.insert_item(&item, &[stray]).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.get_item(item.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn apply_write_recomputes_progress() {
        let repo = InMemoryRepository::new();
        let item = build_item("a", Priority::Medium, 0);
        repo.insert_item(&item, &[]).await.unwrap();

        let mut sessions: Vec<_> = (0..4).map(|d| build_session(&item, d, false)).collect();
        repo.apply_write(SessionWrite::Insert(&sessions), fixed_now())
            .await
            .unwrap();

        sessions[0].set_completed(true, fixed_now());
        let updates = repo
            .apply_write(SessionWrite::Update(&sessions[0]), fixed_now())
            .await
            .unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].progress, Some(Progress::new(0.25).unwrap()));

        let stored = repo.get_item(item.id()).await.unwrap().unwrap();
        assert_eq!(stored.progress(), Progress::new(0.25).unwrap());
    }

    #[tokio::test]
    async fn deleting_last_session_keeps_stored_progress() {
        let repo = InMemoryRepository::new();
        let item = build_item("a", Priority::Medium, 0);
        let session = build_session(&item, 0, true);
        repo.insert_item(&item, &[]).await.unwrap();
        repo.apply_write(SessionWrite::Insert(std::slice::from_ref(&session)), fixed_now())
            .await
            .unwrap();

        let updates = repo
            .apply_write(SessionWrite::Delete(session.id()), fixed_now())
            .await
            .unwrap();
        assert_eq!(updates[0].progress, None);
        let stored = repo.get_item(item.id()).await.unwrap().unwrap();
        assert_eq!(stored.progress(), Progress::COMPLETE);
    }

    #[tokio::test]
    async fn delete_item_cascades_sessions() {
        let repo = InMemoryRepository::new();
        let item = build_item("a", Priority::Medium, 0);
        let session = build_session(&item, 0, false);
        repo.insert_item(&item, std::slice::from_ref(&session))
            .await
            .unwrap();

        repo.delete_item(item.id()).await.unwrap();
        assert!(repo.get_session(session.id()).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_item(item.id()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn filter_bounds_are_half_open() {
        let item = build_item("a", Priority::Low, 0);
        let session = build_session(&item, 0, false);
        let start = session.start_time();
        assert!(SessionFilter::starting_between(start, start + Duration::hours(1)).matches(&session));
        assert!(!SessionFilter::starting_between(start - Duration::hours(1), start).matches(&session));
        assert!(!SessionFilter::for_item(StudyItemId::generate()).matches(&session));
    }
}
