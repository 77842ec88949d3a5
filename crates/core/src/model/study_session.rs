use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{StudyItemId, StudySessionId};
use crate::model::study_item::Priority;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("end_time must be strictly after start_time")]
    InvalidTimeRange,
}

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Unsaved session: what a user submits or the generator proposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub study_item_id: StudyItemId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub notes: Option<String>,
}

impl SessionDraft {
    /// Validate the draft and assign an identifier.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTimeRange` if `end_time <= start_time`.
    pub fn into_session(
        self,
        id: StudySessionId,
        now: DateTime<Utc>,
    ) -> Result<StudySession, StudySessionError> {
        StudySession::from_persisted(
            id,
            self.study_item_id,
            self.start_time,
            self.end_time,
            self.completed,
            self.notes,
            now,
            now,
        )
    }
}

/// A scheduled or completed time block for one study item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    id: StudySessionId,
    study_item_id: StudyItemId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    completed: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StudySession {
    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTimeRange` if `end_time <= start_time`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: StudySessionId,
        study_item_id: StudyItemId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        completed: bool,
        notes: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StudySessionError> {
        if end_time <= start_time {
            return Err(StudySessionError::InvalidTimeRange);
        }
        Ok(Self {
            id,
            study_item_id,
            start_time,
            end_time,
            completed,
            notes: notes.filter(|n| !n.trim().is_empty()),
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &StudySessionId {
        &self.id
    }

    #[must_use]
    pub fn study_item_id(&self) -> &StudyItemId {
        &self.study_item_id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Length of the session in (possibly fractional) hours.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        self.updated_at = now;
    }

    pub fn set_notes(&mut self, notes: Option<String>, now: DateTime<Utc>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
        self.updated_at = now;
    }

    /// Move the session to a new time range.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTimeRange` if `end_time <= start_time`;
    /// the session is left unchanged in that case.
    pub fn reschedule(
        &mut self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StudySessionError> {
        if end_time <= start_time {
            return Err(StudySessionError::InvalidTimeRange);
        }
        self.start_time = start_time;
        self.end_time = end_time;
        self.updated_at = now;
        Ok(())
    }
}

/// A session joined with the owning item's display fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionWithItem {
    pub session: StudySession,
    pub item_title: String,
    pub item_priority: Priority,
}
