use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::StudyItemId;
use crate::model::progress::Progress;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudyItemError {
    #[error("study item title cannot be empty")]
    EmptyTitle,

    #[error("priority must be 1 (low), 2 (medium) or 3 (high), got {0}")]
    InvalidPriority(i64),
}

//
// ─── PRIORITY ──────────────────────────────────────────────────────────────────
//

/// Priority of a study item. Stored and transmitted as `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    #[must_use]
    pub fn as_i64(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Stable key used for message lookups and JSON labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl TryFrom<i64> for Priority {
    type Error = StudyItemError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(StudyItemError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for i64 {
    fn from(value: Priority) -> Self {
        value.as_i64()
    }
}

//
// ─── STUDY ITEM ────────────────────────────────────────────────────────────────
//

/// A learning goal with priority, optional due date and derived progress.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyItem {
    id: StudyItemId,
    title: String,
    description: Option<String>,
    priority: Priority,
    progress: Progress,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn normalize_title(title: String) -> Result<String, StudyItemError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StudyItemError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty())
}

impl StudyItem {
    /// Creates a new study item with zero progress.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError::EmptyTitle` if the title is empty or whitespace-only.
    pub fn new(
        id: StudyItemId,
        title: impl Into<String>,
        description: Option<String>,
        priority: Priority,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Self, StudyItemError> {
        Ok(Self {
            id,
            title: normalize_title(title.into())?,
            description: normalize_description(description),
            priority,
            progress: Progress::ZERO,
            due_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a study item from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError::EmptyTitle` if the stored title is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: StudyItemId,
        title: String,
        description: Option<String>,
        priority: Priority,
        progress: Progress,
        due_date: Option<NaiveDate>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StudyItemError> {
        Ok(Self {
            id,
            title: normalize_title(title)?,
            description,
            priority,
            progress,
            due_date,
            created_at,
            updated_at,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &StudyItemId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    #[must_use]
    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Mutators

    /// Replace the title.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemError::EmptyTitle` if the title is blank.
    pub fn set_title(
        &mut self,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StudyItemError> {
        self.title = normalize_title(title.into())?;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>, now: DateTime<Utc>) {
        self.description = normalize_description(description);
        self.updated_at = now;
    }

    pub fn set_priority(&mut self, priority: Priority, now: DateTime<Utc>) {
        self.priority = priority;
        self.updated_at = now;
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>, now: DateTime<Utc>) {
        self.due_date = due_date;
        self.updated_at = now;
    }

    pub fn set_progress(&mut self, progress: Progress, now: DateTime<Utc>) {
        self.progress = progress;
        self.updated_at = now;
    }
}
