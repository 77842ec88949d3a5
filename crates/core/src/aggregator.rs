use thiserror::Error;

use crate::model::{Progress, StudySession};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("cannot derive progress from an empty session set")]
    NoSessions,
}

/// Derive an item's progress from its full session set.
///
/// Returns `completed / total`, clamped to 1.
///
/// # Errors
///
/// Returns `ProgressError::NoSessions` when `sessions` is empty; callers keep
/// the item's stored progress in that case.
pub fn recompute(sessions: &[StudySession]) -> Result<Progress, ProgressError> {
    let completed = sessions.iter().filter(|s| s.completed()).count();
    Progress::ratio(completed, sessions.len()).ok_or(ProgressError::NoSessions)
}
