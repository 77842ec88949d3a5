mod ids;
mod progress;
mod study_item;
mod study_session;

pub use ids::{ParseIdError, StudyItemId, StudySessionId};
pub use progress::{Progress, ProgressValueError};
pub use study_item::{Priority, StudyItem, StudyItemError};
pub use study_session::{SessionDraft, SessionWithItem, StudySession, StudySessionError};
