//! Auto-generation of a week of evening study sessions for a new item.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::model::{SessionDraft, StudyItemId};

/// Number of consecutive days a plan may cover.
pub const PLAN_DAYS: u32 = 7;
/// Upper bound on scheduled hours for a single day.
pub const DAILY_CAP_HOURS: f64 = 2.0;
/// Local hour at which every generated session starts.
pub const SESSION_START_HOUR: u32 = 18;

/// Remaining hours at or below this fraction of the total are treated as
/// fully scheduled.
const REMAINING_EPSILON: f64 = 1e-9;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GenerateError {
    #[error("total hours must be a positive finite number, got {provided}")]
    InvalidHours { provided: f64 },
    #[error("a plan starting on {start_date} runs past the supported date range")]
    DateOutOfRange { start_date: NaiveDate },
}

/// One generated session, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProposal {
    pub study_item_id: StudyItemId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl SessionProposal {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_hours(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    /// Pending draft ready for the storage bulk-create.
    #[must_use]
    pub fn into_draft(self) -> SessionDraft {
        SessionDraft {
            study_item_id: self.study_item_id,
            start_time: self.start_time,
            end_time: self.end_time,
            completed: false,
            notes: None,
        }
    }
}

/// Generator output.
///
/// `unscheduled_hours` is non-zero only when the request exceeds what the
/// daily cap allows within the plan window (`PLAN_DAYS * DAILY_CAP_HOURS`).
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPlan {
    pub proposals: Vec<SessionProposal>,
    pub daily_hours: f64,
    pub unscheduled_hours: f64,
}

impl GeneratedPlan {
    #[must_use]
    pub fn scheduled_hours(&self) -> f64 {
        self.proposals.iter().map(SessionProposal::duration_hours).sum()
    }

    #[must_use]
    pub fn into_drafts(self) -> Vec<SessionDraft> {
        self.proposals
            .into_iter()
            .map(SessionProposal::into_draft)
            .collect()
    }
}

/// Spread `total_hours` over up to seven evenings starting at `start_date`.
///
/// Each day receives `min(DAILY_CAP_HOURS, total_hours / 7)` hours (fixed for
/// the whole plan) until the total is used up. Sessions start at 18:00 in
/// `offset` and are rounded to whole milliseconds, never shorter than 1 ms.
///
/// # Errors
///
/// Returns `GenerateError::InvalidHours` when `total_hours` is not a positive
/// finite number, and `GenerateError::DateOutOfRange` when a session would
/// fall outside the representable calendar.
pub fn generate(
    study_item_id: &StudyItemId,
    total_hours: f64,
    start_date: NaiveDate,
    offset: FixedOffset,
) -> Result<GeneratedPlan, GenerateError> {
    if !total_hours.is_finite() || total_hours <= 0.0 {
        return Err(GenerateError::InvalidHours {
            provided: total_hours,
        });
    }

    let daily_hours = DAILY_CAP_HOURS.min(total_hours / f64::from(PLAN_DAYS));
    let epsilon = total_hours * REMAINING_EPSILON;
    let out_of_range = || GenerateError::DateOutOfRange { start_date };
    let mut remaining = total_hours;
    let mut proposals = Vec::with_capacity(PLAN_DAYS as usize);

    for day in 0..PLAN_DAYS {
        if remaining <= epsilon {
            break;
        }
        let hours = daily_hours.min(remaining);
        let start_time = start_date
            .checked_add_days(Days::new(u64::from(day)))
            .and_then(|date| evening_start(date, offset))
            .ok_or_else(out_of_range)?;
        let end_time = start_time
            .checked_add_signed(hours_to_duration(hours))
            .ok_or_else(out_of_range)?;
        proposals.push(SessionProposal {
            study_item_id: study_item_id.clone(),
            start_time,
            end_time,
        });
        remaining -= hours;
    }

    Ok(GeneratedPlan {
        proposals,
        daily_hours,
        unscheduled_hours: if remaining > epsilon {
            remaining
        } else {
            0.0
        },
    })
}

fn evening_start(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = date.and_time(
        NaiveTime::from_hms_opt(SESSION_START_HOUR, 0, 0).unwrap_or_default(),
    );
    // A fixed offset maps every local time to exactly one instant.
    local
        .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
        .map(|utc| utc.and_utc())
}

#[allow(clippy::cast_possible_truncation)]
fn hours_to_duration(hours: f64) -> Duration {
    let millis = (hours * MILLIS_PER_HOUR).round() as i64;
    Duration::milliseconds(millis.max(1))
}
