//! Week grid projection of persisted sessions.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc, Weekday,
};

use crate::model::{SessionWithItem, StudyItemId, StudySessionId};

/// How weeks are laid out: the local offset and the first day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekLayout {
    pub offset: FixedOffset,
    pub week_start: Weekday,
}

impl WeekLayout {
    #[must_use]
    pub fn new(offset: FixedOffset, week_start: Weekday) -> Self {
        Self { offset, week_start }
    }

    /// The seven-day window containing `reference`.
    ///
    /// `None` when that week reaches past either end of the calendar.
    #[must_use]
    pub fn window(&self, reference: NaiveDate) -> Option<WeekWindow> {
        let back = (7 + reference.weekday().num_days_from_sunday()
            - self.week_start.num_days_from_sunday())
            % 7;
        let first_day = reference.checked_sub_days(Days::new(u64::from(back)))?;
        let start = first_day
            .and_time(NaiveTime::default())
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))?
            .and_utc();
        let end = start.checked_add_signed(Duration::days(7))?;
        // The last local day must exist too, even when the UTC end still does.
        first_day.checked_add_days(Days::new(6))?;
        Some(WeekWindow {
            first_day,
            start,
            end,
        })
    }
}

impl Default for WeekLayout {
    fn default() -> Self {
        Self {
            offset: crate::time::utc_offset(),
            week_start: Weekday::Sun,
        }
    }
}

/// A week as a half-open instant range `[start, end)`.
///
/// Equivalent to the inclusive range from the first day's 00:00:00.000 to the
/// last day's 23:59:59.999 local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub first_day: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.first_day
            .checked_add_days(Days::new(6))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// One block on the week grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    /// Local weekday, Sunday = 0.
    pub day_of_week: u8,
    pub time_of_day: NaiveTime,
    pub duration_hours: f64,
    pub title: String,
    pub session_id: StudySessionId,
    pub study_item_id: StudyItemId,
    pub completed: bool,
}

/// Map the sessions that start inside the week containing `reference` to
/// grid events.
///
/// Overlapping sessions are kept as separate events; output follows input
/// order. A week outside the calendar has no events.
#[must_use]
pub fn project(
    sessions: &[SessionWithItem],
    reference: NaiveDate,
    layout: &WeekLayout,
) -> Vec<CalendarEvent> {
    let Some(window) = layout.window(reference) else {
        return Vec::new();
    };
    sessions
        .iter()
        .filter(|entry| window.contains(entry.session.start_time()))
        .map(|entry| {
            let session = &entry.session;
            let local_start = session.start_time().with_timezone(&layout.offset);
            #[allow(clippy::cast_possible_truncation)]
            let day_of_week = local_start.weekday().num_days_from_sunday() as u8;
            CalendarEvent {
                day_of_week,
                time_of_day: NaiveTime::from_hms_opt(local_start.hour(), local_start.minute(), 0)
                    .unwrap_or_default(),
                duration_hours: session.duration_hours(),
                title: entry.item_title.clone(),
                session_id: session.id().clone(),
                study_item_id: session.study_item_id().clone(),
                completed: session.completed(),
            }
        })
        .collect()
}
