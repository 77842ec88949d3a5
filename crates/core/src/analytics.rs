//! Aggregates behind the progress dashboard.
//!
//! Everything here is computed from plain snapshots of items and sessions;
//! formatting and charting belong to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};

use crate::calendar::WeekLayout;
use crate::model::{Priority, StudyItem, StudyItemId, StudySession};

/// Days covered by the daily study chart.
pub const DAILY_WINDOW_DAYS: u64 = 7;
/// Items listed in the per-item ranking.
pub const TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub completed: usize,
    pub ongoing: usize,
    pub not_started: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyHours {
    pub date: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemHours {
    pub study_item_id: StudyItemId,
    pub title: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    /// Completed study time across all items, in hours rounded to 0.1.
    pub total_study_hours: f64,
    pub status: StatusCounts,
    /// Always low, medium, high in that order.
    pub priorities: Vec<PriorityCount>,
    /// Oldest first, ending today.
    pub daily: Vec<DailyHours>,
    pub top_items: Vec<ItemHours>,
    pub upcoming_sessions: usize,
    /// Scheduled (completed or not) hours in the current week, rounded to 0.1.
    pub week_scheduled_hours: f64,
}

/// Round to one decimal place.
#[must_use]
pub fn round_tenths(hours: f64) -> f64 {
    (hours * 10.0).round() / 10.0
}

/// Build the dashboard report from item and session snapshots.
#[must_use]
pub fn progress_report(
    items: &[StudyItem],
    sessions: &[StudySession],
    now: DateTime<Utc>,
    layout: &WeekLayout,
) -> ProgressReport {
    let completed: Vec<&StudySession> = sessions.iter().filter(|s| s.completed()).collect();
    let total_study_hours =
        round_tenths(completed.iter().map(|s| s.duration_hours()).sum::<f64>());

    let mut status = StatusCounts::default();
    for item in items {
        let progress = item.progress();
        if progress.is_complete() {
            status.completed += 1;
        } else if progress.is_started() {
            status.ongoing += 1;
        } else {
            status.not_started += 1;
        }
    }

    let priorities = Priority::ALL
        .iter()
        .map(|p| PriorityCount {
            priority: *p,
            count: items.iter().filter(|i| i.priority() == *p).count(),
        })
        .collect();

    let today = now.with_timezone(&layout.offset).date_naive();
    let daily = daily_hours(&completed, today, layout.offset);

    let mut per_item: HashMap<&StudyItemId, f64> = HashMap::new();
    for session in &completed {
        *per_item.entry(session.study_item_id()).or_default() += session.duration_hours();
    }
    let mut top_items: Vec<ItemHours> = items
        .iter()
        .map(|item| ItemHours {
            study_item_id: item.id().clone(),
            title: item.title().to_owned(),
            hours: round_tenths(per_item.get(item.id()).copied().unwrap_or_default()),
        })
        .collect();
    top_items.sort_by(|a, b| b.hours.total_cmp(&a.hours).then_with(|| a.title.cmp(&b.title)));
    top_items.truncate(TOP_ITEMS);

    let upcoming_sessions = sessions
        .iter()
        .filter(|s| !s.completed() && s.start_time() >= now)
        .count();

    let week_scheduled_hours = layout.window(today).map_or(0.0, |week| {
        round_tenths(
            sessions
                .iter()
                .filter(|s| week.contains(s.start_time()))
                .map(StudySession::duration_hours)
                .sum(),
        )
    });

    ProgressReport {
        total_study_hours,
        status,
        priorities,
        daily,
        top_items,
        upcoming_sessions,
        week_scheduled_hours,
    }
}

fn daily_hours(completed: &[&StudySession], today: NaiveDate, offset: FixedOffset) -> Vec<DailyHours> {
    (0..DAILY_WINDOW_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| {
            let hours = completed
                .iter()
                .filter(|s| s.start_time().with_timezone(&offset).date_naive() == date)
                .map(|s| s.duration_hours())
                .sum::<f64>();
            DailyHours {
                date,
                hours: round_tenths(hours),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::model::{Progress, SessionDraft, StudySessionId};
    use crate::time::fixed_now;

    fn item(title: &str, priority: Priority, progress: f64) -> StudyItem {
        let mut item = StudyItem::new(
            StudyItemId::generate(),
            title,
            None,
            priority,
            None,
            fixed_now(),
        )
        .unwrap();
        item.set_progress(Progress::new(progress).unwrap(), fixed_now());
        item
    }

    fn session(item: &StudyItem, start: DateTime<Utc>, minutes: i64, done: bool) -> StudySession {
        SessionDraft {
            study_item_id: item.id().clone(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            completed: done,
            notes: None,
        }
        .into_session(StudySessionId::generate(), fixed_now())
        .unwrap()
    }

    #[test]
    fn report_counts_status_and_priorities() {
        let items = vec![
            item("a", Priority::High, 1.0),
            item("b", Priority::High, 0.5),
            item("c", Priority::Low, 0.0),
        ];
        let report = progress_report(&items, &[], fixed_now(), &WeekLayout::default());
        assert_eq!(
            report.status,
            StatusCounts {
                completed: 1,
                ongoing: 1,
                not_started: 1
            }
        );
        let counts: Vec<_> = report.priorities.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![1, 0, 2]);
        assert_eq!(report.total_study_hours, 0.0);
        assert_eq!(report.daily.len(), 7);
    }

    #[test]
    fn completed_time_is_bucketed_by_day_and_item() {
        let a = item("Algebra", Priority::Medium, 0.5);
        let b = item("Biology", Priority::Medium, 0.5);
        let now = fixed_now();
        let sessions = vec![
            session(&a, now - Duration::days(1), 90, true),
            session(&a, now - Duration::days(1) - Duration::hours(2), 30, true),
            session(&b, now - Duration::days(3), 60, true),
            session(&b, now - Duration::days(2), 60, false),
            session(&b, now + Duration::hours(1), 60, false),
        ];
        let report = progress_report(&[a, b], &sessions, now, &WeekLayout::default());

        assert_eq!(report.total_study_hours, 3.0);
        assert_eq!(report.daily.last().unwrap().date, now.date_naive());
        let yesterday = &report.daily[5];
        assert_eq!(yesterday.hours, 2.0);
        assert_eq!(report.top_items[0].title, "Algebra");
        assert_eq!(report.top_items[0].hours, 2.0);
        assert_eq!(report.top_items[1].hours, 1.0);
        assert_eq!(report.upcoming_sessions, 1);
    }

    #[test]
    fn top_items_are_capped() {
        let items: Vec<_> = (0..8)
            .map(|i| item(&format!("item {i}"), Priority::Low, 0.0))
            .collect();
        let report = progress_report(&items, &[], fixed_now(), &WeekLayout::default());
        assert_eq!(report.top_items.len(), TOP_ITEMS);
    }

    #[test]
    fn round_tenths_rounds_half_up() {
        assert_eq!(round_tenths(1.25), 1.3);
        assert_eq!(round_tenths(0.04), 0.0);
    }
}
