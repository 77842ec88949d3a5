use std::sync::Arc;

use chrono::NaiveDate;
use planner_core::calendar::{self, CalendarEvent, WeekWindow};
use storage::repository::{SessionFilter, StudySessionRepository};

use crate::error::CalendarServiceError;
use crate::settings::PlannerSettings;
use crate::Clock;

/// One week of the calendar grid.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekView {
    pub window: WeekWindow,
    pub events: Vec<CalendarEvent>,
}

/// Builds week grids from stored sessions.
#[derive(Clone)]
pub struct CalendarService {
    clock: Clock,
    settings: PlannerSettings,
    sessions: Arc<dyn StudySessionRepository>,
}

impl CalendarService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: &PlannerSettings,
        sessions: Arc<dyn StudySessionRepository>,
    ) -> Self {
        Self {
            clock,
            settings: *settings,
            sessions,
        }
    }

    /// The week containing `reference`, or the current week.
    ///
    /// # Errors
    ///
    /// Returns `CalendarServiceError::WeekOutOfRange` when the week does not
    /// fit in the calendar, or `Storage` if repository access fails.
    pub async fn week(
        &self,
        reference: Option<NaiveDate>,
    ) -> Result<WeekView, CalendarServiceError> {
        let layout = self.settings.layout();
        let reference = reference.unwrap_or_else(|| self.clock.today(layout.offset));
        let window = layout
            .window(reference)
            .ok_or(CalendarServiceError::WeekOutOfRange { reference })?;

        let sessions = self
            .sessions
            .list_sessions(&SessionFilter::starting_between(window.start, window.end))
            .await?;
        Ok(WeekView {
            window,
            events: calendar::project(&sessions, reference, &layout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Weekday};
    use planner_core::model::{Priority, SessionDraft, StudyItem, StudyItemId, StudySessionId};
    use planner_core::time::{fixed_now, parse_utc_offset};
    use storage::repository::{InMemoryRepository, StudyItemRepository};

    #[tokio::test]
    async fn week_contains_only_sessions_of_that_week() {
        let repo = InMemoryRepository::new();
        let item = StudyItem::new(
            StudyItemId::generate(),
            "Piano",
            None,
            Priority::Low,
            None,
            fixed_now(),
        )
        .unwrap();
        let sessions: Vec<_> = [0, 1, 8]
            .into_iter()
            .map(|day| {
                let start = fixed_now() + Duration::days(day);
                SessionDraft {
                    study_item_id: item.id().clone(),
                    start_time: start,
                    end_time: start + Duration::minutes(45),
                    completed: false,
                    notes: None,
                }
                .into_session(StudySessionId::generate(), fixed_now())
                .unwrap()
            })
            .collect();
        repo.insert_item(&item, &sessions).await.unwrap();

        let settings = PlannerSettings {
            utc_offset: parse_utc_offset("+00:00").unwrap(),
            week_start: Weekday::Sun,
            ..PlannerSettings::default()
        };
        let service = CalendarService::new(Clock::Fixed(fixed_now()), &settings, Arc::new(repo));

        // 2023-11-14 is a Tuesday; day +1 is still this week, day +8 is not.
        let view = service.week(None).await.unwrap();
        assert_eq!(view.window.first_day, NaiveDate::from_ymd_opt(2023, 11, 12).unwrap());
        assert_eq!(view.events.len(), 2);
        assert_eq!(view.events[0].day_of_week, 2);
        assert_eq!(view.events[1].day_of_week, 3);
        assert!(view.events.iter().all(|e| e.title == "Piano"));

        assert!(matches!(
            service.week(Some(NaiveDate::MAX)).await,
            Err(CalendarServiceError::WeekOutOfRange { .. })
        ));

        let next = service
            .week(NaiveDate::from_ymd_opt(2023, 11, 22))
            .await
            .unwrap();
        assert_eq!(next.events.len(), 1);
    }
}
