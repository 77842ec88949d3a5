use std::sync::Arc;

use planner_core::analytics::{self, ProgressReport};
use storage::repository::{
    SessionFilter, StorageError, StudyItemRepository, StudySessionRepository,
};

use crate::settings::PlannerSettings;
use crate::Clock;

/// Computes the progress dashboard from a snapshot of all items and sessions.
#[derive(Clone)]
pub struct AnalyticsService {
    clock: Clock,
    settings: PlannerSettings,
    items: Arc<dyn StudyItemRepository>,
    sessions: Arc<dyn StudySessionRepository>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: &PlannerSettings,
        items: Arc<dyn StudyItemRepository>,
        sessions: Arc<dyn StudySessionRepository>,
    ) -> Self {
        Self {
            clock,
            settings: *settings,
            items,
            sessions,
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn report(&self) -> Result<ProgressReport, StorageError> {
        let items = self.items.list_items().await?;
        let sessions: Vec<_> = self
            .sessions
            .list_sessions(&SessionFilter::default())
            .await?
            .into_iter()
            .map(|entry| entry.session)
            .collect();
        Ok(analytics::progress_report(
            &items,
            &sessions,
            self.clock.now(),
            &self.settings.layout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use planner_core::model::{Priority, SessionDraft, StudyItem, StudyItemId, StudySessionId};
    use planner_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, SessionWrite};

    #[tokio::test]
    async fn report_reflects_completed_sessions() {
        let repo = InMemoryRepository::new();
        let item = StudyItem::new(
            StudyItemId::generate(),
            "Guitar",
            None,
            Priority::High,
            None,
            fixed_now() - Duration::days(3),
        )
        .unwrap();
        repo.insert_item(&item, &[]).await.unwrap();

        let start = fixed_now() - Duration::hours(5);
        let done = SessionDraft {
            study_item_id: item.id().clone(),
            start_time: start,
            end_time: start + Duration::minutes(90),
            completed: true,
            notes: None,
        }
        .into_session(StudySessionId::generate(), fixed_now())
        .unwrap();
        let later = SessionDraft {
            study_item_id: item.id().clone(),
            start_time: fixed_now() + Duration::hours(1),
            end_time: fixed_now() + Duration::hours(2),
            completed: false,
            notes: None,
        }
        .into_session(StudySessionId::generate(), fixed_now())
        .unwrap();
        repo.apply_write(SessionWrite::Insert(&[done, later]), fixed_now())
            .await
            .unwrap();

        let service = AnalyticsService::new(
            Clock::Fixed(fixed_now()),
            &PlannerSettings::default(),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let report = service.report().await.unwrap();

        assert_eq!(report.total_study_hours, 1.5);
        assert_eq!(report.status.ongoing, 1);
        assert_eq!(report.upcoming_sessions, 1);
        assert_eq!(report.daily.last().unwrap().hours, 1.5);
        assert_eq!(report.top_items[0].title, "Guitar");
        assert_eq!(report.week_scheduled_hours, 2.5);
    }
}
