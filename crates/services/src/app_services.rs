use std::sync::Arc;

use storage::repository::Storage;

use crate::analytics_service::AnalyticsService;
use crate::calendar_service::CalendarService;
use crate::error::AppServicesError;
use crate::messages::MessageCatalog;
use crate::settings::PlannerSettings;
use crate::study_item_service::StudyItemService;
use crate::study_session_service::StudySessionService;
use crate::Clock;

/// Assembles every app-facing service over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    settings: PlannerSettings,
    messages: Arc<MessageCatalog>,
    study_items: Arc<StudyItemService>,
    study_sessions: Arc<StudySessionService>,
    calendar: Arc<CalendarService>,
    analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or loading the
    /// message catalog fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: &PlannerSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, settings)
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the message catalog fails to load.
    pub fn in_memory(clock: Clock, settings: &PlannerSettings) -> Result<Self, AppServicesError> {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the message catalog fails to load.
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        settings: &PlannerSettings,
    ) -> Result<Self, AppServicesError> {
        let messages = Arc::new(MessageCatalog::embedded(settings.default_locale)?);
        let study_items = Arc::new(StudyItemService::new(
            clock,
            settings,
            Arc::clone(&storage.items),
            Arc::clone(&storage.sessions),
        ));
        let study_sessions = Arc::new(StudySessionService::new(
            clock,
            Arc::clone(&storage.items),
            Arc::clone(&storage.sessions),
        ));
        let calendar = Arc::new(CalendarService::new(
            clock,
            settings,
            Arc::clone(&storage.sessions),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            clock,
            settings,
            Arc::clone(&storage.items),
            Arc::clone(&storage.sessions),
        ));

        Ok(Self {
            settings: *settings,
            messages,
            study_items,
            study_sessions,
            calendar,
            analytics,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    #[must_use]
    pub fn messages(&self) -> Arc<MessageCatalog> {
        Arc::clone(&self.messages)
    }

    #[must_use]
    pub fn study_items(&self) -> Arc<StudyItemService> {
        Arc::clone(&self.study_items)
    }

    #[must_use]
    pub fn study_sessions(&self) -> Arc<StudySessionService> {
        Arc::clone(&self.study_sessions)
    }

    #[must_use]
    pub fn calendar(&self) -> Arc<CalendarService> {
        Arc::clone(&self.calendar)
    }

    #[must_use]
    pub fn analytics(&self) -> Arc<AnalyticsService> {
        Arc::clone(&self.analytics)
    }
}
