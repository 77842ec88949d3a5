#![forbid(unsafe_code)]

pub mod analytics_service;
pub mod app_services;
pub mod calendar_service;
pub mod error;
pub mod messages;
pub mod settings;
pub mod study_item_service;
pub mod study_session_service;

pub use planner_core::Clock;

pub use analytics_service::AnalyticsService;
pub use app_services::AppServices;
pub use calendar_service::{CalendarService, WeekView};
pub use error::{
    AppServicesError, CalendarServiceError, StudyItemServiceError, StudySessionServiceError,
};
pub use messages::{Locale, MessageCatalog};
pub use settings::PlannerSettings;
pub use study_item_service::{
    NewStudyItem, PlanRequest, PlannedItem, StudyItemPatch, StudyItemService,
};
pub use study_session_service::{SessionChange, SessionPatch, StudySessionService};
