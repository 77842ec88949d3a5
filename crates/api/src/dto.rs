//! JSON request and response bodies.

use chrono::{DateTime, NaiveDate, Utc};
use planner_core::analytics::{DailyHours, ItemHours, PriorityCount, ProgressReport};
use planner_core::calendar::CalendarEvent;
use planner_core::model::{
    Priority, Progress, SessionDraft, SessionWithItem, StudyItem, StudyItemId, StudySession,
    StudySessionId,
};
use serde::{Deserialize, Deserializer, Serialize};
use services::{
    Locale, PlanRequest, PlannedItem, SessionChange, SessionPatch, WeekView,
};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ─── Study items ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyItemDto {
    pub id: StudyItemId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub progress: f64,
    pub progress_percent: u8,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StudyItem> for StudyItemDto {
    fn from(item: &StudyItem) -> Self {
        Self {
            id: item.id().clone(),
            title: item.title().to_owned(),
            description: item.description().map(str::to_owned),
            priority: item.priority(),
            progress: item.progress().value(),
            progress_percent: item.progress().as_percent(),
            due_date: item.due_date(),
            created_at: item.created_at(),
            updated_at: item.updated_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudyItemRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub total_hours: Option<f64>,
    pub start_date: Option<NaiveDate>,
}

impl CreateStudyItemRequest {
    #[must_use]
    pub fn into_new_item(self) -> services::NewStudyItem {
        services::NewStudyItem {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            plan: self.total_hours.map(|total_hours| PlanRequest {
                total_hours,
                start_date: self.start_date,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudyItemRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    /// Fraction in `[0, 1]`.
    pub progress: Option<f64>,
}

impl UpdateStudyItemRequest {
    /// # Errors
    ///
    /// Returns `ProgressValueError` when `progress` is outside `[0, 1]`.
    pub fn into_patch(
        self,
    ) -> Result<services::StudyItemPatch, planner_core::model::ProgressValueError> {
        Ok(services::StudyItemPatch {
            title: self.title,
            description: self.description,
            priority: self.priority,
            due_date: self.due_date,
            progress: self.progress.map(Progress::new).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    pub total_hours: f64,
    pub start_date: Option<NaiveDate>,
}

impl From<GeneratePlanRequest> for PlanRequest {
    fn from(req: GeneratePlanRequest) -> Self {
        Self {
            total_hours: req.total_hours,
            start_date: req.start_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedItemResponse {
    pub study_item: StudyItemDto,
    pub sessions: Vec<StudySessionDto>,
    pub unscheduled_hours: f64,
}

impl From<&PlannedItem> for PlannedItemResponse {
    fn from(planned: &PlannedItem) -> Self {
        Self {
            study_item: StudyItemDto::from(&planned.item),
            sessions: planned.sessions.iter().map(StudySessionDto::from).collect(),
            unscheduled_hours: planned.unscheduled_hours,
        }
    }
}

// ─── Study sessions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionDto {
    pub id: StudySessionId,
    pub study_item_id: StudyItemId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub completed: bool,
    pub notes: Option<String>,
    pub duration_hours: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StudySession> for StudySessionDto {
    fn from(session: &StudySession) -> Self {
        Self {
            id: session.id().clone(),
            study_item_id: session.study_item_id().clone(),
            start_time: session.start_time(),
            end_time: session.end_time(),
            completed: session.completed(),
            notes: session.notes().map(str::to_owned),
            duration_hours: session.duration_hours(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemSummaryDto {
    pub id: StudyItemId,
    pub title: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithItemDto {
    #[serde(flatten)]
    pub session: StudySessionDto,
    pub study_item: ItemSummaryDto,
}

impl From<&SessionWithItem> for SessionWithItemDto {
    fn from(entry: &SessionWithItem) -> Self {
        Self {
            session: StudySessionDto::from(&entry.session),
            study_item: ItemSummaryDto {
                id: entry.session.study_item_id().clone(),
                title: entry.item_title.clone(),
                priority: entry.item_priority,
            },
        }
    }
}

/// Body for a session created under `/study-items/:id/sessions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    pub notes: Option<String>,
}

impl CreateSessionRequest {
    #[must_use]
    pub fn into_draft(self, study_item_id: StudyItemId) -> SessionDraft {
        SessionDraft {
            study_item_id,
            start_time: self.start_time,
            end_time: self.end_time,
            completed: self.completed,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSessionEntry {
    pub study_item_id: StudyItemId,
    #[serde(flatten)]
    pub session: CreateSessionRequest,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateSessionsRequest {
    pub sessions: Vec<BulkSessionEntry>,
}

impl BulkCreateSessionsRequest {
    #[must_use]
    pub fn into_drafts(self) -> Vec<SessionDraft> {
        self.sessions
            .into_iter()
            .map(|entry| entry.session.into_draft(entry.study_item_id))
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl From<UpdateSessionRequest> for SessionPatch {
    fn from(req: UpdateSessionRequest) -> Self {
        Self {
            completed: req.completed,
            notes: req.notes,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    pub study_item_id: Option<StudyItemId>,
}

/// A written session plus its item's recomputed progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChangeResponse {
    pub session: SessionWithItemDto,
    pub item_progress: Option<f64>,
    pub item_progress_percent: Option<u8>,
}

impl From<&SessionChange> for SessionChangeResponse {
    fn from(change: &SessionChange) -> Self {
        Self {
            session: SessionWithItemDto::from(&change.session),
            item_progress: change.item_progress.map(Progress::value),
            item_progress_percent: change.item_progress.map(Progress::as_percent),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_progress: Option<f64>,
}

// ─── Calendar ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventDto {
    pub day_of_week: u8,
    /// Local `HH:MM`.
    pub time: String,
    pub duration_hours: f64,
    pub title: String,
    pub session_id: StudySessionId,
    pub study_item_id: StudyItemId,
    pub completed: bool,
}

impl From<&CalendarEvent> for CalendarEventDto {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            day_of_week: event.day_of_week,
            time: event.time_of_day.format("%H:%M").to_string(),
            duration_hours: event.duration_hours,
            title: event.title.clone(),
            session_id: event.session_id.clone(),
            study_item_id: event.study_item_id.clone(),
            completed: event.completed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekResponse {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub events: Vec<CalendarEventDto>,
}

impl From<&WeekView> for WeekResponse {
    fn from(view: &WeekView) -> Self {
        Self {
            week_start: view.window.first_day,
            week_end: view.window.last_day(),
            events: view.events.iter().map(CalendarEventDto::from).collect(),
        }
    }
}

// ─── Progress dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountsDto {
    pub completed: usize,
    pub ongoing: usize,
    pub not_started: usize,
}

#[derive(Debug, Serialize)]
pub struct PriorityCountDto {
    pub priority: Priority,
    pub label: &'static str,
    pub count: usize,
}

impl From<&PriorityCount> for PriorityCountDto {
    fn from(count: &PriorityCount) -> Self {
        Self {
            priority: count.priority,
            label: count.priority.as_str(),
            count: count.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyHoursDto {
    pub date: NaiveDate,
    pub hours: f64,
}

impl From<&DailyHours> for DailyHoursDto {
    fn from(day: &DailyHours) -> Self {
        Self {
            date: day.date,
            hours: day.hours,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHoursDto {
    pub study_item_id: StudyItemId,
    pub title: String,
    pub hours: f64,
}

impl From<&ItemHours> for ItemHoursDto {
    fn from(item: &ItemHours) -> Self {
        Self {
            study_item_id: item.study_item_id.clone(),
            title: item.title.clone(),
            hours: item.hours,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReportDto {
    pub total_study_hours: f64,
    pub status: StatusCountsDto,
    pub priorities: Vec<PriorityCountDto>,
    pub daily: Vec<DailyHoursDto>,
    pub top_items: Vec<ItemHoursDto>,
    pub upcoming_sessions: usize,
    pub week_scheduled_hours: f64,
}

impl From<&ProgressReport> for ProgressReportDto {
    fn from(report: &ProgressReport) -> Self {
        Self {
            total_study_hours: report.total_study_hours,
            status: StatusCountsDto {
                completed: report.status.completed,
                ongoing: report.status.ongoing,
                not_started: report.status.not_started,
            },
            priorities: report.priorities.iter().map(PriorityCountDto::from).collect(),
            daily: report.daily.iter().map(DailyHoursDto::from).collect(),
            top_items: report.top_items.iter().map(ItemHoursDto::from).collect(),
            upcoming_sessions: report.upcoming_sessions,
            week_scheduled_hours: report.week_scheduled_hours,
        }
    }
}

// ─── Messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub locale: Locale,
    pub messages: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_request_distinguishes_null_from_absent() {
        let cleared: UpdateStudyItemRequest =
            serde_json::from_value(json!({ "description": null })).unwrap();
        assert_eq!(cleared.description, Some(None));
        assert_eq!(cleared.due_date, None);

        let absent: UpdateStudyItemRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.description, None);
    }

    #[test]
    fn create_request_defaults_priority_to_low() {
        let req: CreateStudyItemRequest =
            serde_json::from_value(json!({ "title": "Go", "totalHours": 3 })).unwrap();
        assert_eq!(req.priority, Priority::Low);
        let new = req.into_new_item();
        assert_eq!(new.plan.map(|p| p.total_hours), Some(3.0));
    }

    #[test]
    fn out_of_range_priority_is_rejected() {
        let parsed = serde_json::from_value::<CreateStudyItemRequest>(
            json!({ "title": "Go", "priority": 7 }),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn bulk_entries_flatten_session_fields() {
        let req: BulkCreateSessionsRequest = serde_json::from_value(json!({
            "sessions": [{
                "studyItemId": "abc",
                "startTime": "2024-06-03T18:00:00Z",
                "endTime": "2024-06-03T19:30:00Z"
            }]
        }))
        .unwrap();
        let drafts = req.into_drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].study_item_id.as_str(), "abc");
        assert!(!drafts[0].completed);
    }
}
