use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use planner_core::aggregator;
use planner_core::generator;
use planner_core::model::{
    Priority, Progress, StudyItem, StudyItemId, StudySession, StudySessionId,
};
use storage::repository::{SessionWrite, StorageError, StudyItemRepository, StudySessionRepository};
use tracing::{info, warn};

use crate::error::StudyItemServiceError;
use crate::settings::PlannerSettings;
use crate::Clock;

/// Request to spread a number of hours over the coming week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanRequest {
    pub total_hours: f64,
    /// First day of the plan; today in the configured offset when absent.
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudyItem {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub plan: Option<PlanRequest>,
}

/// An item together with the sessions a plan just stored for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub item: StudyItem,
    pub sessions: Vec<StudySession>,
    /// Hours the daily cap left out of the plan.
    pub unscheduled_hours: f64,
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub progress: Option<Progress>,
}

impl StudyItemPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.progress.is_none()
    }
}

fn item_not_found(err: StorageError) -> StudyItemServiceError {
    match err {
        StorageError::NotFound => StudyItemServiceError::NotFound,
        other => StudyItemServiceError::Storage(other),
    }
}

/// Orchestrates study item lifecycle and plan generation.
#[derive(Clone)]
pub struct StudyItemService {
    clock: Clock,
    settings: PlannerSettings,
    items: Arc<dyn StudyItemRepository>,
    sessions: Arc<dyn StudySessionRepository>,
}

impl StudyItemService {
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

    /// Create an item and, when a plan is requested, its generated sessions
    /// in one write.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Item` for a blank title,
    /// `StudyItemServiceError::Generate` for invalid hours, or
    /// `StudyItemServiceError::Storage` if persistence fails. Nothing is
    /// stored on error.
    pub async fn create_item(
        &self,
        new: NewStudyItem,
    ) -> Result<PlannedItem, StudyItemServiceError> {
        let now = self.clock.now();
        let mut item = StudyItem::new(
            StudyItemId::generate(),
            new.title,
            new.description,
            new.priority,
            new.due_date,
            now,
        )?;

        let (sessions, unscheduled_hours) = match new.plan {
            Some(plan) => self.plan_sessions(item.id(), plan, now)?,
            None => (Vec::new(), 0.0),
        };
        if let Ok(progress) = aggregator::recompute(&sessions) {
            item.set_progress(progress, now);
        }

        self.items.insert_item(&item, &sessions).await?;
        info!(
            item_id = %item.id(),
            priority = item.priority().as_str(),
            sessions = sessions.len(),
            "created study item"
        );

        Ok(PlannedItem {
            item,
            sessions,
            unscheduled_hours,
        })
    }

    /// Generate and store a plan for an existing item.
    ///
    /// Existing sessions are kept; the item's progress is recomputed over
    /// the enlarged set.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::NotFound` if the item does not exist,
    /// `StudyItemServiceError::Generate` for invalid hours, or
    /// `StudyItemServiceError::Storage` if persistence fails.
    pub async fn generate_plan(
        &self,
        id: &StudyItemId,
        plan: PlanRequest,
    ) -> Result<PlannedItem, StudyItemServiceError> {
        self.get_item(id).await?;
        let now = self.clock.now();
        let (sessions, unscheduled_hours) = self.plan_sessions(id, plan, now)?;

        self.sessions
            .apply_write(SessionWrite::Insert(&sessions), now)
            .await
            .map_err(item_not_found)?;
        info!(item_id = %id, sessions = sessions.len(), "generated study plan");

        Ok(PlannedItem {
            item: self.get_item(id).await?,
            sessions,
            unscheduled_hours,
        })
    }

    /// All items, highest priority first, newest first within a priority.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::Storage` if repository access fails.
    pub async fn list_items(&self) -> Result<Vec<StudyItem>, StudyItemServiceError> {
        Ok(self.items.list_items().await?)
    }

    /// Fetch an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::NotFound` if the item does not exist.
    pub async fn get_item(&self, id: &StudyItemId) -> Result<StudyItem, StudyItemServiceError> {
        self.items
            .get_item(id)
            .await?
            .ok_or(StudyItemServiceError::NotFound)
    }

    /// Apply a partial update and return the stored item.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::NotFound` if the item does not exist,
    /// `StudyItemServiceError::ProgressLocked` when progress is set on an
    /// item that has sessions, `StudyItemServiceError::Item` for a blank
    /// title, or `StudyItemServiceError::Storage` if persistence fails.
    pub async fn update_item(
        &self,
        id: &StudyItemId,
        patch: StudyItemPatch,
    ) -> Result<StudyItem, StudyItemServiceError> {
        let mut item = self.get_item(id).await?;
        if patch.is_empty() {
            return Ok(item);
        }

        let now = self.clock.now();
        if let Some(title) = patch.title {
            item.set_title(title, now)?;
        }
        if let Some(description) = patch.description {
            item.set_description(description, now);
        }
        if let Some(priority) = patch.priority {
            item.set_priority(priority, now);
        }
        if let Some(due_date) = patch.due_date {
            item.set_due_date(due_date, now);
        }
        if let Some(progress) = patch.progress {
            item.set_progress(progress, now);
        }

        let item = self
            .items
            .update_item(&item, patch.progress)
            .await
            .map_err(|e| match e {
                StorageError::DerivedProgress => StudyItemServiceError::ProgressLocked,
                other => item_not_found(other),
            })?;
        info!(item_id = %id, "updated study item");
        Ok(item)
    }

    /// Delete an item and all of its sessions.
    ///
    /// # Errors
    ///
    /// Returns `StudyItemServiceError::NotFound` if the item does not exist.
    pub async fn delete_item(&self, id: &StudyItemId) -> Result<(), StudyItemServiceError> {
        self.items.delete_item(id).await.map_err(item_not_found)?;
        info!(item_id = %id, "deleted study item");
        Ok(())
    }

    fn plan_sessions(
        &self,
        id: &StudyItemId,
        plan: PlanRequest,
        now: DateTime<Utc>,
    ) -> Result<(Vec<StudySession>, f64), StudyItemServiceError> {
        let offset = self.settings.utc_offset;
        let start_date = plan
            .start_date
            .unwrap_or_else(|| self.clock.today(offset));
        let generated = generator::generate(id, plan.total_hours, start_date, offset)?;

        let unscheduled_hours = generated.unscheduled_hours;
        if unscheduled_hours > 0.0 {
            warn!(
                item_id = %id,
                total_hours = plan.total_hours,
                unscheduled_hours,
                "requested hours exceed the weekly cap"
            );
        }

        let sessions = generated
            .into_drafts()
            .into_iter()
            .map(|draft| draft.into_session(StudySessionId::generate(), now))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((sessions, unscheduled_hours))
    }
}
