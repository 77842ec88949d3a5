//! Shared error types for the services crate.

use chrono::NaiveDate;
use thiserror::Error;

use planner_core::generator::GenerateError;
use planner_core::model::{StudyItemError, StudySessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::messages::CatalogError;

/// Errors emitted by `StudyItemService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyItemServiceError {
    #[error("study item not found")]
    NotFound,
    #[error("progress is derived from sessions and cannot be set directly")]
    ProgressLocked,
    #[error(transparent)]
    Item(#[from] StudyItemError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudySessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudySessionServiceError {
    #[error("study session not found")]
    NotFound,
    #[error("study item not found")]
    ItemNotFound,
    #[error("at least one session is required")]
    EmptyBatch,
    #[error("no fields to update")]
    NoChanges,
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CalendarService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CalendarServiceError {
    #[error("the week around {reference} is outside the supported date range")]
    WeekOutOfRange { reference: NaiveDate },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
