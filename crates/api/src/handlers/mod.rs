//! Route handlers, one module per resource.

pub mod calendar;
pub mod health;
pub mod messages;
pub mod progress;
pub mod study_items;
pub mod study_sessions;
