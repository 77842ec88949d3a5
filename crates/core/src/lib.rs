#![forbid(unsafe_code)]

pub mod aggregator;
pub mod analytics;
pub mod calendar;
pub mod generator;
pub mod model;
pub mod time;

pub use time::Clock;
