use chrono::{FixedOffset, Weekday};
use planner_core::calendar::WeekLayout;
use planner_core::time::utc_offset;

use crate::messages::Locale;

/// Runtime knobs shared by every service.
///
/// Built once by the binary from flags and environment, then passed by
/// reference; nothing here is read from globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerSettings {
    /// Offset treated as local time for "today", 18:00 slots and week grids.
    pub utc_offset: FixedOffset,
    pub week_start: Weekday,
    pub default_locale: Locale,
}

impl PlannerSettings {
    #[must_use]
    pub fn layout(&self) -> WeekLayout {
        WeekLayout::new(self.utc_offset, self.week_start)
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            utc_offset: utc_offset(),
            week_start: Weekday::Sun,
            default_locale: Locale::default(),
        }
    }
}
