use chrono::{Datelike, IsoWeek, NaiveDate, NaiveDateTime, Timelike};

use crate::models::Settings;

pub const DAILY_SUFFIX: &str = "daily";
pub const WEEKLY_SUFFIX: &str = "weekly";
pub const MONTHLY_SUFFIX: &str = "monthly";

/// Calendar positions of the last fired resets. Comparisons use calendar
/// identity rather than elapsed time: a clock set backward never re-fires,
/// and a jump forward across a boundary fires exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetMarkers {
    day: NaiveDate,
    week: IsoWeek,
    month: (i32, u32),
}

impl ResetMarkers {
    pub fn capture(now: NaiveDateTime) -> Self {
        Self {
            day: now.date(),
            week: now.iso_week(),
            month: (now.year(), now.month()),
        }
    }

    pub fn mark_daily(&mut self, now: NaiveDateTime) {
        self.day = now.date();
    }

    pub fn mark_weekly(&mut self, now: NaiveDateTime) {
        self.week = now.iso_week();
    }

    pub fn mark_monthly(&mut self, now: NaiveDateTime) {
        self.month = (now.year(), now.month());
    }
}

/// Due only at the configured wall-clock minute, and at most once per
/// calendar day.
pub fn daily_reset_due(markers: &ResetMarkers, now: NaiveDateTime, settings: &Settings) -> bool {
    now.hour() == settings.reset_hour
        && now.minute() == settings.reset_minute
        && now.date() != markers.day
}

pub fn weekly_reset_due(markers: &ResetMarkers, now: NaiveDateTime) -> bool {
    now.iso_week() != markers.week
}

pub fn monthly_reset_due(markers: &ResetMarkers, now: NaiveDateTime) -> bool {
    (now.year(), now.month()) != markers.month
}

/// The reset cadence of a category is inferred from its name suffix,
/// case-insensitively ("Workout Weekly", "errands daily", ...). Kept as a
/// naming convention for data-file compatibility.
pub fn has_cadence_suffix(name: &str, suffix: &str) -> bool {
    name.to_lowercase().ends_with(suffix)
}
