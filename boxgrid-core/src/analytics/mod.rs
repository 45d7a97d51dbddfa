//! Analytics for boxgrid
//!
//! Derived statistics over the grid and log history:
//! - Streak calculation (current and longest consecutive-day runs)
//! - Completion rates and the wholesale user-analytics recompute
//! - Day-of-week pattern detection with confidence scores
//! - Weekly summary reports
//!
//! All computation here is pure over logs and grids; the `compute_*` /
//! `generate_*` entry points query the store and return fresh values, and
//! the caller decides whether to persist them. Derived rows are always
//! overwritten wholesale, never merged.

pub mod aggregator;
pub mod patterns;
pub mod report;
pub mod streaks;

pub use aggregator::{
    activity_completion_rate, average_completion_rate, completion_rate, compute_user_analytics,
    recompute_user_analytics,
};
pub use patterns::{compute_activity_patterns, detect_day_of_week_pattern};
pub use report::{build_weekly_report, generate_weekly_report};
pub use streaks::{current_streak, longest_streak};

/// Get the weekday name from a Monday-based index (0 = Monday).
pub fn weekday_name(day: u8) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "Unknown",
    }
}
