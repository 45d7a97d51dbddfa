//! Streak calculation over sets of log dates.
//!
//! A streak is a run of consecutive calendar days, each with at least one
//! logged activity. Both functions work on a pre-built date set so
//! membership tests are O(1); neither rescans the full history per day.

use chrono::{Days, NaiveDate};
use std::collections::HashSet;

/// Consecutive days with activity, counting backward from `as_of`.
///
/// Stops at the first missing day, so the result is 0 when `as_of` itself
/// has no entry. Runs in O(streak length).
pub fn current_streak(log_dates: &HashSet<NaiveDate>, as_of: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut day = as_of;

    while log_dates.contains(&day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }

    streak
}

/// Longest run of consecutive days anywhere in the history.
///
/// Single linear pass over the sorted dates: the running count grows while
/// successive dates differ by exactly one day and resets on any gap.
/// Returns 0 for an empty set.
pub fn longest_streak(log_dates: &HashSet<NaiveDate>) -> u32 {
    let mut dates: Vec<NaiveDate> = log_dates.iter().copied().collect();
    dates.sort_unstable();

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for date in dates {
        run = match prev {
            Some(prev) if (date - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }

    longest
}
