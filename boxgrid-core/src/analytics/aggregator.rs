//! Rolling completion rates and the wholesale user-analytics recompute.
//!
//! Everything here is a pure function over logs and grids; the only
//! database-touching entry point, [`compute_user_analytics`], queries and
//! computes but leaves persistence to the caller
//! ([`crate::db::Database::upsert_user_analytics`]).

use chrono::{Days, NaiveDate, Utc};
use std::collections::HashSet;

use crate::db::Database;
use crate::error::Result;
use crate::types::{ActivityLog, DailyGrid, UserAnalytics};

use super::streaks;

/// Completion rate for a trailing window, in [0, 100].
///
/// `min(100, 100 * count / window_days)`. The cap matters: an activity can
/// occupy multiple cells per day, so the raw count may exceed one log per
/// window day.
pub fn completion_rate(log_count: i64, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }
    let rate = (log_count as f64 / window_days as f64) * 100.0;
    rate.min(100.0)
}

/// Completion rate for one activity over the trailing window ending today.
pub fn activity_completion_rate(
    db: &Database,
    user_id: &str,
    activity_id: &str,
    today: NaiveDate,
    window_days: u32,
) -> Result<f64> {
    let since = today
        .checked_sub_days(Days::new(window_days as u64))
        .unwrap_or(NaiveDate::MIN);
    let count = db.count_logs(user_id, Some(activity_id), Some(since))?;
    Ok(completion_rate(count, window_days))
}

/// Arithmetic mean of grid completion percentages.
///
/// Returns 0.0 for an empty collection rather than dividing by zero.
pub fn average_completion_rate(grids: &[DailyGrid]) -> f64 {
    if grids.is_empty() {
        return 0.0;
    }
    let total: f64 = grids.iter().map(|g| g.completion_percentage()).sum();
    total / grids.len() as f64
}

/// Recompute a user's analytics rollup from their full history.
///
/// Pure: takes the complete log and grid sets and returns a fresh
/// [`UserAnalytics`] value. Intentionally a full scan rather than an
/// incremental update; every field is recomputed from scratch so the
/// result can always overwrite the stored row wholesale.
pub fn recompute_user_analytics(
    user_id: &str,
    logs: &[ActivityLog],
    grids: &[DailyGrid],
    today: NaiveDate,
    window_days: u32,
) -> UserAnalytics {
    let log_dates: HashSet<NaiveDate> = logs.iter().map(|l| l.date).collect();

    let window_start = today
        .checked_sub_days(Days::new(window_days as u64))
        .unwrap_or(NaiveDate::MIN);
    let window_grids: Vec<DailyGrid> = grids
        .iter()
        .filter(|g| g.date >= window_start)
        .cloned()
        .collect();

    UserAnalytics {
        user_id: user_id.to_string(),
        total_activities_logged: logs.len() as i64,
        total_days_tracked: grids.len() as i64,
        current_streak: streaks::current_streak(&log_dates, today),
        longest_streak: streaks::longest_streak(&log_dates),
        average_completion_rate: average_completion_rate(&window_grids),
        last_activity_date: logs.iter().map(|l| l.date).max(),
        computed_at: Utc::now(),
    }
}

/// Query a user's full history and recompute their analytics rollup.
///
/// The caller persists the result; concurrent recomputes are safe to run
/// redundantly since the last writer overwrites every field.
pub fn compute_user_analytics(
    db: &Database,
    user_id: &str,
    today: NaiveDate,
    window_days: u32,
) -> Result<UserAnalytics> {
    let logs = db.query_logs(user_id, None, None)?;
    let grids = db.query_grids(user_id, None)?;

    tracing::debug!(
        user_id,
        logs = logs.len(),
        grids = grids.len(),
        "Recomputing user analytics"
    );

    Ok(recompute_user_analytics(
        user_id,
        &logs,
        &grids,
        today,
        window_days,
    ))
}
