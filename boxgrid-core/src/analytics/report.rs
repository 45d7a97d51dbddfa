//! Weekly report generation.
//!
//! A weekly report is a derived snapshot of one user's activity over
//! `[week_start, week_start + 6]` inclusive. [`build_weekly_report`] is a
//! pure function over the week's logs and grids;
//! [`generate_weekly_report`] composes the store queries. Persisting the
//! result (and replacing any prior snapshot for the same week) is the
//! caller's [`crate::db::Database::upsert_weekly_report`] step.

use chrono::{Datelike, Days, NaiveDate, Utc};
use std::collections::HashMap;

use crate::config::AnalyticsConfig;
use crate::db::Database;
use crate::error::Result;
use crate::types::{Activity, ActivityLog, DailyGrid, TopActivity, WeeklyInsights, WeeklyReport};

use super::{aggregator, weekday_name};

/// Build a weekly report from the week's logs and grids.
///
/// `logs` must already be restricted to the week and ordered by
/// (date, logged_at); that ordering is what makes the top-activities and
/// best-day tie-breaks deterministic (count ties go to the entry seen
/// first).
pub fn build_weekly_report(
    user_id: &str,
    week_start: NaiveDate,
    logs: &[ActivityLog],
    grids: &[DailyGrid],
    activities: &[Activity],
    top_count: usize,
) -> WeeklyReport {
    let week_end = week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(week_start);

    let names: HashMap<&str, &str> = activities
        .iter()
        .map(|a| (a.id.as_str(), a.name.as_str()))
        .collect();

    // Count occurrences per activity, preserving first-seen order
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for log in logs {
        match index.get(&log.activity_id) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(log.activity_id.clone(), order.len());
                order.push((log.activity_id.clone(), 1));
            }
        }
    }
    let activity_diversity = order.len() as i64;

    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    let top_activities: Vec<TopActivity> = order
        .into_iter()
        .take(top_count)
        .map(|(activity_id, count)| {
            let name = names
                .get(activity_id.as_str())
                .map(|n| n.to_string())
                .unwrap_or_else(|| activity_id.clone());
            TopActivity {
                activity_id,
                name,
                count,
            }
        })
        .collect();

    WeeklyReport {
        user_id: user_id.to_string(),
        week_start,
        week_end,
        total_activities: logs.len() as i64,
        completion_rate: aggregator::average_completion_rate(grids),
        streak_maintained: streak_maintained(logs, week_start, week_end),
        top_activities,
        insights: build_insights(logs),
        generated_at: Utc::now(),
    }
}

/// Insights block: best day, diversity, consistency.
fn build_insights(logs: &[ActivityLog]) -> WeeklyInsights {
    // Logs per weekday, preserving first-seen order for the tie-break
    let mut day_order: Vec<(u8, i64)> = Vec::new();
    for log in logs {
        let day = log.date.weekday().num_days_from_monday() as u8;
        match day_order.iter_mut().find(|(d, _)| *d == day) {
            Some(entry) => entry.1 += 1,
            None => day_order.push((day, 1)),
        }
    }

    let mut best_day: Option<(u8, i64)> = None;
    for &(day, count) in &day_order {
        if best_day.map_or(true, |(_, best)| count > best) {
            best_day = Some((day, count));
        }
    }

    let distinct_activities = logs
        .iter()
        .map(|l| l.activity_id.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len() as i64;
    let distinct_days = logs
        .iter()
        .map(|l| l.date)
        .collect::<std::collections::HashSet<_>>()
        .len();

    WeeklyInsights {
        best_day: best_day.map(|(day, _)| weekday_name(day).to_string()),
        activity_diversity: distinct_activities,
        consistency_score: (distinct_days as f64 / 7.0) * 100.0,
    }
}

/// True iff every one of the 7 days has at least one log.
///
/// Short-circuits to false on the first missing day.
fn streak_maintained(logs: &[ActivityLog], week_start: NaiveDate, week_end: NaiveDate) -> bool {
    let log_dates: std::collections::HashSet<NaiveDate> = logs.iter().map(|l| l.date).collect();

    let mut day = week_start;
    while day <= week_end {
        if !log_dates.contains(&day) {
            return false;
        }
        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    true
}

/// Query the week's data and build the report.
///
/// Inactive activities are included in name resolution since the week's
/// logs may reference a since-deactivated activity.
pub fn generate_weekly_report(
    db: &Database,
    user_id: &str,
    week_start: NaiveDate,
    config: &AnalyticsConfig,
) -> Result<WeeklyReport> {
    let week_end = week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(week_start);

    let logs = db.query_logs(user_id, None, Some((week_start, week_end)))?;
    let grids = db.query_grids(user_id, Some((week_start, week_end)))?;
    let activities = db.list_activities(user_id, true)?;

    tracing::debug!(
        user_id,
        %week_start,
        logs = logs.len(),
        grids = grids.len(),
        "Generating weekly report"
    );

    Ok(build_weekly_report(
        user_id,
        week_start,
        &logs,
        &grids,
        &activities,
        config.top_activities_count,
    ))
}
