//! Pattern detection over activity logs.
//!
//! Produces [`ActivityPattern`] rows with a confidence score in [0, 1].
//! The detector implemented here is day-of-week concentration: how
//! strongly an activity's completions cluster on one weekday.

use chrono::{Datelike, Utc};
use serde_json::json;

use crate::db::Database;
use crate::error::Result;
use crate::types::{ActivityLog, ActivityPattern, PatternKind};

use super::weekday_name;

/// Detect a day-of-week pattern for one activity's logs.
///
/// Confidence is the share of logs falling on the peak weekday, so a
/// uniformly-spread activity scores ~1/7 and a Mondays-only activity
/// scores 1.0. Ties on the peak go to the earliest weekday (Monday
/// first). Returns None when the activity has no logs.
pub fn detect_day_of_week_pattern(
    user_id: &str,
    activity_id: &str,
    logs: &[ActivityLog],
) -> Option<ActivityPattern> {
    if logs.is_empty() {
        return None;
    }

    let mut counts = [0i64; 7];
    for log in logs {
        counts[log.date.weekday().num_days_from_monday() as usize] += 1;
    }

    let mut peak = 0usize;
    for (day, &count) in counts.iter().enumerate() {
        if count > counts[peak] {
            peak = day;
        }
    }

    let total: i64 = counts.iter().sum();
    let peak_name = weekday_name(peak as u8);

    let mut counts_by_day = serde_json::Map::new();
    for (day, &count) in counts.iter().enumerate() {
        counts_by_day.insert(weekday_name(day as u8).to_string(), json!(count));
    }
    let data = json!({
        "counts": counts_by_day,
        "peak_day": peak_name,
    });

    Some(ActivityPattern {
        user_id: user_id.to_string(),
        activity_id: activity_id.to_string(),
        kind: PatternKind::DayOfWeek,
        data,
        confidence: counts[peak] as f64 / total as f64,
        computed_at: Utc::now(),
    })
}

/// Detect patterns for all of a user's active activities.
///
/// The caller persists the results via
/// [`crate::db::Database::upsert_activity_pattern`].
pub fn compute_activity_patterns(db: &Database, user_id: &str) -> Result<Vec<ActivityPattern>> {
    let mut patterns = Vec::new();
    for activity in db.list_activities(user_id, false)? {
        let logs = db.query_logs(user_id, Some(&activity.id), None)?;
        if let Some(pattern) = detect_day_of_week_pattern(user_id, &activity.id, &logs) {
            patterns.push(pattern);
        }
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    fn log_on(date: NaiveDate) -> ActivityLog {
        ActivityLog {
            id: 0,
            user_id: "user-1".to_string(),
            activity_id: "activity-a".to_string(),
            date,
            grid_position: 0,
            logged_at: DateTime::from_timestamp(0, 0).unwrap(),
            notes: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_no_logs_no_pattern() {
        assert!(detect_day_of_week_pattern("user-1", "activity-a", &[]).is_none());
    }

    #[test]
    fn test_single_weekday_full_confidence() {
        // Three consecutive Mondays
        let logs = vec![
            log_on(date(2025, 3, 3)),
            log_on(date(2025, 3, 10)),
            log_on(date(2025, 3, 17)),
        ];
        let pattern = detect_day_of_week_pattern("user-1", "activity-a", &logs).unwrap();
        assert_eq!(pattern.kind, PatternKind::DayOfWeek);
        assert_eq!(pattern.confidence, 1.0);
        assert_eq!(pattern.data["peak_day"], "Monday");
    }

    #[test]
    fn test_peak_tie_goes_to_earliest_weekday() {
        // One Tuesday, one Thursday: tie resolves Monday-first, so Tuesday
        let logs = vec![log_on(date(2025, 3, 4)), log_on(date(2025, 3, 6))];
        let pattern = detect_day_of_week_pattern("user-1", "activity-a", &logs).unwrap();
        assert_eq!(pattern.data["peak_day"], "Tuesday");
        assert_eq!(pattern.confidence, 0.5);
    }
}
