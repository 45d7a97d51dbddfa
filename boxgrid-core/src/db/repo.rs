//! Repository layer: all SQL lives here.
//!
//! The [`Database`] wraps a single SQLite connection behind a mutex and
//! exposes the storage surface the engine and its callers use: activity
//! CRUD, grid and log access, and upserts for the derived analytics
//! entities. [`Database::log_activity`] is the one compound operation —
//! the grid-cell write and the log append commit atomically or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::types::{
    Activity, ActivityLog, ActivityPattern, DailyGrid, PatternKind, TopActivity, UserAnalytics,
    UserPrefs, WeeklyInsights, WeeklyReport,
};

/// SQLite-backed store for all boxgrid entities.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // User preferences
    // ============================================

    /// Insert or update a user's preferences
    pub fn upsert_user_prefs(&self, prefs: &UserPrefs) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO user_prefs (user_id, default_grid_size)
            VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET
                default_grid_size = excluded.default_grid_size
            "#,
            params![prefs.user_id, prefs.default_grid_size],
        )?;
        Ok(())
    }

    /// Get a user's preferences
    pub fn get_user_prefs(&self, user_id: &str) -> Result<Option<UserPrefs>> {
        let conn = self.conn.lock().unwrap();
        Self::get_user_prefs_conn(&conn, user_id)
    }

    fn get_user_prefs_conn(conn: &Connection, user_id: &str) -> Result<Option<UserPrefs>> {
        conn.query_row(
            "SELECT user_id, default_grid_size FROM user_prefs WHERE user_id = ?",
            [user_id],
            |row| {
                Ok(UserPrefs {
                    user_id: row.get(0)?,
                    default_grid_size: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // ============================================
    // Activity operations
    // ============================================

    /// Insert or update an activity
    pub fn upsert_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO activities (id, user_id, name, color, icon, frequency, target_count, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                color = excluded.color,
                icon = excluded.icon,
                frequency = excluded.frequency,
                target_count = excluded.target_count,
                is_active = excluded.is_active
            "#,
            params![
                activity.id,
                activity.user_id,
                activity.name,
                activity.color,
                activity.icon,
                activity.frequency.as_str(),
                activity.target_count,
                activity.is_active,
                activity.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get one of a user's activities by id
    pub fn get_activity(&self, user_id: &str, id: &str) -> Result<Option<Activity>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM activities WHERE id = ? AND user_id = ?",
            [id, user_id],
            Self::row_to_activity,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List a user's activities, newest first
    pub fn list_activities(&self, user_id: &str, include_inactive: bool) -> Result<Vec<Activity>> {
        let conn = self.conn.lock().unwrap();
        let sql = if include_inactive {
            "SELECT * FROM activities WHERE user_id = ? ORDER BY created_at DESC"
        } else {
            "SELECT * FROM activities WHERE user_id = ? AND is_active = 1 ORDER BY created_at DESC"
        };
        let mut stmt = conn.prepare(sql)?;
        let activities = stmt
            .query_map([user_id], Self::row_to_activity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(activities)
    }

    /// Soft-activate or deactivate an activity
    pub fn set_activity_active(&self, user_id: &str, id: &str, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE activities SET is_active = ?1 WHERE id = ?2 AND user_id = ?3",
            params![active, id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::ActivityNotFound(id.to_string()));
        }
        Ok(())
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<Activity> {
        let frequency_str: String = row.get("frequency")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(Activity {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            frequency: frequency_str.parse().unwrap_or_default(),
            target_count: row.get("target_count")?,
            is_active: row.get("is_active")?,
            created_at: parse_datetime(&created_at_str),
        })
    }

    // ============================================
    // Grid operations
    // ============================================

    /// Insert or update a grid
    pub fn upsert_grid(&self, grid: &DailyGrid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::upsert_grid_conn(&conn, grid)
    }

    fn upsert_grid_conn(conn: &Connection, grid: &DailyGrid) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO daily_grids (user_id, date, grid_size, cells, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, date) DO UPDATE SET
                grid_size = excluded.grid_size,
                cells = excluded.cells,
                notes = excluded.notes
            "#,
            params![
                grid.user_id,
                grid.date.to_string(),
                grid.grid_size,
                serde_json::to_string(grid.cells())?,
                grid.notes,
                grid.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a user's grid for a date
    pub fn get_grid(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyGrid>> {
        let conn = self.conn.lock().unwrap();
        Self::get_grid_conn(&conn, user_id, date)
    }

    fn get_grid_conn(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<Option<DailyGrid>> {
        let row: Option<(u32, String, String, String)> = conn
            .query_row(
                "SELECT grid_size, cells, notes, created_at FROM daily_grids
                 WHERE user_id = ? AND date = ?",
                params![user_id, date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some(raw) => Ok(Some(Self::raw_to_grid(user_id, date, raw)?)),
            None => Ok(None),
        }
    }

    /// Query a user's grids, optionally restricted to an inclusive date range,
    /// ordered by date ascending
    pub fn query_grids(
        &self,
        user_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<DailyGrid>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT date, grid_size, cells, notes, created_at FROM daily_grids WHERE user_id = ?",
        );
        let mut sql_params: Vec<String> = vec![user_id.to_string()];
        if let Some((start, end)) = range {
            sql.push_str(" AND date >= ? AND date <= ?");
            sql_params.push(start.to_string());
            sql_params.push(end.to_string());
        }
        sql.push_str(" ORDER BY date");

        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<(String, u32, String, String, String)> = stmt
            .query_map(params_from_iter(sql_params), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut grids = Vec::with_capacity(rows.len());
        for (date_str, grid_size, cells, notes, created_at) in rows {
            let date = parse_date(&date_str)?;
            grids.push(Self::raw_to_grid(
                user_id,
                date,
                (grid_size, cells, notes, created_at),
            )?);
        }
        Ok(grids)
    }

    /// Rebuild a [`DailyGrid`] from raw columns, revalidating the cell bounds.
    fn raw_to_grid(
        user_id: &str,
        date: NaiveDate,
        raw: (u32, String, String, String),
    ) -> Result<DailyGrid> {
        let (grid_size, cells_json, notes, created_at_str) = raw;
        let cells: BTreeMap<u32, String> = serde_json::from_str(&cells_json)?;
        let mut grid = DailyGrid::with_cells(user_id, date, grid_size, cells)?;
        grid.notes = notes;
        grid.created_at = parse_datetime(&created_at_str);
        Ok(grid)
    }

    // ============================================
    // Log operations
    // ============================================

    /// Append a bare log row.
    ///
    /// Low-level primitive: does NOT touch the grid. Callers logging a
    /// completion should use [`Database::log_activity`], which keeps the
    /// grid cell and the log row consistent in one transaction.
    pub fn append_log(&self, log: &ActivityLog) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO activity_logs (user_id, activity_id, date, grid_position, logged_at, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                log.user_id,
                log.activity_id,
                log.date.to_string(),
                log.grid_position,
                log.logged_at.to_rfc3339(),
                log.notes,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Query a user's logs, optionally restricted to one activity and/or an
    /// inclusive date range.
    ///
    /// Ordered by (date, logged_at, id) so downstream tie-breaks over
    /// iteration order are deterministic.
    pub fn query_logs(
        &self,
        user_id: &str,
        activity_id: Option<&str>,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ActivityLog>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, activity_id, date, grid_position, logged_at, notes
             FROM activity_logs WHERE user_id = ?",
        );
        let mut sql_params: Vec<String> = vec![user_id.to_string()];
        if let Some(activity_id) = activity_id {
            sql.push_str(" AND activity_id = ?");
            sql_params.push(activity_id.to_string());
        }
        if let Some((start, end)) = range {
            sql.push_str(" AND date >= ? AND date <= ?");
            sql_params.push(start.to_string());
            sql_params.push(end.to_string());
        }
        sql.push_str(" ORDER BY date, logged_at, id");

        let mut stmt = conn.prepare(&sql)?;
        let rows: Vec<(i64, String, String, u32, String, String)> = stmt
            .query_map(params_from_iter(sql_params), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut logs = Vec::with_capacity(rows.len());
        for (id, activity_id, date_str, grid_position, logged_at, notes) in rows {
            logs.push(ActivityLog {
                id,
                user_id: user_id.to_string(),
                activity_id,
                date: parse_date(&date_str)?,
                grid_position,
                logged_at: parse_datetime(&logged_at),
                notes,
            });
        }
        Ok(logs)
    }

    /// Count a user's logs, optionally for one activity and/or on or after a
    /// cutoff date
    pub fn count_logs(
        &self,
        user_id: &str,
        activity_id: Option<&str>,
        since: Option<NaiveDate>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from("SELECT COUNT(*) FROM activity_logs WHERE user_id = ?");
        let mut sql_params: Vec<String> = vec![user_id.to_string()];
        if let Some(activity_id) = activity_id {
            sql.push_str(" AND activity_id = ?");
            sql_params.push(activity_id.to_string());
        }
        if let Some(since) = since {
            sql.push_str(" AND date >= ?");
            sql_params.push(since.to_string());
        }

        let count: i64 =
            conn.query_row(&sql, params_from_iter(sql_params), |row| row.get(0))?;
        Ok(count)
    }

    // ============================================
    // Logging a completion (the atomic unit)
    // ============================================

    /// Log an activity completion at a grid cell.
    ///
    /// Runs as a single transaction: loads or creates the date's grid
    /// (using the user's stored default size, falling back to
    /// `default_grid_size`), bounds-checks the position, writes the cell,
    /// and appends the log row. Either both the cell write and the log
    /// append commit, or neither does.
    ///
    /// Logging into an occupied cell replaces the occupant; the previous
    /// occupant's log row remains. Logging the same activity at the same
    /// (date, position) twice violates the store's uniqueness constraint
    /// and fails.
    pub fn log_activity(
        &self,
        user_id: &str,
        activity_id: &str,
        date: NaiveDate,
        position: u32,
        notes: &str,
        default_grid_size: u32,
    ) -> Result<DailyGrid> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Activity must exist, belong to the user, and still be active
        let is_active: Option<bool> = tx
            .query_row(
                "SELECT is_active FROM activities WHERE id = ? AND user_id = ?",
                [activity_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if is_active != Some(true) {
            return Err(Error::ActivityNotFound(activity_id.to_string()));
        }

        let mut grid = match Self::get_grid_conn(&tx, user_id, date)? {
            Some(grid) => grid,
            None => {
                let size = Self::get_user_prefs_conn(&tx, user_id)?
                    .map(|p| p.default_grid_size)
                    .unwrap_or(default_grid_size);
                tracing::debug!(user_id, %date, size, "Creating grid for new date");
                DailyGrid::new(user_id, date, size)
            }
        };

        grid.set_cell(position, activity_id)?;
        Self::upsert_grid_conn(&tx, &grid)?;

        tx.execute(
            r#"
            INSERT INTO activity_logs (user_id, activity_id, date, grid_position, logged_at, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id,
                activity_id,
                date.to_string(),
                position,
                Utc::now().to_rfc3339(),
                notes,
            ],
        )?;

        tx.commit()?;
        Ok(grid)
    }

    // ============================================
    // Derived: user analytics
    // ============================================

    /// Overwrite a user's analytics rollup wholesale
    pub fn upsert_user_analytics(&self, analytics: &UserAnalytics) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO user_analytics (user_id, total_activities_logged, total_days_tracked,
                                        current_streak, longest_streak, average_completion_rate,
                                        last_activity_date, computed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id) DO UPDATE SET
                total_activities_logged = excluded.total_activities_logged,
                total_days_tracked = excluded.total_days_tracked,
                current_streak = excluded.current_streak,
                longest_streak = excluded.longest_streak,
                average_completion_rate = excluded.average_completion_rate,
                last_activity_date = excluded.last_activity_date,
                computed_at = excluded.computed_at
            "#,
            params![
                analytics.user_id,
                analytics.total_activities_logged,
                analytics.total_days_tracked,
                analytics.current_streak,
                analytics.longest_streak,
                analytics.average_completion_rate,
                analytics.last_activity_date.map(|d| d.to_string()),
                analytics.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a user's analytics rollup
    pub fn get_user_analytics(&self, user_id: &str) -> Result<Option<UserAnalytics>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM user_analytics WHERE user_id = ?",
            [user_id],
            |row| {
                let last_activity_str: Option<String> = row.get("last_activity_date")?;
                let computed_at_str: String = row.get("computed_at")?;
                Ok(UserAnalytics {
                    user_id: row.get("user_id")?,
                    total_activities_logged: row.get("total_activities_logged")?,
                    total_days_tracked: row.get("total_days_tracked")?,
                    current_streak: row.get("current_streak")?,
                    longest_streak: row.get("longest_streak")?,
                    average_completion_rate: row.get("average_completion_rate")?,
                    last_activity_date: last_activity_str.and_then(|s| s.parse().ok()),
                    computed_at: parse_datetime(&computed_at_str),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // ============================================
    // Derived: weekly reports
    // ============================================

    /// Insert or replace the report for (user, week_start).
    ///
    /// Every field is overwritten; regenerating a week replaces the prior
    /// snapshot rather than merging into it.
    pub fn upsert_weekly_report(&self, report: &WeeklyReport) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO weekly_reports (user_id, week_start, week_end, total_activities,
                                        completion_rate, streak_maintained, top_activities,
                                        best_day, activity_diversity, consistency_score, generated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(user_id, week_start) DO UPDATE SET
                week_end = excluded.week_end,
                total_activities = excluded.total_activities,
                completion_rate = excluded.completion_rate,
                streak_maintained = excluded.streak_maintained,
                top_activities = excluded.top_activities,
                best_day = excluded.best_day,
                activity_diversity = excluded.activity_diversity,
                consistency_score = excluded.consistency_score,
                generated_at = excluded.generated_at
            "#,
            params![
                report.user_id,
                report.week_start.to_string(),
                report.week_end.to_string(),
                report.total_activities,
                report.completion_rate,
                report.streak_maintained,
                serde_json::to_string(&report.top_activities)?,
                report.insights.best_day,
                report.insights.activity_diversity,
                report.insights.consistency_score,
                report.generated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get the report for (user, week_start)
    pub fn get_weekly_report(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyReport>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, i64, f64, bool, String, Option<String>, i64, f64, String)> = conn
            .query_row(
                r#"
                SELECT week_end, total_activities, completion_rate, streak_maintained,
                       top_activities, best_day, activity_diversity, consistency_score, generated_at
                FROM weekly_reports WHERE user_id = ? AND week_start = ?
                "#,
                params![user_id, week_start.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            week_end,
            total_activities,
            completion_rate,
            streak_maintained,
            top_activities_json,
            best_day,
            activity_diversity,
            consistency_score,
            generated_at,
        )) = row
        else {
            return Ok(None);
        };

        let top_activities: Vec<TopActivity> = serde_json::from_str(&top_activities_json)?;
        Ok(Some(WeeklyReport {
            user_id: user_id.to_string(),
            week_start,
            week_end: parse_date(&week_end)?,
            total_activities,
            completion_rate,
            streak_maintained,
            top_activities,
            insights: WeeklyInsights {
                best_day,
                activity_diversity,
                consistency_score,
            },
            generated_at: parse_datetime(&generated_at),
        }))
    }

    // ============================================
    // Derived: activity patterns
    // ============================================

    /// Insert or replace a pattern for (user, activity, kind)
    pub fn upsert_activity_pattern(&self, pattern: &ActivityPattern) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO activity_patterns (user_id, activity_id, kind, data, confidence, computed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, activity_id, kind) DO UPDATE SET
                data = excluded.data,
                confidence = excluded.confidence,
                computed_at = excluded.computed_at
            "#,
            params![
                pattern.user_id,
                pattern.activity_id,
                pattern.kind.as_str(),
                pattern.data.to_string(),
                pattern.confidence,
                pattern.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a pattern for (user, activity, kind)
    pub fn get_activity_pattern(
        &self,
        user_id: &str,
        activity_id: &str,
        kind: PatternKind,
    ) -> Result<Option<ActivityPattern>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT data, confidence, computed_at FROM activity_patterns
             WHERE user_id = ? AND activity_id = ? AND kind = ?",
            [user_id, activity_id, kind.as_str()],
            |row| {
                let data_str: String = row.get(0)?;
                let computed_at_str: String = row.get(2)?;
                Ok(ActivityPattern {
                    user_id: user_id.to_string(),
                    activity_id: activity_id.to_string(),
                    kind,
                    data: serde_json::from_str(&data_str).unwrap_or(serde_json::json!({})),
                    confidence: row.get(1)?,
                    computed_at: parse_datetime(&computed_at_str),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

/// Parse an RFC 3339 timestamp, falling back to now on malformed input.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored `YYYY-MM-DD` date column.
fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .map_err(|_| Error::Parse(format!("malformed date in store: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_GRID_SIZE;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_activity_crud() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        let retrieved = db.get_activity("user-1", &activity.id).unwrap().unwrap();
        assert_eq!(retrieved.name, "Read");
        assert!(retrieved.is_active);

        // Scoped to owner
        assert!(db.get_activity("user-2", &activity.id).unwrap().is_none());

        db.set_activity_active("user-1", &activity.id, false).unwrap();
        let active = db.list_activities("user-1", false).unwrap();
        assert!(active.is_empty());
        let all = db.list_activities("user-1", true).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_set_activity_active_unknown_id() {
        let db = test_db();
        let err = db.set_activity_active("user-1", "no-such-id", false).unwrap_err();
        assert!(matches!(err, Error::ActivityNotFound(_)));
    }

    #[test]
    fn test_grid_round_trip() {
        let db = test_db();
        let mut grid = DailyGrid::new("user-1", date(2025, 3, 10), 36);
        grid.set_cell(0, "activity-a").unwrap();
        grid.set_cell(35, "activity-b").unwrap();
        grid.notes = "good day".to_string();
        db.upsert_grid(&grid).unwrap();

        let retrieved = db.get_grid("user-1", date(2025, 3, 10)).unwrap().unwrap();
        assert_eq!(retrieved.grid_size, 36);
        assert_eq!(retrieved.activity_at(0), Some("activity-a"));
        assert_eq!(retrieved.activity_at(35), Some("activity-b"));
        assert_eq!(retrieved.notes, "good day");
        assert_eq!(retrieved.occupied_cells(), 2);
    }

    #[test]
    fn test_log_activity_creates_grid_and_log() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        let grid = db
            .log_activity("user-1", &activity.id, date(2025, 3, 10), 3, "", DEFAULT_GRID_SIZE)
            .unwrap();
        assert_eq!(grid.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(grid.activity_at(3), Some(activity.id.as_str()));

        // Both sides of the atomic unit are visible
        assert!(db.get_grid("user-1", date(2025, 3, 10)).unwrap().is_some());
        let logs = db.query_logs("user-1", None, None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].grid_position, 3);
    }

    #[test]
    fn test_log_activity_uses_user_default_grid_size() {
        let db = test_db();
        db.upsert_user_prefs(&UserPrefs {
            user_id: "user-1".to_string(),
            default_grid_size: 64,
        })
        .unwrap();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        let grid = db
            .log_activity("user-1", &activity.id, date(2025, 3, 10), 63, "", DEFAULT_GRID_SIZE)
            .unwrap();
        assert_eq!(grid.grid_size, 64);
    }

    #[test]
    fn test_log_activity_invalid_position_commits_nothing() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        let err = db
            .log_activity("user-1", &activity.id, date(2025, 3, 10), 16, "", DEFAULT_GRID_SIZE)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { .. }));

        // Neither the grid nor the log row was committed
        assert!(db.get_grid("user-1", date(2025, 3, 10)).unwrap().is_none());
        assert!(db.query_logs("user-1", None, None).unwrap().is_empty());
    }

    #[test]
    fn test_log_activity_rejects_inactive_or_foreign_activity() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();
        db.set_activity_active("user-1", &activity.id, false).unwrap();

        let err = db
            .log_activity("user-1", &activity.id, date(2025, 3, 10), 0, "", DEFAULT_GRID_SIZE)
            .unwrap_err();
        assert!(matches!(err, Error::ActivityNotFound(_)));

        // Wrong owner looks the same as missing
        let other = Activity::new("user-2", "Run");
        db.upsert_activity(&other).unwrap();
        let err = db
            .log_activity("user-1", &other.id, date(2025, 3, 10), 0, "", DEFAULT_GRID_SIZE)
            .unwrap_err();
        assert!(matches!(err, Error::ActivityNotFound(_)));
    }

    #[test]
    fn test_duplicate_log_rejected_by_store() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        db.log_activity("user-1", &activity.id, date(2025, 3, 10), 3, "", DEFAULT_GRID_SIZE)
            .unwrap();
        // Same activity, same date, same cell: unique constraint
        let err = db
            .log_activity("user-1", &activity.id, date(2025, 3, 10), 3, "", DEFAULT_GRID_SIZE)
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));

        // Same activity in a different cell the same day is fine
        db.log_activity("user-1", &activity.id, date(2025, 3, 10), 4, "", DEFAULT_GRID_SIZE)
            .unwrap();
    }

    #[test]
    fn test_cell_overwrite_keeps_both_log_rows() {
        let db = test_db();
        let read = Activity::new("user-1", "Read");
        let run = Activity::new("user-1", "Run");
        db.upsert_activity(&read).unwrap();
        db.upsert_activity(&run).unwrap();

        db.log_activity("user-1", &read.id, date(2025, 3, 10), 3, "", DEFAULT_GRID_SIZE)
            .unwrap();
        let grid = db
            .log_activity("user-1", &run.id, date(2025, 3, 10), 3, "", DEFAULT_GRID_SIZE)
            .unwrap();

        // Last write wins in the grid view
        assert_eq!(grid.activity_at(3), Some(run.id.as_str()));
        // Append-only history keeps both rows
        let logs = db.query_logs("user-1", None, None).unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[test]
    fn test_append_log_does_not_touch_grid() {
        let db = test_db();
        let activity = Activity::new("user-1", "Read");
        db.upsert_activity(&activity).unwrap();

        let id = db
            .append_log(&ActivityLog {
                id: 0,
                user_id: "user-1".to_string(),
                activity_id: activity.id.clone(),
                date: date(2025, 3, 10),
                grid_position: 3,
                logged_at: Utc::now(),
                notes: String::new(),
            })
            .unwrap();
        assert!(id > 0);

        // Bare primitive: the log row exists but no grid was created
        assert_eq!(db.query_logs("user-1", None, None).unwrap().len(), 1);
        assert!(db.get_grid("user-1", date(2025, 3, 10)).unwrap().is_none());
    }

    #[test]
    fn test_query_logs_filters() {
        let db = test_db();
        let read = Activity::new("user-1", "Read");
        db.upsert_activity(&read).unwrap();

        for (day, position) in [(10, 0), (11, 0), (14, 0)] {
            db.log_activity("user-1", &read.id, date(2025, 3, day), position, "", DEFAULT_GRID_SIZE)
                .unwrap();
        }

        let in_range = db
            .query_logs("user-1", None, Some((date(2025, 3, 10), date(2025, 3, 12))))
            .unwrap();
        assert_eq!(in_range.len(), 2);

        assert_eq!(db.count_logs("user-1", None, None).unwrap(), 3);
        assert_eq!(
            db.count_logs("user-1", Some(&read.id), Some(date(2025, 3, 12))).unwrap(),
            1
        );
        assert_eq!(db.count_logs("user-2", None, None).unwrap(), 0);
    }

    #[test]
    fn test_weekly_report_upsert_replaces() {
        let db = test_db();
        let monday = date(2025, 3, 10);
        let mut report = WeeklyReport {
            user_id: "user-1".to_string(),
            week_start: monday,
            week_end: date(2025, 3, 16),
            total_activities: 3,
            completion_rate: 12.5,
            streak_maintained: false,
            top_activities: vec![],
            insights: WeeklyInsights::default(),
            generated_at: Utc::now(),
        };
        db.upsert_weekly_report(&report).unwrap();

        report.total_activities = 9;
        report.streak_maintained = true;
        db.upsert_weekly_report(&report).unwrap();

        let stored = db.get_weekly_report("user-1", monday).unwrap().unwrap();
        assert_eq!(stored.total_activities, 9);
        assert!(stored.streak_maintained);
    }
}
