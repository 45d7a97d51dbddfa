//! Core domain types for boxgrid
//!
//! These types form the canonical data model for the habit-tracking engine:
//! user-defined activities, the daily grid of cells they are logged into,
//! the append-only activity log, and the derived analytics entities.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Activity** | A user-defined habit that can be logged into the grid |
//! | **DailyGrid** | A fixed-capacity set of numbered cells for one user on one date |
//! | **ActivityLog** | An immutable record of one activity placed at one cell on one date |
//! | **UserAnalytics** | A derived per-user rollup, recomputed wholesale on demand |
//! | **WeeklyReport** | A derived, replaceable snapshot of one 7-day window |
//!
//! The grid is a mutable *view* (cells can be overwritten), while the log is
//! append-only history. The two are kept consistent by
//! [`crate::db::Database::log_activity`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grid size used when neither user preferences nor config say otherwise.
pub const DEFAULT_GRID_SIZE: u32 = 16;

/// Return grid dimensions (rows, cols) for a grid size.
///
/// 16 -> 4x4, 36 -> 6x6, 64 -> 8x8. Any other value falls back to 4x4;
/// this is a defensive default, not a validation error.
pub fn grid_dimensions(grid_size: u32) -> (u32, u32) {
    match grid_size {
        16 => (4, 4),
        36 => (6, 6),
        64 => (8, 8),
        _ => (4, 4),
    }
}

// ============================================
// Activity
// ============================================

/// Scheduling frequency for an activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            _ => Err(format!("unknown frequency: {}", s)),
        }
    }
}

/// A user-defined activity that can be logged in the grid.
///
/// Identity (`id`) is immutable once created. Activities are
/// soft-deactivated rather than deleted while logs reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique identifier (UUID v4, generated at creation)
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Display name, unique per user
    pub name: String,
    /// Hex display color
    pub color: String,
    /// Icon name
    pub icon: String,
    /// Scheduling frequency
    pub frequency: Frequency,
    /// Target completions per frequency period (1-100)
    pub target_count: u32,
    /// Soft-deactivation flag
    pub is_active: bool,
    /// When the activity was created
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Create a new activity with generated id and default presentation.
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            color: "#3B82F6".to_string(),
            icon: "star".to_string(),
            frequency: Frequency::Daily,
            target_count: 1,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

// ============================================
// Daily Grid
// ============================================

/// One user's grid of cells for one date.
///
/// At most one grid exists per (user, date). Cells are sparse: an absent
/// position means "not logged". Every present position is in
/// `[0, grid_size)` — the bound is enforced at construction
/// ([`DailyGrid::with_cells`]) and at every write ([`DailyGrid::set_cell`]),
/// so a `DailyGrid` value never holds an out-of-bounds cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyGrid {
    /// Owning user
    pub user_id: String,
    /// Calendar date this grid covers
    pub date: NaiveDate,
    /// Total cell count (16, 36, or 64)
    pub grid_size: u32,
    /// Position -> activity id
    cells: BTreeMap<u32, String>,
    /// Free-form notes for the day
    pub notes: String,
    /// When the grid row was created
    pub created_at: DateTime<Utc>,
}

impl DailyGrid {
    /// Create an empty grid.
    pub fn new(user_id: impl Into<String>, date: NaiveDate, grid_size: u32) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            grid_size,
            cells: BTreeMap::new(),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Reconstruct a grid from stored cells, rejecting any out-of-bounds
    /// position.
    pub fn with_cells(
        user_id: impl Into<String>,
        date: NaiveDate,
        grid_size: u32,
        cells: BTreeMap<u32, String>,
    ) -> crate::error::Result<Self> {
        if let Some(&position) = cells.keys().find(|&&p| p >= grid_size) {
            return Err(crate::error::Error::InvalidPosition {
                position,
                grid_size,
            });
        }
        Ok(Self {
            user_id: user_id.into(),
            date,
            grid_size,
            cells,
            notes: String::new(),
            created_at: Utc::now(),
        })
    }

    /// Grid dimensions (rows, cols) for this grid's size.
    pub fn dimensions(&self) -> (u32, u32) {
        grid_dimensions(self.grid_size)
    }

    /// Set the activity occupying a cell.
    ///
    /// Overwrites any existing occupant; the last write wins and no
    /// conflict is signalled. The previous occupant's log row is untouched
    /// (the log is append-only history, the grid is the current view).
    pub fn set_cell(
        &mut self,
        position: u32,
        activity_id: impl Into<String>,
    ) -> crate::error::Result<()> {
        if position >= self.grid_size {
            return Err(crate::error::Error::InvalidPosition {
                position,
                grid_size: self.grid_size,
            });
        }
        self.cells.insert(position, activity_id.into());
        Ok(())
    }

    /// Activity id occupying a cell, if any.
    pub fn activity_at(&self, position: u32) -> Option<&str> {
        self.cells.get(&position).map(|s| s.as_str())
    }

    /// All occupied cells, ordered by position.
    pub fn cells(&self) -> &BTreeMap<u32, String> {
        &self.cells
    }

    /// Number of occupied cells (distinct positions, not log count).
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Completion percentage of the grid, in [0, 100].
    ///
    /// Cell-occupancy based: overwritten cells count once.
    pub fn completion_percentage(&self) -> f64 {
        if self.grid_size == 0 {
            return 0.0;
        }
        let pct = (self.cells.len() as f64 / self.grid_size as f64) * 100.0;
        pct.min(100.0)
    }
}

// ============================================
// Activity Log
// ============================================

/// An immutable, append-only record of one activity logged at one cell.
///
/// Unique per (user, activity, date, grid_position): the same activity
/// cannot be logged twice at the same cell on the same date, but may
/// occupy multiple cells that day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Database ID (auto-incremented; 0 before insert)
    pub id: i64,
    /// Owning user
    pub user_id: String,
    /// Logged activity
    pub activity_id: String,
    /// Calendar date of the completion
    pub date: NaiveDate,
    /// Grid cell the completion was placed in
    pub grid_position: u32,
    /// When the log row was recorded
    pub logged_at: DateTime<Utc>,
    /// Free-form notes
    pub notes: String,
}

// ============================================
// User Preferences
// ============================================

/// Per-user preferences the engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrefs {
    /// Owning user
    pub user_id: String,
    /// Grid size used when a grid is auto-created for a new date
    pub default_grid_size: u32,
}

impl UserPrefs {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            default_grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

// ============================================
// Derived: User Analytics
// ============================================

/// Derived per-user analytics rollup.
///
/// Recomputed on demand by
/// [`crate::analytics::aggregator::recompute_user_analytics`] and always
/// overwritten wholesale, never partially patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnalytics {
    /// Owning user
    pub user_id: String,
    /// Total log rows across all time
    pub total_activities_logged: i64,
    /// Total days with a grid
    pub total_days_tracked: i64,
    /// Consecutive days with activity ending at the recompute date
    pub current_streak: u32,
    /// Longest consecutive-day run across the full history
    pub longest_streak: u32,
    /// Mean grid completion percentage over the trailing window
    pub average_completion_rate: f64,
    /// Most recent log date
    pub last_activity_date: Option<NaiveDate>,
    /// When this rollup was computed
    pub computed_at: DateTime<Utc>,
}

// ============================================
// Derived: Weekly Report
// ============================================

/// Insight block of a weekly report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyInsights {
    /// Weekday name with the most logs that week (None if no logs)
    pub best_day: Option<String>,
    /// Count of distinct activities logged that week
    pub activity_diversity: i64,
    /// 100 * (distinct days with >= 1 log) / 7
    pub consistency_score: f64,
}

/// One activity's ranking entry in a weekly report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopActivity {
    /// Activity id
    pub activity_id: String,
    /// Activity display name
    pub name: String,
    /// Log occurrences in the week
    pub count: i64,
}

/// Derived snapshot summarizing one user's 7-day window.
///
/// One per (user, week_start); regenerating a week replaces the prior
/// snapshot entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    /// Owning user
    pub user_id: String,
    /// First day of the window
    pub week_start: NaiveDate,
    /// Last day of the window (week_start + 6, inclusive)
    pub week_end: NaiveDate,
    /// Count of logs in the window
    pub total_activities: i64,
    /// Mean grid completion percentage over the window's grids
    pub completion_rate: f64,
    /// True iff every one of the 7 days has at least one log
    pub streak_maintained: bool,
    /// Top 5 activities by log occurrences, count descending
    pub top_activities: Vec<TopActivity>,
    /// Derived insights
    pub insights: WeeklyInsights,
    /// When this snapshot was generated
    pub generated_at: DateTime<Utc>,
}

// ============================================
// Derived: Activity Patterns
// ============================================

/// Kind of detected pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Concentration of logs on particular hours
    TimeOfDay,
    /// Concentration of logs on particular weekdays
    DayOfWeek,
    /// Correlation between activities
    Correlation,
    /// Trend over time
    Trend,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::TimeOfDay => "time_of_day",
            PatternKind::DayOfWeek => "day_of_week",
            PatternKind::Correlation => "correlation",
            PatternKind::Trend => "trend",
        }
    }
}

impl std::str::FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_of_day" => Ok(PatternKind::TimeOfDay),
            "day_of_week" => Ok(PatternKind::DayOfWeek),
            "correlation" => Ok(PatternKind::Correlation),
            "trend" => Ok(PatternKind::Trend),
            _ => Err(format!("unknown pattern kind: {}", s)),
        }
    }
}

/// A detected pattern for one (user, activity, kind).
///
/// Derived and upsert-replaced like the other analytics entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPattern {
    /// Owning user
    pub user_id: String,
    /// Activity the pattern describes
    pub activity_id: String,
    /// Kind of pattern
    pub kind: PatternKind,
    /// Kind-specific pattern data
    pub data: serde_json::Value,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// When the pattern was computed
    pub computed_at: DateTime<Utc>,
}
