//! Render configuration.
//!
//! Everything a render depends on besides the playbook itself is carried
//! in a [`RenderConfig`] value. Nothing is read from global state.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Default pass budget of the render loop.
pub const DEFAULT_MAX_PASSES: usize = 100;

/// SQL dialect used when emitting literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Standard SQL.
    #[default]
    Ansi,
    /// PostgreSQL.
    #[serde(alias = "postgresql")]
    Postgres,
    /// MySQL: backslashes in strings are escaped.
    Mysql,
    /// SQLite: booleans are written as `1`/`0`.
    Sqlite,
}

impl Dialect {
    /// All dialects, for help output.
    pub const ALL: [Self; 4] = [Self::Ansi, Self::Postgres, Self::Mysql, Self::Sqlite];

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ansi => "ansi",
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" => Ok(Self::Ansi),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::Mysql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!(
                "unknown dialect `{other}` (expected one of: ansi, postgres, mysql, sqlite)"
            )),
        }
    }
}

/// Source of the evaluation clock for relative dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Wall clock, read once per date expression.
    #[default]
    System,
    /// A frozen local time.
    Fixed(NaiveDateTime),
}

impl Clock {
    /// Current local time in `timezone`.
    pub fn now(self, timezone: Tz) -> NaiveDateTime {
        match self {
            Self::System => Utc::now().with_timezone(&timezone).naive_local(),
            Self::Fixed(now) => now,
        }
    }
}

/// Configuration for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Timezone for timestamps and for the system clock.
    pub timezone: Tz,
    /// Output dialect.
    pub dialect: Dialect,
    /// Evaluation clock.
    pub clock: Clock,
    /// Pass budget of the render loop, shared with nested CTE renders.
    pub max_passes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            dialect: Dialect::default(),
            clock: Clock::default(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl RenderConfig {
    /// Create a config with defaults: UTC, ANSI, system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timezone.
    pub const fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the dialect.
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Freeze the clock at a local time.
    pub const fn with_fixed_clock(mut self, now: NaiveDateTime) -> Self {
        self.clock = Clock::Fixed(now);
        self
    }

    /// Set the pass budget.
    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}
