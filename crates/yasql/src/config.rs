//! Layered CLI settings.
//!
//! Settings come from `~/.yasqlrc`, then the playbook's `config` mapping,
//! then command-line flags; each layer overrides the fields it sets.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;
use yasql_core::{Document, Value};
use yasql_query::date::DATETIME_FORMAT;
use yasql_query::{Dialect, RenderConfig};

/// Name of the per-user settings file in the home directory.
pub const RC_FILE: &str = ".yasqlrc";

/// One layer of settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// IANA timezone name.
    pub timezone: Option<String>,
    /// Output dialect.
    pub dialect: Option<Dialect>,
    /// Pass budget of the render loop.
    pub max_passes: Option<usize>,
}

impl Settings {
    /// Default location of the settings file.
    pub fn rc_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(RC_FILE))
    }

    /// Read a settings file. A missing file is an empty layer.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        debug!(path = %path.display(), ?settings, "loaded settings");
        Ok(settings)
    }

    /// Read the settings of a playbook's `config` mapping.
    ///
    /// Keys used by other collaborators are ignored.
    pub fn from_document(config: &Document) -> Result<Self> {
        let string = |key: &str| match config.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(anyhow!(
                "playbook config `{key}` must be a string, got {}",
                other.type_name()
            )),
        };

        let dialect = string("dialect")?
            .map(|name| Dialect::from_str(&name).map_err(|e| anyhow!(e)))
            .transpose()?;
        let max_passes = match config.get("max_passes") {
            None | Some(Value::Null) => None,
            Some(Value::Integer(n)) if *n > 0 => Some(n.unsigned_abs() as usize),
            Some(other) => bail!("playbook config `max_passes` must be a positive integer, got `{other}`"),
        };

        Ok(Self {
            timezone: string("timezone")?,
            dialect,
            max_passes,
        })
    }

    /// Overlay `other` on this layer.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            timezone: other.timezone.or(self.timezone),
            dialect: other.dialect.or(self.dialect),
            max_passes: other.max_passes.or(self.max_passes),
        }
    }

    /// Build a render config, frozen at `now` if given.
    pub fn render_config(&self, now: Option<NaiveDateTime>) -> Result<RenderConfig> {
        let mut config = RenderConfig::new();
        if let Some(name) = &self.timezone {
            config = config.with_timezone(parse_timezone(name)?);
        }
        if let Some(dialect) = self.dialect {
            config = config.with_dialect(dialect);
        }
        if let Some(max_passes) = self.max_passes {
            config = config.with_max_passes(max_passes);
        }
        if let Some(now) = now {
            config = config.with_fixed_clock(now);
        }
        Ok(config)
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name).map_err(|e| anyhow!("unknown timezone `{name}`: {e}"))
}

/// Parse a `--now` value: `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
pub fn parse_now(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    if let Ok(now) = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Ok(now);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("invalid time `{text}`, expected `YYYY-MM-DD HH:MM:SS`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let rc = Settings {
            timezone: Some("Asia/Shanghai".to_string()),
            dialect: Some(Dialect::Mysql),
            max_passes: None,
        };
        let flags = Settings {
            dialect: Some(Dialect::Sqlite),
            ..Settings::default()
        };
        let merged = rc.overlay(flags);
        assert_eq!(merged.timezone.as_deref(), Some("Asia/Shanghai"));
        assert_eq!(merged.dialect, Some(Dialect::Sqlite));
    }

    #[test]
    fn test_from_document() {
        let config = Document::new()
            .with("timezone", "Europe/Paris")
            .with("dialect", "PostgreSQL")
            .with("connection", "ignored");
        let settings = Settings::from_document(&config).unwrap();
        assert_eq!(settings.timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(settings.dialect, Some(Dialect::Postgres));

        let bad = Document::new().with("dialect", "oracle");
        assert!(Settings::from_document(&bad).is_err());
    }

    #[test]
    fn test_render_config() {
        let settings = Settings {
            timezone: Some("Asia/Shanghai".to_string()),
            ..Settings::default()
        };
        let now = parse_now("2018-08-15 10:00:00").unwrap();
        let config = settings.render_config(Some(now)).unwrap();
        assert_eq!(config.timezone, chrono_tz::Asia::Shanghai);
        assert_eq!(config.clock, yasql_query::Clock::Fixed(now));

        let unknown = Settings {
            timezone: Some("Mars/Olympus".to_string()),
            ..Settings::default()
        };
        assert!(unknown.render_config(None).is_err());
    }

    #[test]
    fn test_parse_now() {
        assert_eq!(
            parse_now("2018-08-15").unwrap(),
            NaiveDate::from_ymd_opt(2018, 8, 15).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_now("yesterday").is_err());
    }

    #[test]
    fn test_missing_rc_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_file(&dir.path().join(RC_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RC_FILE);
        fs::write(&path, "timezone: UTC\ndialect: sqlite\n").unwrap();
        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.dialect, Some(Dialect::Sqlite));

        fs::write(&path, "colour: blue\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }
}
