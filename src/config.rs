use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::{MAX_PRIORITY, MIN_PRIORITY};
use crate::paths;
use crate::query::{DEFAULT_HIGH_PRIORITY_THRESHOLD, DEFAULT_LIMIT};

pub const DEFAULT_MAX_LIMIT: u64 = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListConfig {
    /// Page size when `--limit` is omitted.
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Largest `--limit` accepted.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatsConfig {
    #[serde(default = "default_threshold")]
    pub high_priority_threshold: u8,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn default_max_limit() -> u64 {
    DEFAULT_MAX_LIMIT
}

fn default_threshold() -> u8 {
    DEFAULT_HIGH_PRIORITY_THRESHOLD
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            high_priority_threshold: DEFAULT_HIGH_PRIORITY_THRESHOLD,
        }
    }
}

impl Config {
    /// Load config from `TASKDECK_CONFIG` or `~/.taskdeck/config.toml`.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(&paths::config_path()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let list = &self.list;
        if list.default_limit == 0 || list.default_limit > list.max_limit {
            bail!(
                "invalid {}: list.default_limit must be between 1 and list.max_limit ({})",
                path.display(),
                list.max_limit
            );
        }
        let threshold = self.stats.high_priority_threshold;
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&threshold) {
            bail!(
                "invalid {}: stats.high_priority_threshold {threshold} is outside {MIN_PRIORITY}..={MAX_PRIORITY}",
                path.display()
            );
        }
        Ok(())
    }

    /// Resolve a requested page size against the configured bounds.
    pub fn page_limit(&self, requested: Option<u64>) -> Result<u64> {
        let limit = requested.unwrap_or(self.list.default_limit);
        if limit == 0 || limit > self.list.max_limit {
            bail!("--limit must be between 1 and {}", self.list.max_limit);
        }
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(toml: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(toml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.list.default_limit, 100);
        assert_eq!(config.list.max_limit, 1000);
        assert_eq!(config.stats.high_priority_threshold, 7);
    }

    #[test]
    fn empty_file_returns_default() {
        let f = write_config("");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.list.default_limit, 100);
    }

    #[test]
    fn parse_full_config() {
        let f = write_config(
            r#"
[list]
default_limit = 20
max_limit = 50

[stats]
high_priority_threshold = 9
"#,
        );
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.list.default_limit, 20);
        assert_eq!(config.list.max_limit, 50);
        assert_eq!(config.stats.high_priority_threshold, 9);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let f = write_config("[list]\nmax_limit = 500\n");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.list.default_limit, 100);
        assert_eq!(config.list.max_limit, 500);
        assert_eq!(config.stats.high_priority_threshold, 7);
    }

    #[test]
    fn misspelled_field_rejected() {
        let f = write_config("[list]\ndefault_limt = 10\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let f = write_config("[display]\ncolor = true\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn invalid_toml_returns_error() {
        let f = write_config("not valid toml [[[");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn default_limit_above_max_rejected() {
        let f = write_config("[list]\ndefault_limit = 200\nmax_limit = 100\n");
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(err.to_string().contains("default_limit"));
    }

    #[test]
    fn zero_default_limit_rejected() {
        let f = write_config("[list]\ndefault_limit = 0\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn threshold_outside_scale_rejected() {
        let f = write_config("[stats]\nhigh_priority_threshold = 11\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn page_limit_bounds() {
        let config = Config::default();
        assert_eq!(config.page_limit(None).unwrap(), 100);
        assert_eq!(config.page_limit(Some(1000)).unwrap(), 1000);
        assert!(config.page_limit(Some(0)).is_err());
        assert!(config.page_limit(Some(1001)).is_err());
    }
}
