use crate::logging::{LogConfig, LogFormat, LogOutput};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::Level;

/// Upper bound on slots a registry will create
pub const MAX_FIXED_FILES: usize = 1 << 20;

pub const CONFIG_FILE_NAME: &str = "ringfiles.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_max_fixed_files")]
    pub max_fixed_files: usize,

    /// Sparse table created up front; 0 leaves the registry unregistered
    #[serde(default)]
    pub initial_capacity: usize,

    /// Allocation window applied after the initial table is created
    #[serde(default)]
    pub alloc_range: Option<RangeConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: FormatConfig,

    /// Directory for rolling log files; stderr when unset
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default = "default_false")]
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatConfig {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_fixed_files: MAX_FIXED_FILES,
            initial_capacity: 0,
            alloc_range: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: FormatConfig::Pretty,
            directory: None,
            span_events: false,
        }
    }
}

fn default_max_fixed_files() -> usize { MAX_FIXED_FILES }
fn default_level() -> String { "info".to_string() }
fn default_false() -> bool { false }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(content)
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Look for `ringfiles.toml` in `dir` and its ancestors
    pub fn find_and_load(dir: &Path) -> Result<Self, String> {
        for candidate in dir.ancestors() {
            let path = candidate.join(CONFIG_FILE_NAME);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), String> {
        let table = &self.table;
        if table.max_fixed_files == 0 || table.max_fixed_files > MAX_FIXED_FILES {
            return Err(format!(
                "table.max_fixed_files must be in 1..={}, got {}",
                MAX_FIXED_FILES, table.max_fixed_files
            ));
        }
        if table.initial_capacity > table.max_fixed_files {
            return Err(format!(
                "table.initial_capacity {} exceeds max_fixed_files {}",
                table.initial_capacity, table.max_fixed_files
            ));
        }
        if let Some(range) = table.alloc_range {
            let end = range.offset.checked_add(range.len);
            if end.map_or(true, |end| end > table.initial_capacity) {
                return Err(format!(
                    "table.alloc_range {}+{} exceeds initial_capacity {}",
                    range.offset, range.len, table.initial_capacity
                ));
            }
        }
        parse_level(&self.logging.level)?;
        Ok(())
    }

    /// Logging settings in the form `logging::init_logging` expects
    pub fn log_config(&self) -> LogConfig {
        let logging = &self.logging;
        LogConfig {
            level: parse_level(&logging.level).unwrap_or(Level::INFO),
            format: match logging.format {
                FormatConfig::Pretty => LogFormat::Pretty,
                FormatConfig::Compact => LogFormat::Compact,
                FormatConfig::Json => LogFormat::Json,
            },
            output: match &logging.directory {
                Some(directory) => LogOutput::File {
                    directory: directory.clone(),
                    prefix: "ringfiles".to_string(),
                },
                None => LogOutput::Stderr,
            },
            span_events: logging.span_events,
            filter: None,
        }
    }
}

pub(crate) fn parse_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!("Unknown log level: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").expect("empty config");
        assert_eq!(config.table.max_fixed_files, MAX_FIXED_FILES);
        assert_eq!(config.table.initial_capacity, 0);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, FormatConfig::Pretty);
    }

    #[test]
    fn table_section_parsed() {
        let config = Config::parse(
            r#"
            [table]
            max_fixed_files = 4096
            initial_capacity = 64
            alloc_range = { offset = 16, len = 48 }

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.table.max_fixed_files, 4096);
        assert_eq!(config.table.initial_capacity, 64);
        assert_eq!(config.table.alloc_range, Some(RangeConfig { offset: 16, len: 48 }));
        assert_eq!(config.log_config().level, Level::DEBUG);
        assert_eq!(config.log_config().format, LogFormat::Json);
    }

    #[test]
    fn limits_validated() {
        let err = Config::parse("[table]\nmax_fixed_files = 0\n").unwrap_err();
        assert!(err.contains("max_fixed_files"));

        let err = Config::parse("[table]\nmax_fixed_files = 8\ninitial_capacity = 9\n").unwrap_err();
        assert!(err.contains("initial_capacity"));

        let err = Config::parse(
            "[table]\ninitial_capacity = 8\nalloc_range = { offset = 4, len = 8 }\n",
        )
        .unwrap_err();
        assert!(err.contains("alloc_range"));
    }

    #[test]
    fn unknown_level_rejected() {
        let err = Config::parse("[logging]\nlevel = \"loud\"\n").unwrap_err();
        assert!(err.contains("loud"));
    }

    #[test]
    fn load_from_file_and_ancestors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");

        let mut file = fs::File::create(dir.path().join(CONFIG_FILE_NAME)).expect("create");
        writeln!(file, "[table]\ninitial_capacity = 32").expect("write");

        let config = Config::find_and_load(&nested).expect("found");
        assert_eq!(config.table.initial_capacity, 32);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(Path::new("/nonexistent/ringfiles.toml")).unwrap_err();
        assert!(err.contains("/nonexistent/ringfiles.toml"));
    }
}
