//! Logging infrastructure - structured tracing for the registry and CLI
//!
//! The table core never logs; the owning registry reports registrations,
//! installs and failures through `tracing`. Subscriber setup lives here so
//! binaries and tests share one configuration path.

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub use tracing::{debug, error, info, trace, warn};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// How each registry or CLI event is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Indented fields, one event over several lines; suits interactive replay
    Pretty,
    /// Event and fields on a single line
    Compact,
    /// Newline-delimited JSON objects for log shippers
    Json,
}

/// Where registry and CLI events end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    /// Default: keeps stdout free for replay results
    Stderr,
    /// `<directory>/<prefix>.YYYY-MM-DD`, rolled over at midnight
    File { directory: String, prefix: String },
}

/// Subscriber settings, usually built from `[logging]` in ringfiles.toml
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Floor applied on top of `RUST_LOG`
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Report entering and leaving spans as events too
    pub span_events: bool,
    /// Comma-separated directives, e.g. "ringfiles::registry=trace"
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `RINGFILES_LOG_*` variables override what the config file chose
    ///
    /// RINGFILES_LOG_LEVEL: trace, debug, info, warn, error
    /// RINGFILES_LOG_JSON: set to anything for JSON lines
    /// RINGFILES_LOG_FILE: directory for daily log files
    pub fn with_env(mut self) -> Self {
        if let Ok(level) = std::env::var("RINGFILES_LOG_LEVEL") {
            if let Ok(level) = crate::config::parse_level(&level) {
                self.level = level;
            }
        }
        if std::env::var_os("RINGFILES_LOG_JSON").is_some() {
            self.format = LogFormat::Json;
        }
        if let Ok(directory) = std::env::var("RINGFILES_LOG_FILE") {
            self.output = LogOutput::File {
                directory,
                prefix: "ringfiles".to_string(),
            };
        }
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber
///
/// Only the first call has any effect. The returned guard flushes buffered
/// output on drop and must be held for the life of the program.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    let mut guard = None;
    LOGGER_INITIALIZED.get_or_init(|| {
        guard = install(config);
    });
    guard
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn install(config: LogConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config);
    let spans = span_events_config(config.span_events);

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .pretty()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(writer)
            .compact()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(spans)
            .with_filter(filter)
            .boxed(),
    };

    // Another subscriber (e.g. a test harness) may already own the global slot
    tracing_subscriber::registry().with(layer).try_init().ok()?;
    Some(guard)
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base = EnvFilter::from_default_env().add_directive(config.level.into());

    match &config.filter {
        Some(directives) => directives.split(',').fold(base, |filter, directive| {
            match directive.parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        }),
        None => base,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("ringfiles=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.filter, Some("ringfiles=trace".to_string()));
    }

    #[test]
    fn env_overrides_file_settings() {
        std::env::set_var("RINGFILES_LOG_LEVEL", "debug");
        let config = LogConfig::new().with_level(Level::WARN).with_env();
        std::env::remove_var("RINGFILES_LOG_LEVEL");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn bad_directive_is_skipped() {
        let config = LogConfig::new().with_filter("ringfiles=debug,ringfiles[=");
        let _filter = build_filter(&config);
    }

    #[test]
    fn init_is_idempotent() {
        let _first = init_logging(LogConfig::new().with_level(Level::WARN));
        let second = init_logging(LogConfig::new());
        assert!(second.is_none());
        assert!(is_initialized());
    }
}
