//! Logging setup for the runtime
//!
//! The runtime emits `tracing` events under the `ioc_runtime` target: debug
//! for registrations and lifecycle transitions, trace for per-request
//! pipeline steps, warn/error for failed hooks. This module installs a
//! subscriber for applications that do not bring their own.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - JSON output, for log aggregation
//! - `logging-pretty` - multi-line colored output, for development
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_runtime::logging;
//!
//! logging::builder()
//!     .debug()
//!     .runtime_only()
//!     .pretty()
//!     .try_init()
//!     .expect("subscriber already installed");
//! ```

use crate::config::Properties;
use tracing::Level;

/// Target of every event emitted by the runtime
pub const TARGET: &str = "ioc_runtime";

/// Property holding the minimum level (`trace`, `debug`, `info`, `warn`, `error`)
pub const LEVEL_KEY: &str = "logging.level";

/// Property holding the output format (`json`, `pretty`, `compact`)
pub const FORMAT_KEY: &str = "logging.format";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `logging.level` / `logging.format`; unparsable values are ignored
    pub fn from_properties(properties: &Properties) -> Self {
        let mut builder = Self::default();
        if let Some(level) = properties.get(LEVEL_KEY).and_then(|v| v.trim().parse().ok()) {
            builder.level = level;
        }
        if let Some(format) = properties.get(FORMAT_KEY).and_then(|v| v.parse().ok()) {
            builder.format = format;
        }
        builder
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show events emitted by the runtime itself
    pub fn runtime_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// `EnvFilter` directive for the configured level and target
    pub fn directive(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        match self.target {
            Some(target) => format!("{target}={level}"),
            None => level,
        }
    }

    /// Install the global subscriber.
    ///
    /// Fails if a global subscriber is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), crate::BoxError> {
        use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

        let filter = EnvFilter::new(self.directive());
        let base = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => base.json().boxed(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .map_err(Into::into)
    }

    /// No subscriber backend compiled in; does nothing
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn try_init(self) -> Result<(), crate::BoxError> {
        Ok(())
    }
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install a debug-level subscriber for runtime events only, ignoring an
/// already installed subscriber
pub fn init() {
    let _ = builder().debug().runtime_only().try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive() {
        assert_eq!(LoggingBuilder::new().directive(), "info");
        assert_eq!(LoggingBuilder::new().trace().runtime_only().directive(), "ioc_runtime=trace");
    }

    #[test]
    fn test_from_properties() {
        let mut properties = Properties::new();
        properties.insert(LEVEL_KEY, "warn");
        properties.insert(FORMAT_KEY, "Compact");

        let builder = LoggingBuilder::from_properties(&properties);
        assert_eq!(builder.level, Level::WARN);
        assert_eq!(builder.format, LogFormat::Compact);

        properties.insert(LEVEL_KEY, "loud");
        let builder = LoggingBuilder::from_properties(&properties);
        assert_eq!(builder.level, Level::INFO);
    }

    #[test]
    fn test_builder_chain() {
        let builder = builder().debug().pretty().with_file().with_line_number();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_file && builder.with_line_number);
        assert!(!builder.with_thread_ids);
    }
}
