use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_logging::{JsonLogger, LogLevel, LogRecord, LogSink};

/// Builder for claims telemetry sinks.
pub struct ClaimsTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    sink: Option<Arc<dyn LogSink>>,
}

impl ClaimsTelemetryBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            sink: None,
        }
    }

    /// Writes JSON lines to `path`.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops file records below `level`.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Uses a custom sink instead of a log file.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the telemetry handle.
    pub fn build(self) -> Result<ClaimsTelemetry> {
        let sink = match (self.sink, self.log_path) {
            (Some(sink), _) => Some(sink),
            (None, Some(path)) => {
                Some(Arc::new(JsonLogger::new(path)?.with_min_level(self.min_level))
                    as Arc<dyn LogSink>)
            }
            (None, None) => None,
        };
        Ok(ClaimsTelemetry {
            inner: Arc::new(TelemetryInner {
                module: self.module,
                sink,
            }),
        })
    }
}

/// Telemetry handle shared by the training and inference pipelines.
#[derive(Clone)]
pub struct ClaimsTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ClaimsTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsTelemetry")
            .field("module", &self.inner.module)
            .field("enabled", &self.inner.sink.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    sink: Option<Arc<dyn LogSink>>,
}

impl ClaimsTelemetry {
    /// Returns a builder.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ClaimsTelemetryBuilder {
        ClaimsTelemetryBuilder::new(module)
    }

    /// Logs an event with structured metadata.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        if let Some(sink) = &self.inner.sink {
            let record = LogRecord::new(&self.inner.module, level, message).with_metadata(metadata);
            sink.write(&record)?;
        }
        Ok(())
    }
}

/// Logs through optional telemetry. Logging failures never abort a pipeline.
pub(crate) fn log(
    telemetry: Option<&ClaimsTelemetry>,
    level: LogLevel,
    message: &str,
    metadata: Value,
) {
    if let Some(tel) = telemetry {
        if let Err(err) = tel.log(level, message, metadata) {
            eprintln!("telemetry log failed: {err:?}");
        }
    }
}
