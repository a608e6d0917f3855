use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Log level enum for type-safe logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// One line of the run narrative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
}

impl LogEntry {
    fn render(&self) -> String {
        format!(
            "{} [{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level.as_str(),
            self.source,
            self.message
        )
    }
}

/// Narrative log collected over one pipeline run (or one stage of it)
///
/// The pipeline is single-threaded, so this is a plain owned buffer. Every
/// entry is mirrored to `tracing` at the matching level; the buffer itself
/// is rendered into the `"log"` metadata entry of the produced report, so a
/// failed run carries its complete story without a re-run at higher
/// verbosity.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    source: String,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: Vec::new(),
        }
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!(source = %self.source, "{message}"),
            LogLevel::Info => tracing::info!(source = %self.source, "{message}"),
            LogLevel::Warn => tracing::warn!(source = %self.source, "{message}"),
            LogLevel::Error => tracing::error!(source = %self.source, "{message}"),
        }
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            source: self.source.clone(),
            message,
        });
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Append another log's entries, preserving their timestamps and source
    pub fn absorb(&mut self, other: RunLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flat text narrative, one rendered entry per line
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(LogEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Install a console subscriber honoring `RUST_LOG`, defaulting to `info`
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
