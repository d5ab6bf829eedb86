//! Build event types for JSON output.
//!
//! These events are emitted one JSON object per line on stdout when using
//! `--message-format json`.
//!
//! # Event Types
//!
//! - `build-started`: The plan is about to run
//! - `compiler-artifact`: A unit produced (or already had) its artifact
//! - `compiler-warning`: A compiler warning was emitted
//! - `compiler-error`: A compiler error was emitted
//! - `unit-skipped`: An optional unit failed or a unit's dependency failed
//! - `build-progress`: Progress update during build
//! - `build-finished`: Build completed (success or failure)
//!
//! New fields may be added, but existing fields should not be removed or renamed.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::builder::util::CompilerMessage;

/// A build event emitted during the build process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BuildEvent {
    /// Build started with metadata.
    BuildStarted {
        /// Profile being built (e.g., "debug", "release")
        profile: String,
        /// Number of units to build
        units: usize,
        /// Number of compile, archive and link steps
        steps: usize,
    },

    /// A unit's artifact is up to date.
    CompilerArtifact {
        unit: String,
        /// "library" or "extension"
        kind: String,
        /// Artifact inside the target directory
        filename: PathBuf,
        /// Relative install location, for extensions
        #[serde(skip_serializing_if = "Option::is_none")]
        install_path: Option<PathBuf>,
        /// Whether the artifact was reused from a previous build
        fresh: bool,
    },

    /// A compiler warning was emitted.
    CompilerWarning {
        unit: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },

    /// A compiler error was emitted.
    CompilerError {
        unit: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },

    /// A unit was not built.
    UnitSkipped {
        unit: String,
        /// Why the unit was not built
        cause: String,
        optional: bool,
    },

    /// Build progress update.
    BuildProgress {
        current: u64,
        total: u64,
    },

    /// Build completed (success or failure).
    BuildFinished {
        success: bool,
        /// Total build duration in milliseconds
        duration_ms: u64,
        /// Required units that failed or were blocked
        failed: Vec<String>,
    },
}

impl BuildEvent {
    /// Create a build started event.
    pub fn started(profile: impl Into<String>, units: usize, steps: usize) -> Self {
        BuildEvent::BuildStarted {
            profile: profile.into(),
            units,
            steps,
        }
    }

    /// Create a warning or error event from a parsed compiler message.
    pub fn from_compiler_message(unit: impl Into<String>, msg: &CompilerMessage) -> Self {
        use crate::builder::util::DiagnosticLevel;

        let unit = unit.into();
        let message = msg.message.clone();
        let file = Some(msg.file.clone());
        match msg.level {
            DiagnosticLevel::Warning => BuildEvent::CompilerWarning {
                unit,
                message,
                file,
                line: msg.line,
                column: msg.column,
            },
            DiagnosticLevel::Error => BuildEvent::CompilerError {
                unit,
                message,
                file,
                line: msg.line,
                column: msg.column,
            },
        }
    }

    /// Create a compiler error event without a location.
    pub fn error(unit: impl Into<String>, message: impl Into<String>) -> Self {
        BuildEvent::CompilerError {
            unit: unit.into(),
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Create a progress event.
    pub fn progress(current: u64, total: u64) -> Self {
        BuildEvent::BuildProgress { current, total }
    }

    /// Create a build finished event.
    pub fn finished(success: bool, duration_ms: u64, failed: Vec<String>) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            failed,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receives build events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BuildEvent);
}

/// Discards every event; the human-readable build uses tracing instead.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &BuildEvent) {}
}

/// Writes each event as one JSON line to stdout.
#[derive(Debug, Default)]
pub struct JsonEventSink;

impl EventSink for JsonEventSink {
    fn emit(&self, event: &BuildEvent) {
        let mut stdout = std::io::stdout().lock();
        // Write errors (closed pipe) are ignored
        let _ = writeln!(stdout, "{}", event.to_json());
        let _ = stdout.flush();
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingEventSink {
    pub fn new() -> Self {
        CollectingEventSink::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
