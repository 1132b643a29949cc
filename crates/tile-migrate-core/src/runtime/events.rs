// crates/tile-migrate-core/src/runtime/events.rs
// ============================================================================
// Module: Migration Event Sinks
// Description: JSON-lines, collecting, and no-op progress sinks.
// Purpose: Route structured progress without a logging framework dependency.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! Sinks receive [`MigrationEvent`] values and decide where they go. The
//! JSON-lines sinks stamp each event with a wall-clock timestamp; write
//! failures are swallowed so progress reporting can never abort a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::MigrationEvent;
use crate::core::MigrationLogLine;
use crate::interfaces::MigrationEventSink;

// ============================================================================
// SECTION: JSON Lines Sinks
// ============================================================================

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl MigrationEventSink for StderrEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Some(payload) = render_line(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl MigrationEventSink for FileEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Some(payload) = render_line(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

// ============================================================================
// SECTION: In-Process Sinks
// ============================================================================

/// No-op event sink.
pub struct NoopEventSink;

impl MigrationEventSink for NoopEventSink {
    fn record(&self, _event: &MigrationEvent) {}
}

/// Event sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    /// Events recorded so far.
    events: Mutex<Vec<MigrationEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the wire names of every recorded event.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(MigrationEvent::name).collect()
    }
}

impl MigrationEventSink for CollectingEventSink {
    fn record(&self, event: &MigrationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Serializes an event with the current wall-clock timestamp.
fn render_line(event: &MigrationEvent) -> Option<String> {
    let timestamp_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    serde_json::to_string(&MigrationLogLine {
        timestamp_ms,
        event,
    })
    .ok()
}
