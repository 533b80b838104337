//SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Logger
//!
//! An in-memory logging implementation for testing and debugging. The
//! [`InMemoryLogger`] captures records in memory rather than writing them to
//! stderr, making it ideal for:
//!
//! - Unit testing code that uses callwise tracing
//! - Capturing records in environments where stderr is redirected
//! - Programmatically examining what a wrapped call actually logged
//!
//! The logger stores records behind a `Mutex`, so multiple threads may log
//! concurrently while maintaining a consistent view of the accumulated
//! records. It implements the [`Logger`] trait and plugs into the global
//! logging system via
//! [`add_global_logger`](crate::global_logger::add_global_logger) or
//! [`set_global_loggers`](crate::global_logger::set_global_loggers).
//!
//! For test isolation, save the current global loggers with
//! [`global_loggers`](crate::global_logger::global_loggers), swap in an
//! `InMemoryLogger`, and restore afterwards.

use crate::log_record::LogRecord;
use crate::logger::Logger;
use std::sync::Mutex;

/// A logger that stores records in memory for later inspection.
///
/// # Example
///
/// ```rust
/// use callwise::InMemoryLogger;
/// use callwise::global_logger::set_global_loggers;
/// use std::sync::Arc;
///
/// let logger = Arc::new(InMemoryLogger::new());
/// set_global_loggers(vec![logger.clone()]);
///
/// #[callwise::log_call]
/// fn add(a: u32, b: u32) -> u32 {
///     a + b
/// }
/// add(2, 3);
///
/// let logs = logger.drain_logs();
/// assert!(logs.contains("add(2, 3) started"));
/// assert!(logs.contains("5 returned"));
/// ```
#[derive(Debug)]
pub struct InMemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

// Boilerplate notes:
// - Debug: derived, required by Logger
// - Default: implemented, obvious zero-value (empty buffer)
// - Clone: NOT implemented - loggers hold a unique buffer that shouldn't be
//   silently duplicated
// - PartialEq/Eq/Hash: NOT implemented - equality semantics unclear for loggers
// - Display: NOT implemented - no meaningful representation
// - Send/Sync: automatic due to Mutex (required for Logger)

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogger {
    /// Creates a new `InMemoryLogger` with an empty buffer.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Drains all records into a single newline-joined string, clearing the
    /// internal buffer.
    ///
    /// Subsequent calls return an empty string unless new records arrived in
    /// the meantime.
    pub fn drain_logs(&self) -> String {
        let mut records = self.records.lock().unwrap();
        let result = records
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        records.clear();
        result
    }

    /// Drains all records in structured form, clearing the internal buffer.
    ///
    /// Useful when a test needs to assert on the logger name or level a
    /// record was addressed to, rather than on message text.
    pub fn drain_records(&self) -> Vec<LogRecord> {
        let mut records = self.records.lock().unwrap();
        std::mem::take(&mut *records)
    }

    /// Flushes all records to stderr, clearing the internal buffer.
    pub fn drain_to_console(&self) {
        let mut records = self.records.lock().unwrap();
        for record in records.iter() {
            eprintln!("{}", record);
        }
        records.clear();
    }
}

impl Logger for InMemoryLogger {
    fn emit(&self, record: LogRecord) {
        let mut records = self.records.lock().unwrap();
        records.push(record);
    }
}
