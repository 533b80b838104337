//SPDX-License-Identifier: MIT OR Apache-2.0

//! Global logger management.
//!
//! This module provides thread-safe management of the global loggers that
//! receive every record the call wrapper emits. Multiple loggers may be active
//! simultaneously, so records can be sent to several destinations at once
//! (stderr plus an in-memory capture, say).
//!
//! By default the system initializes with a single [`StderrLogger`], so
//! tracing works out of the box without configuration. Loggers are
//! reference-counted; replacing the set does not disturb emissions already in
//! flight, since those hold their own `Arc`s.

use crate::logger::Logger;
use crate::stderr_logger::StderrLogger;
use std::sync::{Arc, Mutex, OnceLock};

static GLOBAL_LOGGERS: OnceLock<Mutex<Vec<Arc<dyn Logger>>>> = OnceLock::new();

fn global_loggers_cell() -> &'static Mutex<Vec<Arc<dyn Logger>>> {
    GLOBAL_LOGGERS.get_or_init(|| Mutex::new(vec![Arc::new(StderrLogger::new())]))
}

/// Retrieves the current set of global loggers.
///
/// Returns clones of the `Arc`s so loggers remain alive during logging
/// operations. If no loggers have been configured, initializes with the
/// default stderr logger. The lock is held only for the clone.
pub fn global_loggers() -> Vec<Arc<dyn Logger>> {
    global_loggers_cell()
        .lock()
        .expect("global logger registry poisoned")
        .clone()
}

/// Adds a logger to the global logger collection.
///
/// The new logger is appended to the existing list; all registered loggers
/// receive every record.
pub fn add_global_logger(logger: Arc<dyn Logger>) {
    global_loggers_cell()
        .lock()
        .expect("global logger registry poisoned")
        .push(logger);
}

/// Replaces all global loggers with a new set.
///
/// Previous loggers are dropped once their outstanding references go away.
/// Setting an empty vector silently drops all records.
pub fn set_global_loggers(new_loggers: Vec<Arc<dyn Logger>>) {
    let cell = GLOBAL_LOGGERS.get_or_init(|| Mutex::new(Vec::new()));
    *cell.lock().expect("global logger registry poisoned") = new_loggers;
}
