//SPDX-License-Identifier: MIT OR Apache-2.0

//! Log record type for the callwise tracing system.
//!
//! [`LogRecord`] accumulates message parts during record construction and is
//! then submitted to loggers for output. Parts are stored separately and only
//! joined when needed for final output, so a record can be built progressively
//! without repeated concatenation and passed by value to loggers.
//!
//! Unlike a plain message string, a record also carries the name of the logger
//! it is addressed to and its severity, so sinks can route or filter without
//! parsing the message.

use crate::Level;
use std::borrow::Cow;
use std::fmt::{Debug, Display};

/**
A log record.

We'd like to construct our API in a way that we don't need to allocate memory by concatenating strings, etc.

So instead our API assumes you progressively write a lot into somewhere.  However, due to the multithreaded
nature of logging, we need to be able to write to a buffer that is not shared between threads.

The design is as follows:

1.  Create a new [LogRecord] addressed to a logger name at a level.
2.  Progressively write to the [LogRecord].
3.  Finish the [LogRecord] and submit it to the [crate::Logger].
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogRecord {
    pub(crate) parts: Vec<String>,
    logger_name: Cow<'static, str>,
    level: Level,
}

impl LogRecord {
    pub fn new(logger_name: Cow<'static, str>, level: Level) -> Self {
        Self {
            parts: Vec::new(),
            logger_name,
            level,
        }
    }

    /**
    Append the message to the record.

    This is called in the case that a message is not already owned.
    */
    pub fn log(&mut self, message: &str) {
        self.parts.push(message.to_string());
    }

    /**
    Append the message to the record, taking ownership of the message.

    This is useful for messages that are already owned, such as those that are constructed in the process of logging.
    Logging implementations may choose to copy and drop the value if desired.
    */
    pub fn log_owned(&mut self, message: String) {
        self.parts.push(message);
    }

    /// The name of the logger this record is addressed to.
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// The joined message, as a sink would print it.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for part in &self.parts {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

/*
Boilerplate notes for LogRecord:

IMPLEMENTED:
- Debug: Derived - essential for diagnostics
- Clone: Derived - records are cloned once per registered logger
- PartialEq/Eq/Hash: Derived - enables record comparison and use in collections
- Display: Implemented - formats record parts for output

NOT IMPLEMENTED:
- Copy: Vec<String> contains heap-allocated data
- Default: a record without a logger name or level is not a sensible value
- Ord/PartialOrd: no meaningful ordering for log records
- From/Into, AsRef/AsMut, Deref: no obvious conversions or underlying type
*/
