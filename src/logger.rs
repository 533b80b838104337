//SPDX-License-Identifier: MIT OR Apache-2.0
use crate::log_record::LogRecord;
use std::fmt::Debug;

pub trait Logger: Debug + Send + Sync {
    /**
        Submits the log record for logging.

        Records arrive fully built; the logger decides what to do with the
        logger name and level (route, filter, discard).
    */
    fn emit(&self, record: LogRecord);
}

/*
Boilerplate notes.

# Logger

Clone on Logger doesn't make sense, so copy's out.
PartialEq and Eq are possible but it's unclear if we mean data equality or some kind of provenance-based thing.  Let's avoid that and not implement it.
Ord makes no sense.
Default is not necessarily sensible since who knows how the logger is constructed (does it need a filename to log to, etc.)
Display is not very sensible.
From/Into, no.
AsRef,AsMut,Deref,DerefMut, no.
Send/Sync makes sense for typical loggers but I could imagine corner cases where they aren't.
*/
