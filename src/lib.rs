//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# callwise

callwise is an opinionated call-boundary tracing library for Rust.

# Development status

callwise is experimental and the API may change.

# The problem

Sometimes you want to know, for a handful of routines: when was this called,
by whom, with what, what came back, and how long did it take?  Peppering
bodies with ad-hoc log statements answers that badly.  The statements drift
out of sync with the signatures, they forget the failure path, and every
nested call flattens into an undifferentiated stream with no way to tell
which "finished" belongs to which "started".

callwise wraps the routine instead of editing its body.  Every invocation
emits a pair of records:

```text
src/main.rs:12 [callwise] DEBUG: /main 1/ myapp::add(2, 3) started
src/main.rs:12 [callwise] DEBUG: \main 1\ 00:00.000014 elapsed, 5 returned
```

The pair shares a serial number unique for the life of the process, so the
records of one invocation can always be matched up, even across interleaved
threads.  Nested wrapped calls indent beneath their parent.  A failing call
logs what was raised plus a one-line caller chain, then propagates the
failure unchanged.

# The API

The usual form is the attribute:

```rust
#[callwise::log_call]
fn add(a: u32, b: u32) -> u32 {
    a + b
}
```

With configuration:

```rust
#[callwise::log_call(logger_name = "my.error.logger", level = warning)]
fn handle_error() {
    // ...
}
```

And for wrapping something already in hand, without special syntax:

```rust
let add = callwise::CallWrapper::new("add", |a: u32, b: u32| a + b);
assert_eq!(add.call((2, 3)), 5);
```

The wrapper never alters the behavior of the wrapped routine: arguments pass
through untouched, return values come back untouched, and a panic is
re-raised with its original payload after the exit record is written.

WARNING: arguments are rendered into the entered record.  You may not want
this on routines taking confidential information.

# Argument rendering

Values are rendered by trying `Debug`, then `Display`, then falling back to
the type name — so a wrapped routine's argument types don't need to
implement anything, and a representation impl that panics degrades to the
next strategy instead of breaking the call.

# Multithreading

Call depth is tracked per thread, and every record names the thread it was
emitted from.  Wrapped routines may be called concurrently and recursively;
each invocation gets its own context and they nest LIFO within a thread.

# Where records go

Records are dispatched to the global loggers ([`global_logger`]), which
default to stderr.  [`InMemoryLogger`] captures records for tests.
*/

mod level;
mod logger;
mod log_record;
pub mod global_logger;
mod stderr_logger;
mod inmemory_logger;
mod invocation;
pub mod render;
pub mod stack;
mod wrapper;

pub use level::Level;
pub use logger::Logger;
pub use log_record::LogRecord;
pub use stderr_logger::StderrLogger;
pub use inmemory_logger::InMemoryLogger;
pub use global_logger::{add_global_logger, global_loggers, set_global_loggers};
pub use wrapper::{
    BoundCall, CallConfig, CallWrapper, ConfigError, Invocable, PrependReceiver,
    DEFAULT_LOGGER_NAME,
};

pub use callwise_proc::log_call;

#[doc(hidden)]
pub mod hidden {
    pub use crate::wrapper::{call_config, invoke};
}

extern crate self as callwise;
