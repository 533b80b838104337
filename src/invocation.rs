//SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-invocation bookkeeping: serial identifiers, per-thread call depth, and
//! the scoped context that ties them to elapsed-time measurement.
//!
//! Every wrapped call opens exactly one [`InvocationContext`]. The context
//! allocates a process-unique serial number at creation, and on entry bumps
//! the calling thread's depth counter so nested wrapped calls indent beneath
//! their parent. Depth is strictly per-thread; the serial counter is the only
//! cross-thread shared state and every allocation is a single atomic
//! increment-and-read.
//!
//! The enter/exit lifecycle is deliberately rigid: one enter, one exit, no
//! reuse. Violations are bugs in the wrapper itself and fail loudly rather
//! than producing records with wrong depth or timing.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Serial numbers start at 1; 0 never appears in log output.
static INVOCATION_SERIAL: AtomicU64 = AtomicU64::new(1);

fn next_serial() -> u64 {
    INVOCATION_SERIAL.fetch_add(1, Ordering::Relaxed)
}

thread_local! {
    static CALL_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Context around a single wrapped-call invocation.
///
/// Lifecycle is `new` → [`enter`](Self::enter) → [`exit`](Self::exit), with
/// [`stack_level`](Self::stack_level) readable after entry and
/// [`elapsed`](Self::elapsed) readable after exit.
#[derive(Debug)]
pub(crate) struct InvocationContext {
    serial: u64,
    stack_level: u32,
    start: Option<Instant>,
    elapsed: Option<Duration>,
    entered: bool,
    exited: bool,
}

impl InvocationContext {
    pub(crate) fn new() -> Self {
        Self {
            serial: next_serial(),
            stack_level: 0,
            start: None,
            elapsed: None,
            entered: false,
            exited: false,
        }
    }

    /// Identifier of this invocation, unique over the program's life cycle.
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    /// Opens the context: bumps this thread's depth and starts the clock.
    pub(crate) fn enter(&mut self) {
        assert!(!self.entered, "InvocationContext entered twice");
        self.entered = true;
        self.stack_level = CALL_DEPTH.with(|depth| {
            let level = depth.get() + 1;
            depth.set(level);
            level
        });
        self.start = Some(Instant::now());
    }

    /// Closes the context: stops the clock and restores this thread's depth.
    pub(crate) fn exit(&mut self) {
        assert!(self.entered, "InvocationContext exited before entry");
        assert!(!self.exited, "InvocationContext exited twice");
        self.elapsed = Some(
            self.start
                .expect("start time recorded at entry")
                .elapsed(),
        );
        CALL_DEPTH.with(|depth| depth.set(self.stack_level - 1));
        self.exited = true;
    }

    /// The stack level of this invocation's records, starting from 1.
    pub(crate) fn stack_level(&self) -> u32 {
        assert!(self.entered, "stack_level read before entry");
        self.stack_level
    }

    /// Time elapsed between entry and exit.
    pub(crate) fn elapsed(&self) -> Duration {
        assert!(self.exited, "elapsed read before exit");
        self.elapsed.expect("elapsed recorded at exit")
    }
}

impl Drop for InvocationContext {
    // Last-resort depth restore for a context dropped while still open,
    // e.g. when record emission itself unwinds.
    fn drop(&mut self) {
        if self.entered && !self.exited {
            CALL_DEPTH.with(|depth| depth.set(self.stack_level - 1));
        }
    }
}
