//SPDX-License-Identifier: MIT OR Apache-2.0

//! Stack snapshot capture and caller-chain formatting.
//!
//! At call entry the wrapper captures a [`StackSnapshot`] without resolving
//! symbols, which keeps the happy path cheap. Only when the wrapped call
//! fails does [`StackWalker`] resolve the snapshot and walk it, yielding
//! (qualified-name, line) frames with every instrumentation-internal frame
//! filtered out — so nested or recursive wrapping never pollutes the chain
//! with the wrapper's own plumbing.
//!
//! The chain is formatted as a single line rather than a full multi-line
//! backtrace. A failure may well be caught and handled above the wrapped
//! call, in which case nobody wants a screenful; and with nested wrapping,
//! one line per level is already plenty.

use backtrace::Backtrace;
use std::fmt::Display;

const UNKNOWN_NAME: &str = "(unknown)";
const UNKNOWN_CALLER: &str = "(unknown caller)";
const UNKNOWN_STACK: &str = "(unknown stack)";

/// Namespaces whose frames are instrumentation-internal: this crate, its
/// proc-macro crate, and the capture machinery itself.
const INTERNAL_NAMESPACES: &[&str] = &["callwise", "callwise_proc", "backtrace"];

/// A capture of the active call chain at a point in time.
///
/// Capturing is eager but symbol resolution is deferred until a walker is
/// requested. The snapshot is only meaningful during the call it was captured
/// in.
#[derive(Debug)]
pub struct StackSnapshot {
    backtrace: Backtrace,
}

impl StackSnapshot {
    /// Captures the current call chain, unresolved.
    pub fn capture() -> Self {
        Self {
            backtrace: Backtrace::new_unresolved(),
        }
    }

    /// Resolves symbols and returns a walker over the captured frames.
    pub fn walker(&mut self) -> StackWalker<'_> {
        self.backtrace.resolve();
        StackWalker {
            frames: self.backtrace.frames(),
        }
    }
}

/// One resolved, non-internal location in the call chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerFrame {
    pub qualified_name: String,
    pub line: Option<u32>,
}

impl Display for CallerFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.qualified_name, line),
            None => write!(f, "{}:?", self.qualified_name),
        }
    }
}

/// Walks a resolved snapshot, most recent frame first, skipping
/// instrumentation-internal frames.
#[derive(Debug)]
pub struct StackWalker<'a> {
    frames: &'a [backtrace::BacktraceFrame],
}

impl<'a> StackWalker<'a> {
    /// The filtered frame sequence. Lazy, and restartable by calling again.
    pub fn frames(&self) -> impl Iterator<Item = CallerFrame> + '_ {
        self.frames
            .iter()
            .flat_map(|frame| {
                let symbols = frame.symbols();
                if symbols.is_empty() {
                    // Unresolvable frame: keep it, it can't be proven internal.
                    vec![CallerFrame {
                        qualified_name: UNKNOWN_NAME.to_string(),
                        line: None,
                    }]
                } else {
                    symbols
                        .iter()
                        .map(|symbol| CallerFrame {
                            qualified_name: symbol
                                .name()
                                .map(|name| format!("{:#}", name))
                                .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                            line: symbol.lineno(),
                        })
                        .collect::<Vec<_>>()
                }
            })
            .filter(|frame| !is_internal_symbol(&frame.qualified_name))
    }

    /// The nearest non-internal caller as `"qualifiedName:line"`, or
    /// `"(unknown caller)"` if nothing survived filtering.
    pub fn format_caller(&self) -> String {
        match self.frames().next() {
            Some(frame) => frame.to_string(),
            None => UNKNOWN_CALLER.to_string(),
        }
    }

    /// The whole filtered chain on one line, most recent first, or
    /// `"(unknown stack)"` if nothing survived filtering.
    pub fn format_one_line_stack(&self) -> String {
        format_chain(self.frames())
    }
}

fn format_chain(frames: impl Iterator<Item = CallerFrame>) -> String {
    let chain = frames
        .map(|frame| frame.to_string())
        .collect::<Vec<_>>()
        .join(" <- ");
    if chain.is_empty() {
        UNKNOWN_STACK.to_string()
    } else {
        chain
    }
}

/// Whether a demangled symbol belongs to the instrumentation itself.
///
/// Matches plain paths (`callwise::wrapper::invoke`) and trait-impl paths
/// (`<callwise::StderrLogger as callwise::Logger>::emit`).
fn is_internal_symbol(qualified_name: &str) -> bool {
    let name = qualified_name.strip_prefix('<').unwrap_or(qualified_name);
    INTERNAL_NAMESPACES.iter().any(|namespace| {
        name.strip_prefix(namespace)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::") || rest.starts_with(' '))
    })
}
