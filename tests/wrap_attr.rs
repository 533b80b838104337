//SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the `#[log_call]` attribute form.

use callwise::global_logger::set_global_loggers;
use callwise::{InMemoryLogger, Level, log_call};
use std::sync::{Arc, Mutex, MutexGuard};

// Tests swap the global logger registry, so they must not interleave.
static TEST_LOGGER_GUARD: Mutex<()> = Mutex::new(());

fn capture() -> (MutexGuard<'static, ()>, Arc<InMemoryLogger>) {
    let guard = TEST_LOGGER_GUARD
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let logger = Arc::new(InMemoryLogger::new());
    set_global_loggers(vec![logger.clone()]);
    (guard, logger)
}

#[log_call]
fn add(a: u32, b: u32) -> u32 {
    a + b
}

#[test]
fn add_logs_one_enter_and_one_exit() {
    let (_guard, logger) = capture();
    assert_eq!(add(2, 3), 5);

    let logs = logger.drain_logs();
    let lines: Vec<&str> = logs.lines().collect();
    assert_eq!(lines.len(), 2, "exactly two records per invocation:\n{logs}");
    assert!(lines[0].contains("add(2, 3) started"), "got {}", lines[0]);
    assert!(lines[1].contains("elapsed"), "got {}", lines[1]);
    assert!(lines[1].contains("5 returned"), "got {}", lines[1]);
}

#[test]
fn records_attribute_to_the_call_site() {
    let (_guard, logger) = capture();
    let call_line = line!() + 1;
    add(2, 3);

    let logs = logger.drain_logs();
    for line in logs.lines() {
        assert!(
            line.contains(&format!("wrap_attr.rs:{} ", call_line)),
            "record should point at the caller, got {line}"
        );
    }
}

#[log_call]
fn returns_as_is<T: std::fmt::Debug>(value: T) -> T {
    value
}

#[test]
fn return_values_come_back_unchanged() {
    let (_guard, _logger) = capture();
    assert_eq!(returns_as_is(false), false);
    assert_eq!(returns_as_is(0u8), 0u8);
    assert_eq!(returns_as_is(""), "");
    assert_eq!(returns_as_is(Vec::<u8>::new()), Vec::<u8>::new());
    assert_eq!(returns_as_is(Some(())), Some(()));
}

#[test]
fn boxed_values_keep_their_identity() {
    let (_guard, _logger) = capture();
    let boxed = Box::new(23);
    let address = &*boxed as *const i32;
    let returned = returns_as_is(boxed);
    assert_eq!(&*returned as *const i32, address, "value must not be copied");
}

struct Opaque(u8);

#[log_call]
fn passes_opaque(value: Opaque) -> Opaque {
    value
}

#[test]
fn undebuggable_arguments_render_as_type_instances() {
    let (_guard, logger) = capture();
    let out = passes_opaque(Opaque(7));
    assert_eq!(out.0, 7);

    let logs = logger.drain_logs();
    assert!(logs.contains("Opaque instance"), "got {logs}");
}

#[log_call]
fn try_parse(input: &str) -> Result<u32, std::num::ParseIntError> {
    input.parse()
}

#[test]
fn err_results_are_returned_not_raised() {
    let (_guard, logger) = capture();
    assert!(try_parse("23").is_ok());
    assert!(try_parse("not a number").is_err());

    let logs = logger.drain_logs();
    assert!(logs.contains("Ok(23) returned"), "got {logs}");
    assert!(logs.contains("Err(") && logs.contains(") returned"), "got {logs}");
    assert!(!logs.contains("raised"), "an Err return is not a failure:\n{logs}");
}

#[log_call]
fn countdown(n: u32) -> u32 {
    if n == 0 { 0 } else { countdown(n - 1) + 1 }
}

#[test]
fn recursion_produces_two_records_per_level() {
    let (_guard, logger) = capture();
    assert_eq!(countdown(2), 2);

    let logs = logger.drain_logs();
    let lines: Vec<&str> = logs.lines().collect();
    assert_eq!(lines.len(), 6, "2 records x 3 invocations:\n{logs}");
    assert_eq!(logs.matches("started").count(), 3);
    assert_eq!(logs.matches("returned").count(), 3);

    // depth indents: level 1 has no marker, level 2 one, level 3 two
    assert!(lines[0].contains("/ ") && !lines[0].contains("- /"), "got {}", lines[0]);
    assert!(lines[1].contains("- /") && !lines[1].contains("- - /"), "got {}", lines[1]);
    assert!(lines[2].contains("- - /"), "got {}", lines[2]);
}

#[log_call]
fn inner_step() -> u32 {
    23
}

#[log_call]
fn middle_step() -> u32 {
    inner_step()
}

#[log_call]
fn outer_step() -> u32 {
    middle_step()
}

#[test]
fn nested_calls_indent_and_restore_depth() {
    let (_guard, logger) = capture();
    outer_step();

    let logs = logger.drain_logs();
    let started: Vec<&str> = logs.lines().filter(|l| l.contains("started")).collect();
    assert_eq!(started.len(), 3);
    assert!(!started[0].contains("- /"));
    assert!(started[1].contains("- /"));
    assert!(started[2].contains("- - /"));

    // parent depth restored: a fresh top-level call starts back at level 1
    inner_step();
    let logs = logger.drain_logs();
    let line = logs.lines().next().unwrap();
    assert!(line.contains("/ ") && !line.contains("- /"), "got {line}");
}

#[test]
fn nested_records_point_at_each_caller_not_the_wrapper() {
    let (_guard, logger) = capture();
    outer_step();

    let logs = logger.drain_logs();
    for line in logs.lines() {
        assert!(line.contains("wrap_attr.rs:"), "got {line}");
        assert!(
            !line.contains("src/wrapper.rs") && !line.contains("src/lib.rs"),
            "no record may attribute to instrumentation internals, got {line}"
        );
    }
}

#[log_call]
fn explode() {
    panic!("boom");
}

#[test]
fn panics_are_logged_then_propagated_unchanged() {
    let (_guard, logger) = capture();
    let payload = std::panic::catch_unwind(explode).unwrap_err();
    assert_eq!(*payload.downcast_ref::<&str>().unwrap(), "boom");

    let logs = logger.drain_logs();
    let lines: Vec<&str> = logs.lines().collect();
    assert_eq!(lines.len(), 2, "panic still produces the exit record:\n{logs}");
    assert!(lines[0].contains("explode() started"), "got {}", lines[0]);
    assert!(
        lines[1].contains(r#"panic("boom") raised, stack: "#),
        "got {}",
        lines[1]
    );
    assert!(lines[1].contains("elapsed"), "got {}", lines[1]);
}

#[test]
fn depth_recovers_after_a_panicking_call() {
    let (_guard, logger) = capture();
    let _ = std::panic::catch_unwind(explode);
    logger.drain_logs();

    inner_step();
    let logs = logger.drain_logs();
    let line = logs.lines().next().unwrap();
    assert!(!line.contains("- /"), "depth must be restored on the unwind path, got {line}");
}

#[log_call(logger_name = "my.logger", level = warning)]
fn warn_configured() {}

#[log_call(logger_name = "other.logger", level = error)]
fn error_configured() {}

#[log_call(level = debug)]
fn debug_configured() {}

#[log_call(level = info)]
fn info_configured() {}

#[log_call(level = critical)]
fn critical_configured() {}

#[test]
fn configuration_reaches_the_records() {
    let (_guard, logger) = capture();
    warn_configured();
    error_configured();

    let records = logger.drain_records();
    assert_eq!(records.len(), 4);
    assert!(records[..2]
        .iter()
        .all(|r| r.logger_name() == "my.logger" && r.level() == Level::Warning));
    assert!(records[2..]
        .iter()
        .all(|r| r.logger_name() == "other.logger" && r.level() == Level::Error));
}

#[test]
fn all_severities_are_usable() {
    let (_guard, logger) = capture();
    debug_configured();
    info_configured();
    warn_configured();
    error_configured();
    critical_configured();

    let levels: Vec<Level> = logger
        .drain_records()
        .iter()
        .map(|record| record.level())
        .collect();
    assert_eq!(
        levels,
        vec![
            Level::Debug,
            Level::Debug,
            Level::Info,
            Level::Info,
            Level::Warning,
            Level::Warning,
            Level::Error,
            Level::Error,
            Level::Critical,
            Level::Critical,
        ]
    );
}

#[test]
fn default_configuration_uses_the_crate_logger_at_debug() {
    let (_guard, logger) = capture();
    add(1, 1);

    let records = logger.drain_records();
    assert!(records
        .iter()
        .all(|r| r.logger_name() == "callwise" && r.level() == Level::Debug));
}

#[derive(Debug)]
struct Counter {
    count: u32,
}

impl Counter {
    #[log_call]
    fn fresh() -> Self {
        Counter { count: 0 }
    }

    #[log_call]
    fn increment(&mut self, by: u32) -> u32 {
        self.count += by;
        self.count
    }

    #[log_call]
    fn get(&self) -> u32 {
        self.count
    }
}

#[test]
fn methods_bind_like_their_unwrapped_selves() {
    let (_guard, logger) = capture();

    // associated function, no receiver
    let mut counter = Counter::fresh();
    // instance attribute access
    assert_eq!(counter.increment(2), 2);
    // fully qualified call supplying the receiver explicitly
    assert_eq!(Counter::increment(&mut counter, 3), 5);
    assert_eq!(counter.get(), 5);

    let logs = logger.drain_logs();
    assert_eq!(logs.matches("started").count(), 4);
    assert!(logs.contains("fresh() started"), "got {logs}");
    // the receiver renders as the leading argument
    assert!(logs.contains("increment(Counter { count: 0 }, 2) started"), "got {logs}");
    assert!(logs.contains("increment(Counter { count: 2 }, 3) started"), "got {logs}");
    assert!(logs.contains("get(Counter { count: 5 }) started"), "got {logs}");
}

#[log_call]
fn sleepy() {
    std::thread::sleep(std::time::Duration::from_millis(10));
}

#[test]
fn concurrent_threads_track_depth_independently() {
    let (_guard, logger) = capture();

    let spawn_named = |name: &str| {
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(sleepy)
            .unwrap()
    };
    let first = spawn_named("walker-one");
    let second = spawn_named("walker-two");
    first.join().unwrap();
    second.join().unwrap();

    let logs = logger.drain_logs();
    assert_eq!(logs.lines().count(), 4);
    assert_eq!(logs.matches("/walker-one ").count() + logs.matches("\\walker-one ").count(), 2);
    assert_eq!(logs.matches("/walker-two ").count() + logs.matches("\\walker-two ").count(), 2);
    // both threads ran at top level: no record carries an indent marker
    for line in logs.lines() {
        assert!(!line.contains("- /") && !line.contains("- \\"), "got {line}");
    }
}

#[log_call]
fn takes_patterns((a, b): (u32, u32), mut scale: u32) -> u32 {
    scale += 1;
    (a + b) * scale
}

#[test]
fn non_identifier_patterns_render_as_placeholders() {
    let (_guard, logger) = capture();
    assert_eq!(takes_patterns((1, 2), 1), 6);

    let logs = logger.drain_logs();
    assert!(logs.contains("takes_patterns(_, 1) started"), "got {logs}");
}
