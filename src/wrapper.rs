//SPDX-License-Identifier: MIT OR Apache-2.0

//! The call wrapper: configuration, the shared invocation pipeline, and the
//! value-level wrapping API.
//!
//! Both public forms funnel into [`invoke`]: the `#[log_call]` attribute
//! rewrites a function body to call it, and [`CallWrapper`] calls it from
//! [`CallWrapper::call`]. The pipeline:
//!
//! 1. capture a stack snapshot (unresolved, cheap);
//! 2. open an invocation context (serial id, per-thread depth, start time);
//! 3. emit the "entered" record;
//! 4. run the target under `catch_unwind`;
//! 5. close the context;
//! 6. emit the "exited" record — with the rendered return value, or with the
//!    rendered panic plus a one-line caller chain — then return the value or
//!    `resume_unwind` the original payload.
//!
//! The wrapper never touches arguments or results: the attribute form runs
//! the original body in place, and the value form moves the argument tuple
//! through untouched. Records are attributed to the immediate caller's
//! source location via `#[track_caller]`.

use crate::global_logger::global_loggers;
use crate::invocation::InvocationContext;
use crate::log_record::LogRecord;
use crate::render::{Render, format_arguments, format_elapsed, format_panic_payload};
use crate::stack::StackSnapshot;
use crate::Level;
use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, Location, catch_unwind, resume_unwind};
use thiserror::Error;

/// Logger name used when a wrap site doesn't configure one.
pub const DEFAULT_LOGGER_NAME: &str = "callwise";

/// Marker repeated (depth - 1) times in front of nested call records.
const LOG_STACK_INDENT: &str = "- ";

/// Invalid wrap-site configuration, rejected at construction.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("logger name must not be empty")]
    EmptyLoggerName,
}

/// Per-wrap-site configuration: destination logger name and severity.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    logger_name: Cow<'static, str>,
    level: Level,
}

impl CallConfig {
    /// Builds a configuration, rejecting an empty logger name.
    pub fn new(
        logger_name: impl Into<Cow<'static, str>>,
        level: Level,
    ) -> Result<Self, ConfigError> {
        let logger_name = logger_name.into();
        if logger_name.is_empty() {
            return Err(ConfigError::EmptyLoggerName);
        }
        Ok(Self { logger_name, level })
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for CallConfig {
    /// The zero-configuration wrap: logger [`DEFAULT_LOGGER_NAME`], level
    /// [`Level::Debug`].
    fn default() -> Self {
        Self {
            logger_name: Cow::Borrowed(DEFAULT_LOGGER_NAME),
            level: Level::Debug,
        }
    }
}

/// Builds a [`CallConfig`] whose parts were already validated by the
/// attribute macro at expansion time.
#[doc(hidden)]
pub fn call_config(logger_name: &'static str, level: Level) -> CallConfig {
    CallConfig {
        logger_name: Cow::Borrowed(logger_name),
        level,
    }
}

fn thread_name() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

/// Starts a record with the shared prelude: caller location, logger name,
/// level tag.
fn record_prelude(config: &CallConfig, location: &'static Location<'static>) -> LogRecord {
    let mut record = LogRecord::new(config.logger_name.clone(), config.level);
    record.log(location.file());
    record.log_owned(format!(":{} ", location.line()));
    record.log_owned(format!("[{}] ", config.logger_name));
    record.log(config.level.as_str());
    record.log(": ");
    record
}

fn dispatch(record: LogRecord) {
    for logger in global_loggers() {
        logger.emit(record.clone());
    }
}

fn emit_entered(
    config: &CallConfig,
    location: &'static Location<'static>,
    context: &InvocationContext,
    name: &str,
    rendered_args: &[String],
) {
    let mut record = record_prelude(config, location);
    record.log_owned(LOG_STACK_INDENT.repeat((context.stack_level() - 1) as usize));
    record.log_owned(format!("/{} {}/ ", thread_name(), context.serial()));
    record.log_owned(format!(
        "{}({}) started",
        name,
        format_arguments(rendered_args, &[])
    ));
    dispatch(record);
}

fn emit_exited(
    config: &CallConfig,
    location: &'static Location<'static>,
    context: &InvocationContext,
    result_info: String,
) {
    let mut record = record_prelude(config, location);
    record.log_owned(LOG_STACK_INDENT.repeat((context.stack_level() - 1) as usize));
    record.log_owned(format!("\\{} {}\\ ", thread_name(), context.serial()));
    record.log_owned(format!(
        "{} elapsed, {}",
        format_elapsed(context.elapsed()),
        result_info
    ));
    dispatch(record);
}

/// The shared invocation pipeline. Called from generated code and from
/// [`CallWrapper::call`]; not intended to be called directly.
#[doc(hidden)]
pub fn invoke<R>(
    name: &str,
    config: CallConfig,
    location: &'static Location<'static>,
    rendered_args: Vec<String>,
    render_return: impl FnOnce(&R) -> String,
    target: impl FnOnce() -> R,
) -> R {
    let mut snapshot = StackSnapshot::capture();
    let mut context = InvocationContext::new();
    context.enter();
    emit_entered(&config, location, &context, name, &rendered_args);
    let outcome = catch_unwind(AssertUnwindSafe(target));
    context.exit();
    match outcome {
        Ok(returned) => {
            emit_exited(
                &config,
                location,
                &context,
                format!("{} returned", render_return(&returned)),
            );
            returned
        }
        Err(payload) => {
            emit_exited(
                &config,
                location,
                &context,
                format!(
                    "{} raised, stack: {}",
                    format_panic_payload(payload.as_ref()),
                    snapshot.walker().format_one_line_stack()
                ),
            );
            resume_unwind(payload)
        }
    }
}

/// A callable that can be invoked with an argument tuple and can render that
/// tuple for log output.
///
/// Implemented for `Fn` closures and function pointers of up to eight
/// arguments, each argument implementing [`Render`].
pub trait Invocable<Args> {
    type Output;
    fn invoke(&self, args: Args) -> Self::Output;
    fn render_args(args: &Args) -> Vec<String>;
}

macro_rules! impl_invocable {
    ($($ty:ident),*) => {
        impl<Fun, Ret, $($ty: Render),*> Invocable<($($ty,)*)> for Fun
        where
            Fun: Fn($($ty),*) -> Ret,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn invoke(&self, args: ($($ty,)*)) -> Ret {
                let ($($ty,)*) = args;
                self($($ty),*)
            }

            #[allow(non_snake_case)]
            fn render_args(args: &($($ty,)*)) -> Vec<String> {
                let ($($ty,)*) = args;
                vec![$($ty.render()),*]
            }
        }
    };
}

impl_invocable!();
impl_invocable!(A1);
impl_invocable!(A1, A2);
impl_invocable!(A1, A2, A3);
impl_invocable!(A1, A2, A3, A4);
impl_invocable!(A1, A2, A3, A4, A5);
impl_invocable!(A1, A2, A3, A4, A5, A6);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7, A8);

/// Wraps a pre-existing callable without special syntax.
///
/// This is the value-level counterpart to the `#[log_call]` attribute, for
/// wrapping closures, function pointers, or anything else already in hand:
///
/// ```rust
/// use callwise::CallWrapper;
///
/// let add = CallWrapper::new("add", |a: u32, b: u32| a + b);
/// assert_eq!(add.call((2, 3)), 5);
/// ```
///
/// Arguments travel through as a tuple, by move, untouched. Unlike the
/// attribute form, arguments and return values here must implement
/// [`Render`] (satisfied by any `Debug` type), because this code never sees
/// the concrete types at a spot where rendering strategies could be chosen
/// per type.
pub struct CallWrapper<F> {
    name: Cow<'static, str>,
    config: CallConfig,
    target: F,
}

impl<F> std::fmt::Debug for CallWrapper<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallWrapper")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<F> CallWrapper<F> {
    /// Wraps `target` with the default configuration.
    pub fn new(name: impl Into<Cow<'static, str>>, target: F) -> Self {
        Self::with_config(name, CallConfig::default(), target)
    }

    /// Wraps `target` with an explicit configuration.
    pub fn with_config(
        name: impl Into<Cow<'static, str>>,
        config: CallConfig,
        target: F,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            target,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    /// Invokes the wrapped callable with `args`, emitting the paired
    /// entered/exited records.
    #[track_caller]
    pub fn call<Args>(&self, args: Args) -> F::Output
    where
        F: Invocable<Args>,
        F::Output: Render,
    {
        let rendered_args = F::render_args(&args);
        invoke(
            &self.name,
            self.config.clone(),
            Location::caller(),
            rendered_args,
            |returned: &F::Output| returned.render(),
            || self.target.invoke(args),
        )
    }

    /// Binds a receiver, yielding a callable that pre-supplies `receiver` as
    /// the leading argument on every call.
    ///
    /// This mirrors method binding for targets that take their owner
    /// explicitly, without re-running wrapping configuration:
    ///
    /// ```rust
    /// use callwise::CallWrapper;
    ///
    /// #[derive(Debug)]
    /// struct Counter {
    ///     step: u32,
    /// }
    ///
    /// let advance = CallWrapper::new("advance", |counter: &Counter, by: u32| {
    ///     counter.step * by
    /// });
    /// let counter = Counter { step: 3 };
    /// let bound = advance.bind(&counter);
    /// assert_eq!(bound.call((4,)), 12);
    /// ```
    pub fn bind<'w, 'r, Recv>(&'w self, receiver: &'r Recv) -> BoundCall<'w, 'r, Recv, F> {
        BoundCall {
            wrapper: self,
            receiver,
        }
    }
}

/// A [`CallWrapper`] bound to a receiver; see [`CallWrapper::bind`].
#[derive(Debug)]
pub struct BoundCall<'w, 'r, Recv, F> {
    wrapper: &'w CallWrapper<F>,
    receiver: &'r Recv,
}

impl<'w, 'r, Recv, F> BoundCall<'w, 'r, Recv, F> {
    /// Invokes the underlying wrapper with the receiver prepended to `args`.
    #[track_caller]
    pub fn call<Args>(&self, args: Args) -> <F as Invocable<Args::Prepended>>::Output
    where
        Args: PrependReceiver<'r, Recv>,
        F: Invocable<Args::Prepended>,
        <F as Invocable<Args::Prepended>>::Output: Render,
    {
        self.wrapper.call(args.prepend(self.receiver))
    }
}

/// Prepends a borrowed receiver to an argument tuple.
pub trait PrependReceiver<'r, Recv> {
    type Prepended;
    fn prepend(self, receiver: &'r Recv) -> Self::Prepended;
}

macro_rules! impl_prepend_receiver {
    ($($ty:ident),*) => {
        impl<'r, Recv: 'r, $($ty),*> PrependReceiver<'r, Recv> for ($($ty,)*) {
            type Prepended = (&'r Recv, $($ty,)*);

            #[allow(non_snake_case)]
            fn prepend(self, receiver: &'r Recv) -> Self::Prepended {
                let ($($ty,)*) = self;
                (receiver, $($ty,)*)
            }
        }
    };
}

impl_prepend_receiver!();
impl_prepend_receiver!(A1);
impl_prepend_receiver!(A1, A2);
impl_prepend_receiver!(A1, A2, A3);
impl_prepend_receiver!(A1, A2, A3, A4);
impl_prepend_receiver!(A1, A2, A3, A4, A5);
impl_prepend_receiver!(A1, A2, A3, A4, A5, A6);
impl_prepend_receiver!(A1, A2, A3, A4, A5, A6, A7);
