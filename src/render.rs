//SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of argument values, return values, failures, and elapsed time
//! into the display strings that appear in call records.
//!
//! # Value rendering
//!
//! A wrapped routine's arguments can be of any type: types with a `Debug`
//! representation, types with only a `Display` representation, and types with
//! neither. Worse, a representation impl may itself panic. Rendering therefore
//! runs an ordered sequence of strategies, each allowed to fail, with a final
//! strategy that cannot:
//!
//! 1. `Debug` formatting, if the type implements it;
//! 2. `Display` formatting, if the type implements it;
//! 3. `"(<type-name> instance)"`.
//!
//! Strategy *availability* is decided at compile time per call site via
//! autoref specialization ([`render_value!`](crate::render_value) expands to
//! probe calls whose receivers select the `Debug`/`Display` impls only when
//! the bounds hold). Strategy *failure* is handled at runtime: tiers 1 and 2
//! run under `catch_unwind`, so a panicking representation falls through to
//! the next tier instead of escaping into the wrapped call.
//!
//! The [`Render`] trait is the bound-based entry used by
//! [`CallWrapper`](crate::CallWrapper), which sits behind generic code and
//! cannot dispatch on concrete types.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

/// Runs one rendering strategy, converting a panic into `None`.
fn guarded(strategy: impl FnOnce() -> String) -> Option<String> {
    catch_unwind(AssertUnwindSafe(strategy)).ok()
}

/// Carrier for the autoref probes in [`render_value!`](crate::render_value).
/// Not intended to be named outside macro expansions.
pub struct RenderArg<'a, T>(pub &'a T);

pub trait TryRenderDebug {
    fn try_render_debug(&self) -> Option<String>;
}
impl<'a, 'b, T: Debug> TryRenderDebug for &'b RenderArg<'a, T> {
    fn try_render_debug(&self) -> Option<String> {
        guarded(|| format!("{:?}", self.0))
    }
}
pub trait TryRenderDebugFallback {
    fn try_render_debug(&self) -> Option<String>;
}
impl<'a, T> TryRenderDebugFallback for RenderArg<'a, T> {
    fn try_render_debug(&self) -> Option<String> {
        None
    }
}

pub trait TryRenderDisplay {
    fn try_render_display(&self) -> Option<String>;
}
impl<'a, 'b, T: Display> TryRenderDisplay for &'b RenderArg<'a, T> {
    fn try_render_display(&self) -> Option<String> {
        guarded(|| format!("{}", self.0))
    }
}
pub trait TryRenderDisplayFallback {
    fn try_render_display(&self) -> Option<String>;
}
impl<'a, T> TryRenderDisplayFallback for RenderArg<'a, T> {
    fn try_render_display(&self) -> Option<String> {
        None
    }
}

/// The guaranteed-success final tier.
pub fn type_instance_fallback(type_name: &str) -> String {
    format!("({} instance)", type_name)
}

/// Renders a value through the tiered strategy chain.
///
/// Works for values of any type; see the module docs for the tier order.
///
/// ```rust
/// struct Opaque;
/// let rendered = callwise::render_value!(Opaque);
/// assert!(rendered.contains("Opaque instance"));
/// assert_eq!(callwise::render_value!(23), "23");
/// ```
#[macro_export]
macro_rules! render_value {
    ($value:expr) => {{
        #[allow(unused_imports)]
        use $crate::render::{
            TryRenderDebug as _, TryRenderDebugFallback as _, TryRenderDisplay as _,
            TryRenderDisplayFallback as _,
        };
        match &$value {
            __callwise_value => (&&$crate::render::RenderArg(__callwise_value))
                .try_render_debug()
                .or_else(|| {
                    (&&$crate::render::RenderArg(__callwise_value)).try_render_display()
                })
                .unwrap_or_else(|| {
                    $crate::render::type_instance_fallback(::std::any::type_name_of_val(
                        __callwise_value,
                    ))
                }),
        }
    }};
}

/// Bound-based rendering for contexts that are generic over the value type.
///
/// [`CallWrapper`](crate::CallWrapper) requires its arguments and return
/// values to implement this; the blanket impl covers every `Debug` type, with
/// the same panic containment as the macro tiers. (The attribute form has no
/// such bound: it renders at the call site, where the concrete type is known.)
pub trait Render {
    fn render(&self) -> String;
}

impl<T: Debug> Render for T {
    fn render(&self) -> String {
        guarded(|| format!("{:?}", self))
            .unwrap_or_else(|| type_instance_fallback(std::any::type_name::<T>()))
    }
}

/// Joins rendered positional and named arguments: positional first, then
/// `name=value` pairs, all separated by `", "`, each group in supply order.
pub fn format_arguments(positional: &[String], named: &[(&str, String)]) -> String {
    let mut pieces = Vec::with_capacity(positional.len() + named.len());
    pieces.extend(positional.iter().cloned());
    pieces.extend(named.iter().map(|(name, value)| format!("{}={}", name, value)));
    pieces.join(", ")
}

/// Formats an elapsed duration for exit records.
///
/// Under a minute: `00:SS.micros`. Under/at an hour of minutes: `MM:SS`.
/// Beyond: `H:MM:SS`. Whole days fall back to the generic `{:?}` rendering;
/// that doesn't happen for call tracing in practice.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    if total_seconds >= 86_400 {
        return format!("{:?}", elapsed);
    }
    if total_seconds < 60 {
        return format!("00:{:02}.{:06}", total_seconds, elapsed.subsec_micros());
    }
    let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);
    if minutes <= 60 {
        return format!("{:02}:{:02}", minutes, seconds);
    }
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Renders the payload of a caught panic.
///
/// String payloads (the overwhelmingly common case, from `panic!` with a
/// message) are quoted; anything else has no portable representation.
pub fn format_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("panic({:?})", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic({:?})", message)
    } else {
        "panic(<non-string payload>)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_tier_wins() {
        assert_eq!(crate::render_value!(23u32), "23");
        assert_eq!(crate::render_value!("abc"), "\"abc\"");
        assert_eq!(crate::render_value!(vec![1, 2]), "[1, 2]");
    }

    #[test]
    fn display_tier_used_without_debug() {
        struct DisplayOnly;
        impl Display for DisplayOnly {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("display-only")
            }
        }
        assert_eq!(crate::render_value!(DisplayOnly), "display-only");
    }

    #[test]
    fn type_name_tier_used_without_either() {
        struct Opaque;
        let rendered = crate::render_value!(Opaque);
        assert!(rendered.contains("Opaque instance"), "got {rendered}");
    }

    #[test]
    fn panicking_debug_falls_through_to_display() {
        struct Hostile;
        impl Debug for Hostile {
            fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("debug impl broke")
            }
        }
        impl Display for Hostile {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("hostile-but-displayable")
            }
        }
        assert_eq!(crate::render_value!(Hostile), "hostile-but-displayable");
    }

    #[test]
    fn panicking_everything_falls_through_to_type_name() {
        struct VeryHostile;
        impl Debug for VeryHostile {
            fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("debug impl broke")
            }
        }
        impl Display for VeryHostile {
            fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("display impl broke")
            }
        }
        let rendered = crate::render_value!(VeryHostile);
        assert!(rendered.contains("VeryHostile instance"), "got {rendered}");
    }

    #[test]
    fn render_trait_uses_debug() {
        assert_eq!(Render::render(&5i32), "5");
        assert_eq!(Render::render(&Some("x")), "Some(\"x\")");
    }

    #[test]
    fn format_arguments_orders_groups() {
        assert_eq!(
            format_arguments(
                &["1".to_string(), "\"two\"".to_string()],
                &[("c", "3".to_string())]
            ),
            "1, \"two\", c=3"
        );
        assert_eq!(format_arguments(&[], &[]), "");
    }

    #[test]
    fn elapsed_under_a_minute() {
        assert_eq!(
            format_elapsed(Duration::new(3, 141_592_000)),
            "00:03.141592"
        );
        assert_eq!(format_elapsed(Duration::ZERO), "00:00.000000");
    }

    #[test]
    fn elapsed_minutes_and_hours() {
        assert_eq!(format_elapsed(Duration::from_secs(61)), "01:01");
        assert_eq!(format_elapsed(Duration::from_secs(59 * 60 + 59)), "59:59");
        // minute counts up to and including 60 stay in MM:SS
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "60:00");
        assert_eq!(
            format_elapsed(Duration::from_secs(2 * 3600 + 5 * 60 + 7)),
            "2:05:07"
        );
    }

    #[test]
    fn elapsed_whole_days_use_generic_rendering() {
        let rendered = format_elapsed(Duration::from_secs(2 * 86_400));
        assert!(rendered.contains('s'), "got {rendered}");
    }

    #[test]
    fn panic_payloads() {
        let static_payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(format_panic_payload(static_payload.as_ref()), "panic(\"boom\")");

        let owned_payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(format_panic_payload(owned_payload.as_ref()), "panic(\"boom\")");

        let odd_payload: Box<dyn Any + Send> = Box::new(23u8);
        assert_eq!(
            format_panic_payload(odd_payload.as_ref()),
            "panic(<non-string payload>)"
        );
    }
}
