//! Result marshalling (spec §4.3's dynamic-type-dispatch table), implemented
//! without reflection.
//!
//! Go-style reflection dispatches on a return value's dynamic type at
//! runtime; Rust has no equivalent. Per design note §9 ("languages without
//! runtime reflection should prefer code generation from the same
//! annotations"), each marshallable return type implements [`ToolReturn`]
//! explicitly — the `#[waypoint_tool]` macro (in `waypoint-tool-macros`)
//! requires a tool function's return type to implement it, so the binding
//! is checked at compile time instead of discovered at call time.

use chrono::{DateTime, Utc};

use crate::agent::AgentHandle;

/// The outcome of one tool invocation, after marshalling (spec §4.3,
/// §4.4).
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// A regular tool's marshalled result (the `Value` column of §4.3's
    /// table).
    Value(String),
    /// A transfer tool's result: the next active agent (spec §4.4's
    /// transfer partition).
    Transfer(AgentHandle),
}

/// A return type a tool function may produce, marshalled per spec §4.3.
///
/// Implemented explicitly for each primitive the table names, plus
/// [`AgentHandle`] for transfer tools and [`Json`] as the "anything else"
/// escape hatch — rather than via a blanket `Serialize` impl, so that a
/// transfer tool's `AgentHandle` return can't accidentally be treated as a
/// plain JSON value (the two cases are not interchangeable: only one sets
/// `NextAgent`).
pub trait ToolReturn {
    /// Produce this value's [`ToolOutcome`].
    fn into_outcome(self) -> ToolOutcome;
}

impl ToolReturn for String {
    fn into_outcome(self) -> ToolOutcome {
        ToolOutcome::Value(self)
    }
}

impl ToolReturn for &str {
    fn into_outcome(self) -> ToolOutcome {
        ToolOutcome::Value(self.to_string())
    }
}

macro_rules! impl_tool_return_via_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToolReturn for $ty {
                fn into_outcome(self) -> ToolOutcome {
                    ToolOutcome::Value(self.to_string())
                }
            }
        )+
    };
}

// Signed/unsigned integers: base-10 via Display (spec: "base-10").
impl_tool_return_via_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
// Floating point: Rust's `Display` for `f32`/`f64` already produces the
// shortest string that round-trips (spec: "shortest round-trip decimal").
impl_tool_return_via_display!(f32, f64);

impl ToolReturn for bool {
    fn into_outcome(self) -> ToolOutcome {
        // Not named in §4.3's table; falls through to the "anything else"
        // JSON-encoded behavior, which for a bool is just "true"/"false".
        ToolOutcome::Value(self.to_string())
    }
}

impl ToolReturn for DateTime<Utc> {
    fn into_outcome(self) -> ToolOutcome {
        ToolOutcome::Value(self.to_rfc3339())
    }
}

impl ToolReturn for AgentHandle {
    fn into_outcome(self) -> ToolOutcome {
        ToolOutcome::Transfer(self)
    }
}

/// Wrap any `Serialize` value to opt into the "anything else: JSON-encoded"
/// row of spec §4.3's table.
pub struct Json<T>(pub T);

impl<T: serde::Serialize> ToolReturn for Json<T> {
    fn into_outcome(self) -> ToolOutcome {
        // A tool author's struct is always representable as JSON; an
        // encoding failure here would mean the type is not what it claims
        // to be, so this treats that as unreachable rather than plumbing a
        // fallible path through every tool call.
        let value = serde_json::to_string(&self.0).unwrap_or_else(|e| {
            serde_json::to_string(&format!("<unserializable tool result: {e}>")).unwrap()
        });
        ToolOutcome::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_marshals_verbatim() {
        assert!(matches!(
            "sunny".to_string().into_outcome(),
            ToolOutcome::Value(ref s) if s == "sunny"
        ));
    }

    #[test]
    fn integer_marshals_base10() {
        assert!(matches!(42i64.into_outcome(), ToolOutcome::Value(ref s) if s == "42"));
    }

    #[test]
    fn timestamp_marshals_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ToolOutcome::Value(s) = ts.into_outcome() else {
            panic!("expected Value outcome");
        };
        assert_eq!(s, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn json_wrapper_json_encodes() {
        #[derive(serde::Serialize)]
        struct Weather {
            temp: u32,
            unit: &'static str,
        }
        let ToolOutcome::Value(s) = Json(Weather { temp: 67, unit: "F" }).into_outcome() else {
            panic!("expected Value outcome");
        };
        assert_eq!(s, r#"{"temp":67,"unit":"F"}"#);
    }
}
