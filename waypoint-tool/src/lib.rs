//! Tool registry, schema derivation, and result marshalling (spec §4.3,
//! component C3).
//!
//! Tools are type-erased [`ToolDyn`] trait objects, matching the donor
//! codebase's `neuron-tool::ToolDyn` shape (object-safe, `Arc`-stored,
//! async `call` returning a boxed future). Where this crate departs from
//! that shape is §4.3's own contract: schema derivation elides
//! `ContextVariables` parameters, argument binding never fails, and result
//! marshalling dispatches on the callee's return type. The `#[waypoint_tool]`
//! macro (feature `macros`, default-on) generates the `ToolDyn` impl for a
//! plain function so callers don't hand-write any of that.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use waypoint_types::{AgentHandle, ToolDefinition, ToolOutcome, ToolReturn};

pub use waypoint_types::ContextVariables;

#[cfg(feature = "macros")]
pub use waypoint_tool_macros::waypoint_tool;

/// A tool invocation failed (spec §4.3's "implements error" row, §4.4's
/// "invocation ... returns an error" step).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ToolCallError(pub String);

/// One tool call's outcome plus any context-variable writes it produced
/// (spec §4.3: "additional return values of the ContextVars type ...
/// merged ... receiver-wins").
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    /// The marshalled value, or a transfer to a new active agent.
    pub outcome: ToolOutcome,
    /// Context variables the callee wants merged into the live map, if any.
    pub context_vars: Option<ContextVariables>,
}

/// The boxed future a [`ToolDyn::call`] returns.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolCallResult, ToolCallError>> + Send + 'a>>;

/// Object-safe tool interface (spec §6's "tool function surface"), stored
/// as `Arc<dyn ToolDyn>` in a [`ToolRegistry`] — grounded on the donor
/// codebase's `neuron-tool::ToolDyn`.
pub trait ToolDyn: Send + Sync {
    /// The tool's registered name.
    fn name(&self) -> &str;

    /// Human-readable description surfaced to the provider.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments object, with `ContextVariables`
    /// parameters elided (spec §4.3).
    fn input_schema(&self) -> serde_json::Value;

    /// Bind `arguments` (a raw JSON object string) and invoke the tool.
    /// Binding never fails (spec §4.3): malformed or missing fields fall
    /// back to that field's `Default`. `ctx_vars` supplies the live
    /// context-variable map for any elided parameter.
    fn call<'a>(&'a self, arguments: &'a str, ctx_vars: &'a ContextVariables) -> ToolFuture<'a>;

    /// Whether this tool's declared return type implements the `Agent`
    /// interface — spec §4.4's partitioning rule is a static property of the
    /// tool, not something discovered by invoking it. Tools generated by
    /// `#[waypoint_tool]` set this from the annotated function's return
    /// type; hand-written `ToolDyn` impls that return [`AgentHandle`]
    /// should override it.
    fn is_transfer_tool(&self) -> bool {
        false
    }

    /// This tool's schema as a [`ToolDefinition`] (spec §3).
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Normalizes the many shapes a `#[waypoint_tool]`-annotated function may
/// return into `(ToolOutcome, Option<ContextVariables>)` or a tool-level
/// error string (spec §4.3's result-marshalling table, plus the
/// additional-context-vars-return rule).
///
/// Implemented for four non-overlapping shapes rather than via reflection:
/// a bare [`ToolReturn`], a `(ToolReturn, ContextVariables)` pair, and the
/// `Result<_, E>` wrapping of each — the same coherence-driven design as
/// [`waypoint_types::tool_return::ToolReturn`] itself.
pub trait ToolFnOutput {
    /// Normalize this return value.
    ///
    /// # Errors
    ///
    /// Returns the callee's error message if this value represents a
    /// failed call.
    fn into_tool_result(self) -> Result<(ToolOutcome, Option<ContextVariables>), String>;
}

impl<R: ToolReturn> ToolFnOutput for R {
    fn into_tool_result(self) -> Result<(ToolOutcome, Option<ContextVariables>), String> {
        Ok((self.into_outcome(), None))
    }
}

impl<R: ToolReturn> ToolFnOutput for (R, ContextVariables) {
    fn into_tool_result(self) -> Result<(ToolOutcome, Option<ContextVariables>), String> {
        let (value, context_vars) = self;
        Ok((value.into_outcome(), Some(context_vars)))
    }
}

impl<R: ToolReturn, E: std::fmt::Display> ToolFnOutput for Result<R, E> {
    fn into_tool_result(self) -> Result<(ToolOutcome, Option<ContextVariables>), String> {
        match self {
            Ok(value) => Ok((value.into_outcome(), None)),
            Err(e) => Err(e.to_string()),
        }
    }
}

impl<R: ToolReturn, E: std::fmt::Display> ToolFnOutput for Result<(R, ContextVariables), E> {
    fn into_tool_result(self) -> Result<(ToolOutcome, Option<ContextVariables>), String> {
        match self {
            Ok((value, context_vars)) => Ok((value.into_outcome(), Some(context_vars))),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// A transfer tool's result: the caller just needs an [`AgentHandle`] to
/// implement [`ToolReturn`], already provided by `waypoint-types`.
pub use waypoint_types::Json;

/// Registry of tools, keyed by name (spec §3, §6 — grounded on the donor
/// codebase's `agent-tool::registry::ToolRegistry` / `neuron-tool::ToolRegistry`,
/// minus their middleware pipeline, which spec.md never calls for).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, overwriting any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolDyn>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Schemas for every registered tool, in no particular order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// The number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use waypoint_types::{Agent, Model, RenderError};

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echoes its input back"
        }

        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        fn call<'a>(&'a self, arguments: &'a str, _ctx_vars: &'a ContextVariables) -> ToolFuture<'a> {
            Box::pin(async move {
                let value: serde_json::Value =
                    serde_json::from_str(arguments).unwrap_or(serde_json::Value::Null);
                let text = value
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                text.into_tool_result()
                    .map(|(outcome, context_vars)| ToolCallResult {
                        outcome,
                        context_vars,
                    })
                    .map_err(ToolCallError)
            })
        }
    }

    #[tokio::test]
    async fn registry_round_trips_a_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        assert!(registry.contains("echo"));
        let tool = registry.get("echo").unwrap();
        let result = tool
            .call(r#"{"text":"hi"}"#, &ContextVariables::new())
            .await
            .unwrap();
        assert!(matches!(result.outcome, ToolOutcome::Value(ref s) if s == "hi"));
    }

    #[test]
    fn plain_return_normalizes_with_no_context_vars() {
        let (outcome, ctx) = "hi".to_string().into_tool_result().unwrap();
        assert!(matches!(outcome, ToolOutcome::Value(ref s) if s == "hi"));
        assert!(ctx.is_none());
    }

    #[test]
    fn tuple_return_carries_context_vars() {
        let mut vars = ContextVariables::new();
        vars.insert("k".to_string(), serde_json::json!("v1"));
        let (outcome, ctx) = (String::new(), vars.clone()).into_tool_result().unwrap();
        assert!(matches!(outcome, ToolOutcome::Value(ref s) if s.is_empty()));
        assert_eq!(ctx, Some(vars));
    }

    #[test]
    fn result_err_surfaces_as_tool_error_message() {
        let outcome: Result<String, &str> = Err("boom");
        let err = outcome.into_tool_result().unwrap_err();
        assert_eq!(err, "boom");
    }

    struct NextAgentStub;

    impl Agent for NextAgentStub {
        fn name(&self) -> &str {
            "triage"
        }
        fn model(&self) -> &dyn Model {
            struct M;
            impl Model for M {
                fn name(&self) -> &str {
                    "m"
                }
                fn provider(&self) -> &str {
                    "p"
                }
            }
            // Leaked only for this test's lifetime-free access pattern.
            Box::leak(Box::new(M))
        }
        fn instructions(&self) -> &str {
            ""
        }
        fn tools(&self) -> &[ToolDefinition] {
            &[]
        }
        fn parallel_tool_calls(&self) -> bool {
            false
        }
        fn render_instructions(&self, _ctx_vars: &ContextVariables) -> Result<String, RenderError> {
            Ok(String::new())
        }
    }

    #[test]
    fn agent_return_marshals_as_transfer() {
        let handle: AgentHandle = Arc::new(NextAgentStub);
        let (outcome, ctx) = handle.into_tool_result().unwrap();
        assert!(matches!(outcome, ToolOutcome::Transfer(_)));
        assert!(ctx.is_none());
    }
}
