//! The `Agent` interface consumed by the Reactor (spec §3, §6).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Context variables: a string-keyed map of opaque JSON values (spec §3,
/// design note §9 — "a dynamically typed map is adequate"). Copy-on-fork,
/// merged on tool return.
pub type ContextVariables = HashMap<String, serde_json::Value>;

/// A model binding: which provider backend an agent targets and under what
/// name. The core never talks to the provider directly — the Reactor is
/// generic over `waypoint_types::Provider` — but agents still advertise
/// which model they want so the harness can route the call.
pub trait Model: Send + Sync {
    /// The model's name as the provider understands it, e.g. `"gpt-4o"`.
    fn name(&self) -> &str;
    /// The provider identifier, e.g. `"openai"`.
    fn provider(&self) -> &str;
}

/// A simple `(name, provider)` pair implementing [`Model`] for the common case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticModel {
    /// The model's name.
    pub name: String,
    /// The provider identifier.
    pub provider: String,
}

impl Model for StaticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider(&self) -> &str {
        &self.provider
    }
}

/// A tool's schema as advertised to the provider (spec §3's `Tool
/// Definition`, minus the callable — the callable lives in the tool
/// registry, keyed by `name`, so that `waypoint-types` has no dependency on
/// the registry crate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's registered name, as it appears in `ToolCallData::name`.
    pub name: String,
    /// Human-readable description surfaced to the provider.
    pub description: String,
    /// JSON Schema for the tool's arguments object, with `ContextVars`
    /// parameters elided (spec §4.3).
    pub input_schema: serde_json::Value,
}

/// A named bundle of `(model, instruction template, tool set)` — spec §3, §6.
///
/// Immutable once constructed. The Reactor holds agents behind `Arc<dyn
/// Agent>` since a tool call may hand it a *different* agent to swap to
/// mid-run (spec §4.4's transfer partition); the trait must therefore be
/// object-safe.
pub trait Agent: Send + Sync {
    /// The agent's name, as published in `Sender` fields and transfer
    /// messages (`"transfer to agent <name>"`).
    fn name(&self) -> &str;

    /// The model this agent targets.
    fn model(&self) -> &dyn Model;

    /// The instruction template's source text (not yet rendered).
    fn instructions(&self) -> &str;

    /// The tool schemas this agent exposes to the provider.
    fn tools(&self) -> &[ToolDefinition];

    /// Whether the provider may request multiple tool calls in one turn.
    fn parallel_tool_calls(&self) -> bool;

    /// Render `instructions()` against the live context variables.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template references an undefined
    /// placeholder or is otherwise malformed.
    fn render_instructions(&self, ctx_vars: &ContextVariables) -> Result<String, RenderError>;
}

/// A trait-object agent handle, the currency the Reactor and Dispatcher pass
/// around (spec §4.4: "its returned Agent becomes the Reactor's next active
/// agent").
pub type AgentHandle = Arc<dyn Agent>;

/// A plain, directly-constructed [`Agent`] implementation: instructions are
/// rendered with `{{key}}` placeholder substitution against
/// [`ContextVariables`]. Most callers can use this directly; implement
/// [`Agent`] by hand only for custom templating.
pub struct StaticAgent {
    name: String,
    model: StaticModel,
    instructions: String,
    tools: Vec<ToolDefinition>,
    parallel_tool_calls: bool,
}

impl StaticAgent {
    /// Construct a new static agent.
    #[must_use]
    pub fn new(name: impl Into<String>, model: StaticModel, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model,
            instructions: instructions.into(),
            tools: Vec::new(),
            parallel_tool_calls: false,
        }
    }

    /// Attach tool schemas.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Allow multiple tool calls per turn.
    #[must_use]
    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }
}

impl Agent for StaticAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &dyn Model {
        &self.model
    }

    fn instructions(&self) -> &str {
        &self.instructions
    }

    fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls
    }

    fn render_instructions(&self, ctx_vars: &ContextVariables) -> Result<String, RenderError> {
        render_template(&self.instructions, ctx_vars)
    }
}

/// Render `{{key}}` placeholders against a context-variable map.
///
/// Values are interpolated via their JSON display form with surrounding
/// quotes stripped for strings. An unresolved placeholder is a
/// [`RenderError`] (spec §7: `RenderError` terminates the run).
pub fn render_template(template: &str, ctx_vars: &ContextVariables) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(RenderError::UnterminatedPlaceholder);
        };
        let key = after[..end].trim();
        let value = ctx_vars
            .get(key)
            .ok_or_else(|| RenderError::UndefinedVariable(key.to_string()))?;
        match value {
            serde_json::Value::String(s) => out.push_str(s),
            other => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_placeholder() {
        let mut vars = ContextVariables::new();
        vars.insert("city".to_string(), serde_json::json!("NYC"));
        let rendered = render_template("weather in {{city}} today", &vars).unwrap();
        assert_eq!(rendered, "weather in NYC today");
    }

    #[test]
    fn undefined_placeholder_is_a_render_error() {
        let vars = ContextVariables::new();
        let err = render_template("{{missing}}", &vars).unwrap_err();
        assert!(matches!(err, RenderError::UndefinedVariable(ref k) if k == "missing"));
    }

    #[test]
    fn template_with_no_placeholders_passes_through() {
        let vars = ContextVariables::new();
        assert_eq!(render_template("hello", &vars).unwrap(), "hello");
    }

    #[test]
    fn static_agent_exposes_configured_fields() {
        let agent = StaticAgent::new(
            "triage",
            StaticModel {
                name: "gpt-4o".to_string(),
                provider: "openai".to_string(),
            },
            "you triage tickets",
        )
        .with_parallel_tool_calls(true);
        assert_eq!(agent.name(), "triage");
        assert!(agent.parallel_tool_calls());
        assert_eq!(agent.model().provider(), "openai");
    }
}
