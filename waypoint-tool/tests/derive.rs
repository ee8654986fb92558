//! Integration tests for the `#[waypoint_tool]` macro.

use waypoint_tool::{waypoint_tool, ContextVariables, ToolDyn, ToolRegistry};
use std::sync::Arc;
use waypoint_types::{Agent, AgentHandle, Model, RenderError, ToolDefinition};

struct BillingAgent;

impl Agent for BillingAgent {
    fn name(&self) -> &str {
        "billing"
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

#[waypoint_tool(name = "transfer_to_billing", description = "Hand off to billing")]
fn transfer_to_billing() -> AgentHandle {
    Arc::new(BillingAgent)
}

/// Echo text back
#[waypoint_tool(name = "echo", description = "Echo text back")]
async fn echo(text: String) -> String {
    text
}

#[waypoint_tool(name = "add", description = "Add two numbers")]
fn add(a: f64, b: f64) -> f64 {
    a + b
}

/// Reads a context variable named `greeting` and echoes it alongside `text`.
#[waypoint_tool]
async fn greet(text: String, ctx: ContextVariables) -> String {
    let greeting = ctx
        .get("greeting")
        .and_then(|v| v.as_str())
        .unwrap_or("hello")
        .to_string();
    format!("{greeting}, {text}")
}

#[tokio::test]
async fn derive_basic_tool() {
    let tool = echo_tool();
    assert_eq!(tool.name(), "echo");
    assert_eq!(tool.description(), "Echo text back");

    let result = tool
        .call(r#"{"text":"hello"}"#, &ContextVariables::new())
        .await
        .unwrap();
    assert!(matches!(result.outcome, waypoint_types::ToolOutcome::Value(ref s) if s == "hello"));
}

#[tokio::test]
async fn derive_multi_arg_tool() {
    let tool = add_tool();
    assert_eq!(tool.name(), "add");

    let result = tool
        .call(r#"{"a":3.0,"b":4.0}"#, &ContextVariables::new())
        .await
        .unwrap();
    assert!(matches!(result.outcome, waypoint_types::ToolOutcome::Value(ref s) if s == "7"));
}

#[tokio::test]
async fn derive_tool_elides_context_variables_from_schema_and_binds_it_at_call_time() {
    let tool = greet_tool();
    let schema = tool.input_schema();
    let props = schema["properties"].as_object().unwrap();
    assert!(props.contains_key("text"));
    assert!(!props.contains_key("ctx"));

    let mut vars = ContextVariables::new();
    vars.insert("greeting".to_string(), serde_json::json!("hi"));
    let result = tool.call(r#"{"text":"room"}"#, &vars).await.unwrap();
    assert!(matches!(result.outcome, waypoint_types::ToolOutcome::Value(ref s) if s == "hi, room"));
}

#[tokio::test]
async fn derive_tool_registers_in_registry() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(echo_tool()));

    assert!(registry.contains("echo"));
    let tool = registry.get("echo").unwrap();
    let result = tool
        .call(r#"{"text":"world"}"#, &ContextVariables::new())
        .await
        .unwrap();
    assert!(matches!(result.outcome, waypoint_types::ToolOutcome::Value(ref s) if s == "world"));
}

#[test]
fn derive_tool_schema_has_descriptions() {
    let def = echo_tool().definition();
    let props = def.input_schema["properties"].as_object().unwrap();
    assert!(props.contains_key("text"));
}

#[test]
fn derive_tool_falls_back_to_doc_comment_when_description_omitted() {
    let tool = greet_tool();
    assert!(tool.description().contains("Reads a context variable"));
}

#[test]
fn derive_recognizes_agent_handle_return_as_a_transfer_tool() {
    assert!(transfer_to_billing_tool().is_transfer_tool());
    assert!(!echo_tool().is_transfer_tool());
}

#[tokio::test]
async fn derive_transfer_tool_marshals_as_transfer_outcome() {
    let tool = transfer_to_billing_tool();
    let result = tool.call("{}", &ContextVariables::new()).await.unwrap();
    assert!(matches!(result.outcome, waypoint_types::ToolOutcome::Transfer(ref a) if a.name() == "billing"));
}
