//! The typed hook facade the Bus dispatches to by event variant (spec §4.1).

use async_trait::async_trait;

use crate::error::ErrorContext;
use crate::message::{AssistantMessage, ToolCallMessage, ToolResponse, UserMessage};

/// Callbacks invoked by a subscription's worker, one per event variant
/// (spec §4.1's dispatch table). `Delim` is intentionally absent — the Bus
/// never forwards it.
///
/// Every method has a no-op default so implementers only override the
/// variants they care about, the same shape as the donor codebase's
/// `layer0::hook::Hook` (there keyed by `HookPoint` rather than by event
/// variant, but with the same "override what you need" default-impl
/// convention).
///
/// Generic over `R`, the run's decoded result type, matching
/// [`crate::event::Event`].
#[async_trait]
pub trait Hook<R>: Send + Sync {
    /// `Request<UserMessage>` — the caller's prompt.
    async fn on_user_prompt(&self, _message: &UserMessage) {}

    /// `Chunk<AssistantMessage>` — partial assistant text.
    async fn on_assistant_chunk(&self, _chunk: &AssistantMessage) {}

    /// `Chunk<ToolCallMessage>` — partial tool-call descriptor.
    async fn on_tool_call_chunk(&self, _chunk: &ToolCallMessage) {}

    /// `Response<AssistantMessage>` — complete assistant message.
    async fn on_assistant_message(&self, _message: &AssistantMessage) {}

    /// `Response<ToolCallMessage>` — complete tool-call descriptor.
    async fn on_tool_call_message(&self, _message: &ToolCallMessage) {}

    /// `Request<ToolResponse>` — a tool result fed back to the provider.
    async fn on_tool_call_response(&self, _response: &ToolResponse) {}

    /// `Result<T>` — the run's decoded final value.
    async fn on_result(&self, _result: &R) {}

    /// `Error` — an error with run/turn context.
    async fn on_error(&self, _error: &ErrorContext) {}
}
