//! The `Provider` interface consumed by the Reactor (spec §6).
//!
//! Deliberately out of scope per spec §1: the core consumes a streaming
//! completion interface and does not implement a concrete provider driver.
//! This module specifies only that interface.

use std::future::Future;
use std::pin::Pin;

use futures::Stream;

use crate::agent::ToolDefinition;
use crate::error::ProviderOpenError;
use crate::event::Delim;
use crate::id::RunId;
use crate::message::{AssistantMessage, StoredMessage, ToolCallMessage};

/// One request to the completion provider (spec §6).
#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    /// The run this request belongs to.
    pub run_id: RunId,
    /// The active agent's rendered instructions.
    pub instructions: String,
    /// The conversation thread (a memory snapshot — spec §4.2's
    /// `messages()`).
    pub thread: Vec<StoredMessage>,
    /// The active agent's tool schemas.
    pub tools: Vec<ToolDefinition>,
    /// An optional JSON Schema the assistant's content is expected to
    /// conform to. The core itself never validates against this — spec
    /// §9 design note (c): "validation is delegated to `UnmarshalResponse`".
    pub response_schema: Option<serde_json::Value>,
    /// The model to target.
    pub model: String,
}

/// A provider-stream event: the same tagged union as [`crate::event::Event`]
/// minus `Result`, plus a provider-level checkpoint attached to each
/// `Response` so the Reactor can commit it into memory post-read (spec §6).
///
/// Generic over `Chk`, the checkpoint handle type — kept abstract here so
/// `waypoint-types` has no dependency on the memory crate that defines it.
#[derive(Debug, Clone)]
pub enum ProviderStreamEvent<Chk> {
    /// Stream boundary framing.
    Delim(Delim),
    /// Incremental assistant text.
    ChunkAssistant(AssistantMessage),
    /// Incremental tool-call descriptor.
    ChunkToolCall(ToolCallMessage),
    /// A complete assistant message, with a checkpoint the Reactor commits
    /// before continuing.
    ResponseAssistant {
        /// The complete message.
        response: AssistantMessage,
        /// Opaque handle committing this response into memory atomically.
        checkpoint: Chk,
    },
    /// A complete tool-call batch, with a checkpoint the Reactor commits
    /// before dispatching.
    ResponseToolCall {
        /// The complete tool-call batch.
        response: ToolCallMessage,
        /// Opaque handle committing this response into memory atomically.
        checkpoint: Chk,
    },
    /// A mid-stream provider failure.
    Error {
        /// Human-readable error message.
        error: String,
        /// The original error's `Display` text, if distinct from `error`.
        wrapped: Option<String>,
    },
}

/// A boxed stream of provider events, matching the donor codebase's
/// `StreamHandle` shape (`agent-types::stream::StreamHandle`).
pub type ProviderEventStream<Chk> = Pin<Box<dyn Stream<Item = ProviderStreamEvent<Chk>> + Send>>;

/// The completion provider trait. Uses RPITIT (return-position `impl Trait`
/// in trait) in the same style as the donor codebase's `agent-types::Provider`
/// — not object-safe by design; compose via `<P: Provider>` generics rather
/// than `dyn Provider`.
pub trait Provider: Send + Sync {
    /// The checkpoint handle type this provider's streams attach to
    /// `Response` events. Concretely this will be the memory crate's
    /// `Checkpoint` type once a caller wires the two together.
    type Checkpoint: Send + 'static;

    /// Open a completion stream for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderOpenError`] if the provider rejects the request
    /// before streaming begins (spec §7).
    fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> impl Future<Output = Result<ProviderEventStream<Self::Checkpoint>, ProviderOpenError>> + Send;
}
