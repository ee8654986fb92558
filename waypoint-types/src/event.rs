//! Event types (spec §4.6): tagged variants published on a [`crate::Topic`]
//! and dispatched to a [`crate::Hook`] by variant.

use chrono::{DateTime, Utc};

use crate::id::{RunId, TurnId};
use crate::message::{AssistantMessage, Meta, Sender, ToolCallMessage, ToolResponse, UserMessage};

/// Stream boundary markers, used for intra-stream framing only — hooks
/// never observe these (spec §4.1's dispatch table: "`Delim` *(suppressed)*").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    /// The provider's stream has opened.
    Start,
    /// The provider's stream has closed.
    End,
    /// A boundary marker carrying no content (keep-alive framing).
    Empty,
}

/// The variant-specific payload of an [`Event`].
///
/// `R` is the run's decoded response type — the type `UnmarshalResponse`
/// produces, carried by the terminal `Result<T>` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum EventBody<R> {
    /// Stream boundary framing (spec §4.1: suppressed from hook dispatch).
    Delim(Delim),
    /// Incremental assistant text (`Chunk<AssistantMessage>`).
    ChunkAssistant(AssistantMessage),
    /// Incremental tool-call descriptor (`Chunk<ToolCallMessage>`).
    ChunkToolCall(ToolCallMessage),
    /// The caller's prompt (`Request<UserMessage>`).
    RequestUser(UserMessage),
    /// A tool's result fed back to the provider (`Request<ToolResponse>`).
    RequestToolResponse(ToolResponse),
    /// A complete assistant message (`Response<AssistantMessage>`).
    ResponseAssistant(AssistantMessage),
    /// A complete tool-call batch (`Response<ToolCallMessage>`).
    ResponseToolCall(ToolCallMessage),
    /// The run's final decoded value (`Result<T>`).
    Result(R),
    /// A run-terminating (or, for `DecodeError`/`PublishError`, non-terminal)
    /// failure.
    Error {
        /// Human-readable error message.
        error: String,
        /// The original error's `Display` text, if distinct from `error`.
        wrapped: Option<String>,
    },
}

/// One published event: an [`EventBody`] plus the provenance every variant
/// carries (spec §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Event<R> {
    /// The run this event belongs to.
    pub run_id: RunId,
    /// The turn this event belongs to.
    pub turn_id: TurnId,
    /// The agent that produced this event, if any.
    pub sender: Sender,
    /// Wall-clock creation time.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata, preserved verbatim by the wire codec.
    pub meta: Meta,
    /// The variant-specific payload.
    pub body: EventBody<R>,
}

impl<R> Event<R> {
    /// Construct an event with the given body, timestamped now and with
    /// empty metadata.
    #[must_use]
    pub fn new(run_id: RunId, turn_id: TurnId, sender: Sender, body: EventBody<R>) -> Self {
        Self {
            run_id,
            turn_id,
            sender,
            timestamp: Utc::now(),
            meta: Meta::new(),
            body,
        }
    }

    /// True for the two variants the Bus never forwards to a hook (spec
    /// §4.1: only `Delim` is suppressed; kept as a named predicate here in
    /// case a future variant needs the same treatment).
    #[must_use]
    pub fn is_suppressed_from_hooks(&self) -> bool {
        matches!(self.body, EventBody::Delim(_))
    }
}
