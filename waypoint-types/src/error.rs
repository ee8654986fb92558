//! Error kinds (spec §7). One `thiserror` enum per row of the table, plus
//! the top-level [`RunError`] that aggregates the kinds a `Run` can
//! terminate with.

use crate::id::{RunId, TurnId};

/// Instruction-template rendering failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// A `{{...}}` placeholder was opened but never closed.
    #[error("unterminated template placeholder")]
    UnterminatedPlaceholder,
    /// The template referenced a context variable that wasn't set.
    #[error("undefined template variable: {0}")]
    UndefinedVariable(String),
}

/// The provider rejected a request before streaming began.
#[derive(Debug, thiserror::Error)]
#[error("provider rejected the request: {0}")]
pub struct ProviderOpenError(pub String);

/// The provider's stream failed mid-flight.
#[derive(Debug, thiserror::Error)]
#[error("provider stream failed: {0}")]
pub struct ProviderStreamError(pub String);

/// `UnmarshalResponse` failed to decode the assistant's content.
///
/// Per spec §7 this is non-terminal: the run continues consuming, in case a
/// later turn produces a decodable payload.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode assistant response: {0}")]
pub struct DecodeError(pub String);

/// A tool call named a tool absent from the active agent's set.
#[derive(Debug, thiserror::Error)]
#[error("unknown tool: {0}")]
pub struct UnknownTool(pub String);

/// A tool panicked or returned an error value.
#[derive(Debug, thiserror::Error)]
#[error("tool '{tool}' failed: {message}")]
pub struct ToolError {
    /// The failing tool's name.
    pub tool: String,
    /// The failure message.
    pub message: String,
}

/// A topic publish failed. Per spec §7 this is logged and swallowed — it
/// does not by itself terminate the run — so it is retained here mainly so
/// the Bus has something typed to log.
#[derive(Debug, thiserror::Error)]
#[error("publish failed: {0}")]
pub struct PublishError(pub String);

/// `Subscribe` was called with no hook (spec §7: synchronous error).
#[derive(Debug, thiserror::Error)]
#[error("hook is required to subscribe")]
pub struct HookValidation;

/// One of the broker/agent/memory/hook arguments to a `RunCommand` was
/// missing at setup time (spec §7: synchronous return from `Run`).
#[derive(Debug, thiserror::Error)]
#[error("setup error: {0}")]
pub struct SetupError(pub String);

/// The aggregate error surfaced as a terminal `Error` event (or, for
/// `Setup`/`HookValidation`, as a synchronous return) by the Reactor.
///
/// Every variant except `Cancelled` carries enough to reconstruct the
/// `Error` event's `RunId`/`TurnId`/`Sender` fields (spec §7: "every `Error`
/// event carries RunID, TurnID, and Sender = active agent name at the time
/// of failure").
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RunError {
    /// See [`SetupError`].
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// See [`RenderError`].
    #[error("render error: {0}")]
    Render(#[source] RenderError),
    /// See [`ProviderOpenError`].
    #[error(transparent)]
    ProviderOpen(#[from] ProviderOpenError),
    /// See [`ProviderStreamError`].
    #[error(transparent)]
    ProviderStream(#[from] ProviderStreamError),
    /// See [`DecodeError`]. Non-terminal; surfaced here only so callers that
    /// want to log every error path still have a single enum to match on.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// See [`UnknownTool`].
    #[error(transparent)]
    UnknownTool(#[from] UnknownTool),
    /// See [`ToolError`].
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// See [`PublishError`]. Non-terminal by itself.
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// See [`HookValidation`].
    #[error(transparent)]
    HookValidation(#[from] HookValidation),
    /// The run was cancelled. Per spec §7 this terminates silently — no
    /// `Error` event is required — so callers should special-case this
    /// variant rather than publish it.
    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// Whether this error is terminal for the run (spec §7: all kinds
    /// terminate except `DecodeError` and `PublishError`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::Publish(_))
    }
}

/// An `Error` event's full payload: the [`RunError`] plus the run/turn/sender
/// context it occurred in (spec §4.6, §7).
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The run this error occurred in.
    pub run_id: RunId,
    /// The turn this error occurred in.
    pub turn_id: TurnId,
    /// The active agent's name at the time of failure, if any.
    pub sender: Option<String>,
    /// The human-readable error message (events carry a string, not the
    /// typed error, so they survive the wire codec).
    pub message: String,
}

impl ErrorContext {
    /// Build an `ErrorContext` from a `RunError` and its run/turn/sender.
    #[must_use]
    pub fn new(run_id: RunId, turn_id: TurnId, sender: Option<String>, err: &RunError) -> Self {
        Self {
            run_id,
            turn_id,
            sender,
            message: err.to_string(),
        }
    }
}
