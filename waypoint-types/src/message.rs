//! The message data model (spec §3).
//!
//! Messages form a discriminated union over five payload kinds. Every stored
//! message additionally carries `{RunId, TurnId, Sender, Timestamp, Meta}` —
//! see [`StoredMessage`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{RunId, TurnId};

/// A single ordered part of a `UserMessage`'s content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserContentPart {
    /// Plain text.
    Text(String),
    /// An image referenced by URL.
    ImageUrl {
        /// The image's location.
        url: String,
    },
    /// Inline audio data.
    AudioBlob {
        /// Raw audio bytes.
        data: Vec<u8>,
        /// The audio's MIME type, e.g. `"audio/wav"`.
        mime_type: String,
    },
}

/// Content of a `UserMessage`: either a bare string or an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserContent {
    /// Shorthand for a single text part.
    Text(String),
    /// An ordered list of heterogeneous parts.
    Parts(Vec<UserContentPart>),
}

/// A message sent by the human/caller side of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    /// The message content.
    pub content: UserContent,
}

/// A single ordered part of an `AssistantMessage`'s content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantContentPart {
    /// Plain text.
    Text(String),
    /// A refusal string — the model declined to answer.
    Refusal(String),
}

/// Content of an `AssistantMessage`: a string, a refusal, or an ordered
/// list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantContent {
    /// Shorthand for a single text response.
    Text(String),
    /// The model refused to respond.
    Refusal(String),
    /// An ordered list of heterogeneous parts.
    Parts(Vec<AssistantContentPart>),
}

impl AssistantContent {
    /// True if this content carries no text (used by the Reactor to decide
    /// whether a `Response<AssistantMessage>` needs decoding — spec §4.5).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) | Self::Refusal(t) => t.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }

    /// Flatten to a single string for display/decoding purposes.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(t) | Self::Refusal(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    AssistantContentPart::Text(t) | AssistantContentPart::Refusal(t) => t.as_str(),
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// A message produced by the completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// The message content.
    pub content: AssistantContent,
}

/// One tool invocation requested by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallData {
    /// The provider-assigned call identifier, echoed back in `ToolResponse`.
    pub id: String,
    /// The tool's registered name.
    pub name: String,
    /// The call's arguments, as a raw JSON string (not yet parsed).
    pub arguments: String,
}

/// An ordered batch of tool calls requested in a single provider turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallMessage {
    /// The requested calls, in the order the provider emitted them.
    pub calls: Vec<ToolCallData>,
}

/// The result of one tool invocation, fed back to the provider as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Matches the originating `ToolCallData::id`.
    pub tool_call_id: String,
    /// The tool's registered name.
    pub tool_name: String,
    /// The marshalled result (spec §4.3's `Value` column), as a string.
    pub content: String,
}

/// System/instructions content rendered by the active agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionsMessage {
    /// The rendered instructions text.
    pub content: String,
}

/// The discriminated union of all message payload kinds (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Content supplied by the caller.
    User(UserMessage),
    /// Content produced by the provider.
    Assistant(AssistantMessage),
    /// A batch of tool invocations requested by the provider.
    ToolCall(ToolCallMessage),
    /// The result of one tool invocation.
    ToolResponse(ToolResponse),
    /// Rendered agent instructions.
    Instructions(InstructionsMessage),
}

impl Message {
    /// Construct a plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::User(UserMessage {
            content: UserContent::Text(text.into()),
        })
    }

    /// Construct a plain-text assistant message.
    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Assistant(AssistantMessage {
            content: AssistantContent::Text(text.into()),
        })
    }
}

/// Free-form, caller-supplied metadata attached to an event or stored
/// message. Preserved verbatim across the wire codec (spec §4.6's round-trip
/// law).
pub type Meta = HashMap<String, serde_json::Value>;

/// The name of whichever agent produced or is implicated by a message/event;
/// absent for caller-originated messages.
pub type Sender = Option<String>;

/// A message as held inside a [`crate::memory::Memory`] aggregator: the
/// payload plus the provenance fields every stored message carries (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// The run this message belongs to.
    pub run_id: RunId,
    /// The turn (memory fork) this message belongs to.
    pub turn_id: TurnId,
    /// The agent that produced this message, if any.
    pub sender: Sender,
    /// Wall-clock creation time.
    pub timestamp: DateTime<Utc>,
    /// Free-form metadata.
    pub meta: Meta,
    /// The message payload.
    pub payload: Message,
}

impl StoredMessage {
    /// Wrap a payload with provenance, timestamped now.
    #[must_use]
    pub fn new(run_id: RunId, turn_id: TurnId, sender: Sender, payload: Message) -> Self {
        Self {
            run_id,
            turn_id,
            sender,
            timestamp: Utc::now(),
            meta: Meta::new(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_content_text_variant_is_empty_iff_blank() {
        assert!(AssistantContent::Text(String::new()).is_empty());
        assert!(!AssistantContent::Text("42".to_string()).is_empty());
    }

    #[test]
    fn assistant_content_parts_flatten_to_joined_text() {
        let content = AssistantContent::Parts(vec![
            AssistantContentPart::Text("sun".to_string()),
            AssistantContentPart::Text("ny".to_string()),
        ]);
        assert_eq!(content.as_text(), "sunny");
    }

    #[test]
    fn user_content_text_shorthand_roundtrips() {
        let msg = Message::user_text("hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn tool_call_message_roundtrips() {
        let msg = Message::ToolCall(ToolCallMessage {
            calls: vec![ToolCallData {
                id: "c1".to_string(),
                name: "getWeather".to_string(),
                arguments: r#"{"location":"NYC"}"#.to_string(),
            }],
        });
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
