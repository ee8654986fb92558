//! Heuristic token-count estimation from messages and tool definitions.

use waypoint_types::{AssistantContent, Message, StoredMessage, ToolDefinition, UserContent};

/// Estimates token counts from text using a configurable chars-per-token ratio.
///
/// This is a heuristic, not a real tokenizer — actual token counts vary per
/// model and vocabulary. The default ratio of 4.0 chars/token approximates
/// common GPT-family and Claude-family tokenizers closely enough for turn
/// budgeting.
pub struct TokenCounter {
    chars_per_token: f32,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    /// Build a counter with the default ratio of 4.0 chars/token.
    #[must_use]
    pub fn new() -> Self {
        Self { chars_per_token: 4.0 }
    }

    /// Build a counter with a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self {
            chars_per_token: chars_per_token.max(0.1),
        }
    }

    /// Estimate the token count of a raw text string.
    #[must_use]
    pub fn estimate_text(&self, text: &str) -> usize {
        (text.len() as f32 / self.chars_per_token).ceil() as usize
    }

    /// Estimate the total token count across a run of stored messages.
    #[must_use]
    pub fn estimate_messages(&self, messages: &[StoredMessage]) -> usize {
        messages.iter().map(|m| self.estimate_message(&m.payload)).sum()
    }

    /// Estimate the total token count a tool set's schemas add to a request.
    #[must_use]
    pub fn estimate_tools(&self, tools: &[ToolDefinition]) -> usize {
        tools
            .iter()
            .map(|t| {
                let name = self.estimate_text(&t.name);
                let description = self.estimate_text(&t.description);
                let schema = self.estimate_text(&t.input_schema.to_string());
                name + description + schema
            })
            .sum()
    }

    /// Estimate one message's token count, including a small fixed overhead
    /// for role/formatting every message kind carries.
    #[must_use]
    pub fn estimate_message(&self, message: &Message) -> usize {
        const ROLE_OVERHEAD: usize = 4;
        ROLE_OVERHEAD + self.estimate_payload(message)
    }

    fn estimate_payload(&self, message: &Message) -> usize {
        match message {
            Message::User(user) => match &user.content {
                UserContent::Text(text) => self.estimate_text(text),
                UserContent::Parts(parts) => parts
                    .iter()
                    .map(|part| match part {
                        waypoint_types::UserContentPart::Text(text) => self.estimate_text(text),
                        waypoint_types::UserContentPart::ImageUrl { url } => self.estimate_text(url).max(300),
                        waypoint_types::UserContentPart::AudioBlob { data, .. } => data.len() / 16 + 1,
                    })
                    .sum(),
            },
            Message::Assistant(assistant) => match &assistant.content {
                AssistantContent::Text(text) | AssistantContent::Refusal(text) => self.estimate_text(text),
                AssistantContent::Parts(parts) => parts
                    .iter()
                    .map(|part| match part {
                        waypoint_types::AssistantContentPart::Text(text)
                        | waypoint_types::AssistantContentPart::Refusal(text) => self.estimate_text(text),
                    })
                    .sum(),
            },
            Message::ToolCall(tool_call) => tool_call
                .calls
                .iter()
                .map(|call| self.estimate_text(&call.name) + self.estimate_text(&call.arguments))
                .sum(),
            Message::ToolResponse(response) => self.estimate_text(&response.content),
            Message::Instructions(instructions) => self.estimate_text(&instructions.content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::{AssistantMessage, RunId, Sender, TurnId};
    use chrono::Utc;

    fn stored(sender: Sender, payload: Message) -> StoredMessage {
        StoredMessage {
            run_id: RunId::new(),
            turn_id: TurnId::new(),
            sender,
            timestamp: Utc::now(),
            meta: Default::default(),
            payload,
        }
    }

    #[test]
    fn estimate_text_rounds_up() {
        let counter = TokenCounter::new();
        assert_eq!(counter.estimate_text(&"a".repeat(400)), 100);
        assert_eq!(counter.estimate_text("abc"), 1);
    }

    #[test]
    fn custom_ratio_changes_estimate() {
        let counter = TokenCounter::with_ratio(2.0);
        assert_eq!(counter.estimate_text(&"a".repeat(400)), 200);
    }

    #[test]
    fn estimate_messages_sums_payload_plus_overhead() {
        let counter = TokenCounter::new();
        let messages = vec![stored(
            None,
            Message::Assistant(AssistantMessage {
                content: AssistantContent::Text("a".repeat(400)),
            }),
        )];
        assert_eq!(counter.estimate_messages(&messages), 104);
    }

    #[test]
    fn estimate_tools_sums_name_description_and_schema() {
        let counter = TokenCounter::new();
        let tools = vec![ToolDefinition {
            name: "get_weather".to_string(),
            description: "fetches current weather".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        }];
        assert!(counter.estimate_tools(&tools) > 0);
    }
}
