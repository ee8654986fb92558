//! Context-window compaction strategies.
//!
//! `ContextStrategy` is a caller-side concern: the Reactor reads a run's
//! full memory fork on every turn and has no compaction gate of its own
//! (§4.5's turn loop is silent on context-window limits). A caller wanting
//! to budget turns applies a strategy to `Memory::messages()` before
//! constructing its own request, or between runs when rebuilding a `Memory`
//! from a persisted thread.

use waypoint_types::StoredMessage;

use crate::counter::TokenCounter;

/// Strategy for managing context-window size across a growing message
/// thread. Implementations: [`NoCompaction`] (passthrough), [`SlidingWindow`]
/// (drop oldest messages once a token budget is exceeded).
pub trait ContextStrategy: Send + Sync {
    /// Estimate the token count a message thread would cost.
    fn token_estimate(&self, messages: &[StoredMessage]) -> usize;

    /// Whether compaction should run given the current thread and a budget.
    fn should_compact(&self, messages: &[StoredMessage], limit: usize) -> bool;

    /// Compact the thread. Returns a shorter (or unchanged) thread.
    fn compact(&self, messages: Vec<StoredMessage>) -> Vec<StoredMessage>;
}

/// A no-op strategy that never compacts — the default for short-lived runs,
/// or when the provider itself truncates server-side.
pub struct NoCompaction {
    counter: TokenCounter,
}

impl Default for NoCompaction {
    fn default() -> Self {
        Self::new()
    }
}

impl NoCompaction {
    /// Build a passthrough strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: TokenCounter::new(),
        }
    }
}

impl ContextStrategy for NoCompaction {
    fn token_estimate(&self, messages: &[StoredMessage]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, _messages: &[StoredMessage], _limit: usize) -> bool {
        false
    }

    fn compact(&self, messages: Vec<StoredMessage>) -> Vec<StoredMessage> {
        messages
    }
}

/// Drops the oldest messages once the thread exceeds a token budget,
/// keeping the first message (typically the run's opening prompt) plus as
/// much of the recent tail as fits half the thread's current size.
pub struct SlidingWindow {
    counter: TokenCounter,
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SlidingWindow {
    /// Build a sliding window using the default 4 chars/token ratio.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: TokenCounter::new(),
        }
    }

    /// Build a sliding window over a custom chars-per-token ratio.
    #[must_use]
    pub fn with_ratio(chars_per_token: f32) -> Self {
        Self {
            counter: TokenCounter::with_ratio(chars_per_token),
        }
    }
}

impl ContextStrategy for SlidingWindow {
    fn token_estimate(&self, messages: &[StoredMessage]) -> usize {
        self.counter.estimate_messages(messages)
    }

    fn should_compact(&self, messages: &[StoredMessage], limit: usize) -> bool {
        self.token_estimate(messages) > limit
    }

    fn compact(&self, messages: Vec<StoredMessage>) -> Vec<StoredMessage> {
        if messages.len() <= 2 {
            return messages;
        }

        let first = messages[0].clone();
        let rest = &messages[1..];

        let total_tokens = self.token_estimate(&messages);
        let target = total_tokens / 2;

        let mut kept = Vec::new();
        let mut current_tokens = self.counter.estimate_message(&first.payload);

        for message in rest.iter().rev() {
            let message_tokens = self.counter.estimate_message(&message.payload);
            if current_tokens + message_tokens > target && !kept.is_empty() {
                break;
            }
            kept.push(message.clone());
            current_tokens += message_tokens;
        }

        kept.reverse();
        let mut result = vec![first];
        result.extend(kept);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::{AssistantContent, AssistantMessage, Message, RunId, Sender, TurnId, UserContent, UserMessage};

    fn text_message(sender: Sender, text: &str, from_assistant: bool) -> StoredMessage {
        let payload = if from_assistant {
            Message::Assistant(AssistantMessage {
                content: AssistantContent::Text(text.to_string()),
            })
        } else {
            Message::User(UserMessage {
                content: UserContent::Text(text.to_string()),
            })
        };
        StoredMessage {
            run_id: RunId::new(),
            turn_id: TurnId::new(),
            sender,
            timestamp: chrono::Utc::now(),
            meta: Default::default(),
            payload,
        }
    }

    #[test]
    fn no_compaction_never_compacts() {
        let strategy = NoCompaction::new();
        let messages = vec![text_message(None, "hello", false)];
        assert!(!strategy.should_compact(&messages, 100));
        let compacted = strategy.compact(messages.clone());
        assert_eq!(compacted.len(), messages.len());
    }

    #[test]
    fn sliding_window_should_compact_past_limit() {
        let sw = SlidingWindow::new();
        let messages = vec![text_message(None, &"a".repeat(400), false)];
        assert!(sw.should_compact(&messages, 50));
        assert!(!sw.should_compact(&messages, 200));
    }

    #[test]
    fn sliding_window_compact_preserves_first_and_latest() {
        let sw = SlidingWindow::new();
        let messages = vec![
            text_message(None, &"first ".repeat(100), false),
            text_message(Some("triage".to_string()), &"old ".repeat(100), true),
            text_message(None, &"middle ".repeat(100), false),
            text_message(Some("triage".to_string()), &"recent ".repeat(100), true),
            text_message(None, &"latest ".repeat(100), false),
        ];

        let compacted = sw.compact(messages.clone());

        assert_eq!(compacted[0].payload, messages[0].payload);
        assert!(compacted.len() < messages.len());
        assert!(compacted.len() >= 2);
        assert_eq!(compacted.last().unwrap().payload, messages.last().unwrap().payload);
    }

    #[test]
    fn sliding_window_short_threads_unchanged() {
        let sw = SlidingWindow::new();
        let messages = vec![text_message(None, "hi", false), text_message(Some("a".to_string()), "hello", true)];
        let compacted = sw.compact(messages.clone());
        assert_eq!(compacted.len(), messages.len());
    }
}
