//! Short-term conversation memory (spec §3, §4.2, component C2).
//!
//! A [`Memory`] is an append-only, forkable, joinable sequence of
//! [`StoredMessage`]s plus running [`UsageCounters`]. The Reactor works on a
//! fork per turn so a turn's speculative appends can be discarded or folded
//! back via [`Memory::join`] or [`Checkpoint::merge_into`].

use waypoint_types::{
    AssistantMessage, InstructionsMessage, Message, RunId, Sender, StoredMessage, ToolCallMessage,
    ToolResponse, TurnId, UsageCounters, UserMessage,
};

/// The short-term memory aggregator (spec §3's "Memory").
#[derive(Debug, Clone)]
pub struct Memory {
    run_id: RunId,
    id: TurnId,
    messages: Vec<StoredMessage>,
    /// The length at the time of the most recent fork; 0 for a root
    /// aggregator.
    init_len: usize,
    usage: UsageCounters,
}

impl Memory {
    /// Build a fresh root aggregator for `run_id`, with a new `TurnId` and
    /// no messages.
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            id: TurnId::new(),
            messages: Vec::new(),
            init_len: 0,
            usage: UsageCounters::default(),
        }
    }

    /// This aggregator's `TurnId`.
    #[must_use]
    pub fn id(&self) -> TurnId {
        self.id
    }

    /// The run this aggregator belongs to.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Append a pre-built message. The typed `append_*` helpers below are
    /// the usual entry point; this is the single erasure point every
    /// payload kind funnels through (spec §4.2: "all erase to the same
    /// stored form").
    pub fn append(&mut self, sender: Sender, payload: Message) {
        self.messages
            .push(StoredMessage::new(self.run_id, self.id, sender, payload));
    }

    /// Append a user message.
    pub fn append_user(&mut self, sender: Sender, message: UserMessage) {
        self.append(sender, Message::User(message));
    }

    /// Append an assistant message.
    pub fn append_assistant(&mut self, sender: Sender, message: AssistantMessage) {
        self.append(sender, Message::Assistant(message));
    }

    /// Append a tool-call batch.
    pub fn append_tool_call(&mut self, sender: Sender, message: ToolCallMessage) {
        self.append(sender, Message::ToolCall(message));
    }

    /// Append a tool's result.
    pub fn append_tool_response(&mut self, sender: Sender, response: ToolResponse) {
        self.append(sender, Message::ToolResponse(response));
    }

    /// Append rendered instructions.
    pub fn append_instructions(&mut self, sender: Sender, message: InstructionsMessage) {
        self.append(sender, Message::Instructions(message));
    }

    /// A snapshot copy of every message in this aggregator.
    #[must_use]
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.messages.clone()
    }

    /// A restartable, lazy iterator over every message in this aggregator.
    pub fn iter(&self) -> std::slice::Iter<'_, StoredMessage> {
        self.messages.iter()
    }

    /// The number of messages currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether this aggregator holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Cumulative usage for this aggregator.
    #[must_use]
    pub fn usage(&self) -> UsageCounters {
        self.usage
    }

    /// Record usage for a completed turn.
    pub fn record_usage(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.usage.add_turn(prompt_tokens, completion_tokens);
    }

    /// Fork this aggregator: a new `TurnId`, a shallow clone of the message
    /// sequence, `init_len` set to the current length, and usage reset to
    /// zero (the fork's own usage accumulates independently until `join`
    /// sums it back in — spec §3, §4.2).
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            run_id: self.run_id,
            id: TurnId::new(),
            messages: self.messages.clone(),
            init_len: self.messages.len(),
            usage: UsageCounters::default(),
        }
    }

    /// Join a forked-off aggregator back into this one: appends exactly
    /// `other.messages[other.init_len..]` and sums usage element-wise (spec
    /// §3, §4.2). Messages visible to `other` at fork time are not
    /// duplicated.
    pub fn join(&mut self, other: &Memory) {
        self.messages.extend(other.messages[other.init_len..].iter().cloned());
        self.usage = self.usage.summed_with(&other.usage);
    }

    /// Snapshot the messages and usage appended to this aggregator since
    /// its own fork point. The returned [`Checkpoint`] can be folded into
    /// another aggregator later via [`Checkpoint::merge_into`] — used by a
    /// provider implementation to commit a completed response atomically
    /// (spec §3, §4.2).
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            messages: self.messages[self.init_len..].to_vec(),
            usage: self.usage,
        }
    }
}

/// A snapshot handle produced by [`Memory::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    messages: Vec<StoredMessage>,
    usage: UsageCounters,
}

impl Checkpoint {
    /// Append this checkpoint's messages into `target` and sum its usage
    /// into `target`'s (spec §3: "appends checkpoint-era messages into
    /// target").
    pub fn merge_into(&self, target: &mut Memory) {
        target.messages.extend(self.messages.iter().cloned());
        target.usage = target.usage.summed_with(&self.usage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::{AssistantContent, UserContent};

    fn assistant(text: &str) -> AssistantMessage {
        AssistantMessage {
            content: AssistantContent::Text(text.to_string()),
        }
    }

    fn user(text: &str) -> UserMessage {
        UserMessage {
            content: UserContent::Text(text.to_string()),
        }
    }

    #[test]
    fn fork_then_appends_then_join_interleaves_receiver_then_fork() {
        let run_id = RunId::new();
        let mut parent = Memory::new(run_id);
        parent.append_user(None, user("hello"));

        let pre = parent.messages();

        let mut fork = parent.fork();
        parent.append_assistant(Some("agentA".to_string()), assistant("A1"));
        parent.append_assistant(Some("agentA".to_string()), assistant("A2"));
        fork.append_assistant(Some("agentB".to_string()), assistant("B1"));

        parent.join(&fork);

        let final_messages = parent.messages();
        assert_eq!(final_messages.len(), pre.len() + 3);
        assert_eq!(&final_messages[..pre.len()], &pre[..]);
        assert_eq!(final_messages[pre.len()].payload, Message::Assistant(assistant("A1")));
        assert_eq!(final_messages[pre.len() + 1].payload, Message::Assistant(assistant("A2")));
        assert_eq!(final_messages[pre.len() + 2].payload, Message::Assistant(assistant("B1")));
    }

    #[test]
    fn fork_id_differs_from_source() {
        let memory = Memory::new(RunId::new());
        let fork = memory.fork();
        assert_ne!(memory.id(), fork.id());
    }

    #[test]
    fn usage_after_join_is_elementwise_sum() {
        let mut parent = Memory::new(RunId::new());
        parent.record_usage(10, 5);
        let mut fork = parent.fork();
        fork.record_usage(3, 2);

        parent.join(&fork);

        let usage = parent.usage();
        assert_eq!(usage.prompt_tokens, 13);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 20);
    }

    #[test]
    fn checkpoint_merges_post_fork_messages_into_target() {
        let mut parent = Memory::new(RunId::new());
        parent.append_user(None, user("hi"));

        let mut fork = parent.fork();
        fork.append_assistant(Some("agentA".to_string()), assistant("42"));
        let checkpoint = fork.checkpoint();

        checkpoint.merge_into(&mut parent);

        let messages = parent.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].payload, Message::Assistant(assistant("42")));
    }

    #[test]
    fn messages_are_append_only_and_preserve_order() {
        let mut memory = Memory::new(RunId::new());
        memory.append_user(None, user("one"));
        memory.append_user(None, user("two"));
        let messages = memory.messages();
        assert_eq!(messages[0].payload, Message::User(user("one")));
        assert_eq!(messages[1].payload, Message::User(user("two")));
    }
}
