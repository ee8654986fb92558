//! Token-usage accounting carried by the short-term memory aggregator (§3).

use serde::{Deserialize, Serialize};

/// Cumulative token counts for one memory aggregator.
///
/// `Join` sums usage element-wise (spec §3, §4.2 correctness tests); `Fork`
/// starts a fresh aggregator at zero since the forked copy's own appends
/// haven't consumed anything yet — the parent retains its own counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    /// Tokens consumed by the prompt (instructions + thread) on provider calls.
    pub prompt_tokens: u64,
    /// Tokens produced by the provider in response.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`, tracked separately so it need not
    /// be recomputed by consumers that only look at the total.
    pub total_tokens: u64,
    /// Tokens served from a prompt cache, if the provider reports them.
    pub cache_read_tokens: u64,
    /// Tokens spent writing to a prompt cache, if the provider reports them.
    pub cache_creation_tokens: u64,
}

impl UsageCounters {
    /// Record one turn's usage, keeping `total_tokens` consistent.
    pub fn add_turn(&mut self, prompt: u64, completion: u64) {
        self.prompt_tokens += prompt;
        self.completion_tokens += completion;
        self.total_tokens += prompt + completion;
    }

    /// Element-wise sum, used by `Memory::join` (spec §4.2).
    #[must_use]
    pub fn summed_with(&self, other: &Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
            cache_read_tokens: self.cache_read_tokens + other.cache_read_tokens,
            cache_creation_tokens: self.cache_creation_tokens + other.cache_creation_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summed_with_is_elementwise() {
        let mut a = UsageCounters::default();
        a.add_turn(10, 5);
        let mut b = UsageCounters::default();
        b.add_turn(3, 2);
        let summed = a.summed_with(&b);
        assert_eq!(summed.prompt_tokens, 13);
        assert_eq!(summed.completion_tokens, 7);
        assert_eq!(summed.total_tokens, 20);
    }
}
