//! Provider usage accounting for one session.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated provider usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Completions requested, retries included
    pub llm_calls: u32,

    /// Corrective re-queries issued
    pub retries: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.llm_calls = self.llm_calls.saturating_add(1);
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.estimated_cost += estimate_cost(usage, model);
    }
}

/// Estimate cost in USD from per-million-token rates.
fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
    let (input_rate, output_rate) = match model {
        m if m.contains("gpt-4o-mini") => (0.15, 0.6),
        m if m.contains("gpt-4o") => (2.5, 10.0),
        m if m.contains("haiku") => (1.0, 5.0),
        m if m.contains("opus") => (5.0, 25.0),
        m if m.contains("sonnet") => (3.0, 15.0),
        _ => (0.0, 0.0),
    };

    (usage.prompt_tokens as f64 / 1_000_000.0) * input_rate
        + (usage.completion_tokens as f64 / 1_000_000.0) * output_rate
}

/// Shared usage tracker.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: Mutex<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed provider call.
    pub fn record(&self, usage: &TokenUsage, model: &str) {
        self.usage.lock().add(usage, model);
    }

    pub fn record_retry(&self) {
        let mut usage = self.usage.lock();
        usage.retries = usage.retries.saturating_add(1);
    }

    /// Snapshot of current usage.
    pub fn get(&self) -> LlmUsage {
        self.usage.lock().clone()
    }
}
