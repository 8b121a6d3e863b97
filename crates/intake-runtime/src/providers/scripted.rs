//! Offline provider that replays a fixed list of replies.
//!
//! Used for demos, the CLI without network access, and tests. Replies
//! are returned in order regardless of the request; every request is
//! recorded so callers can inspect what was sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{
    factory::ProviderFactory, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, TokenUsage,
};

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Reply(String),
    Fail(String),
}

/// Replays scripted replies in order.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.steps.lock().push_back(Step::Reply(content.into()));
        self
    }

    /// Queue a JSON reply.
    pub fn reply_json(self, value: &JsonValue) -> Self {
        self.reply(value.to_string())
    }

    /// Queue a transport failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.steps.lock().push_back(Step::Fail(message.into()));
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Messages sent on every call, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }

    /// Build from `{"responses": [...]}`; strings are sent as-is, anything
    /// else is serialized.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let responses = config["responses"].as_array().ok_or_else(|| {
            ProviderError::NotConfigured(
                "scripted provider requires a 'responses' array".to_string(),
            )
        })?;

        Ok(responses
            .iter()
            .fold(Self::new(), |provider, response| match response {
                JsonValue::String(raw) => provider.reply(raw.clone()),
                other => provider.reply_json(other),
            }))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let prompt_tokens = messages
            .iter()
            .map(|m| self.estimate_tokens(&m.content))
            .sum();
        self.requests.lock().push(messages);

        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Reply(content)) => Ok(CompletionResponse {
                usage: TokenUsage {
                    prompt_tokens,
                    completion_tokens: self.estimate_tokens(&content),
                },
                content,
                model: config.model.clone(),
                stop_reason: Some("end_turn".to_string()),
            }),
            Some(Step::Fail(message)) => Err(ProviderError::HttpError(message)),
            None => Err(ProviderError::NotConfigured(format!(
                "scripted provider exhausted after {} calls",
                self.calls()
            ))),
        }
    }

    async fn health_check(&self) -> bool {
        self.remaining() > 0
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Factory for scripted providers.
///
/// ## Configuration Format
/// ```json
/// { "responses": ["{...}", {"acknowledgement": "..."}] }
/// ```
pub struct ScriptedProviderFactory;

impl ProviderFactory for ScriptedProviderFactory {
    fn provider_type(&self) -> &'static str {
        "scripted"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(ScriptedProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        ScriptedProvider::from_config(config).map(|_| ())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "responses": [] })
    }

    fn description(&self) -> &'static str {
        "Offline provider replaying scripted replies"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order() {
        let provider = ScriptedProvider::new().reply("first").reply("second");
        let config = CompletionConfig::default();

        let a = provider
            .complete(vec![ChatMessage::user("a")], &config)
            .await
            .unwrap();
        let b = provider
            .complete(vec![ChatMessage::user("b")], &config)
            .await
            .unwrap();

        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(provider.calls(), 2);
        assert_eq!(provider.requests()[1][0].content, "b");
    }

    #[tokio::test]
    async fn test_failure_and_exhaustion() {
        let provider = ScriptedProvider::new().fail("connection reset");
        let config = CompletionConfig::default();

        let err = provider.complete(vec![], &config).await.unwrap_err();
        assert!(matches!(err, ProviderError::HttpError(_)));

        let err = provider.complete(vec![], &config).await.unwrap_err();
        assert!(err.to_string().contains("exhausted"));
        assert!(!provider.health_check().await);
    }

    #[test]
    fn test_from_config_serializes_objects() {
        let config = serde_json::json!({
            "responses": ["raw text", {"confidence": "high"}]
        });
        let provider = ScriptedProvider::from_config(&config).unwrap();
        assert_eq!(provider.remaining(), 2);
    }
}
