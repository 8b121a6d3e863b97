//! One interview, driven end to end against a provider.

use std::sync::Arc;

use intake_core::{
    ConfirmOutcome, Interview, InterviewError, ReviewController, SchemaRegistry, TurnOutcome,
};

use crate::config::RuntimeConfig;
use crate::enforcer::ContractEnforcer;
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::usage::LlmUsage;

/// An interview plus the provider boundary that feeds it.
///
/// Turns are processed one at a time: the provider call is the only
/// suspension point and `answer` takes `&mut self`, so no second turn can
/// start before the first is applied.
pub struct InterviewSession {
    interview: Interview,
    enforcer: ContractEnforcer,
}

impl InterviewSession {
    pub fn new(interview: Interview, enforcer: ContractEnforcer) -> Self {
        Self {
            interview,
            enforcer,
        }
    }

    /// Session over `registry` with the configured provider.
    pub fn from_config(
        config: &RuntimeConfig,
        providers: &ProviderRegistry,
        registry: Arc<SchemaRegistry>,
    ) -> anyhow::Result<Self> {
        let provider: Arc<dyn LlmProvider> = config.create_provider(providers)?;
        tracing::info!(provider = provider.name(), fields = registry.len(), "Session created");
        let enforcer = ContractEnforcer::new(provider, config.completion_config(providers));
        Ok(Self::new(Interview::new(registry), enforcer))
    }

    /// Process one user answer: request, provider call with at most one
    /// retry, then apply the validated turn.
    pub async fn answer(&mut self, user_input: &str) -> Result<TurnOutcome, InterviewError> {
        let request = self.interview.turn_request(user_input)?;
        match self.enforcer.run_turn(&request).await {
            Ok(turn) => self.interview.apply_turn(user_input, turn),
            Err(e) => {
                self.interview.halt(&e);
                Err(e)
            }
        }
    }

    pub fn confirm(&mut self) -> Result<ConfirmOutcome, InterviewError> {
        self.interview.confirm()
    }

    pub fn reject(&mut self, correction: Option<&str>) -> Result<(), InterviewError> {
        self.interview.reject(correction)
    }

    pub fn skip(&mut self) -> Result<Option<String>, InterviewError> {
        self.interview.skip()
    }

    pub fn go_back(&mut self, target: &str) -> Result<(), InterviewError> {
        self.interview.go_back(target)
    }

    pub fn go_back_previous(&mut self) -> Result<String, InterviewError> {
        self.interview.go_back_previous()
    }

    pub fn enter_review(&mut self) -> Result<(), InterviewError> {
        self.interview.enter_review()
    }

    pub fn review(&mut self) -> ReviewController<'_> {
        self.interview.review()
    }

    pub fn interview(&self) -> &Interview {
        &self.interview
    }

    pub fn usage(&self) -> LlmUsage {
        self.enforcer.usage().get()
    }

    pub fn provider_name(&self) -> &str {
        self.enforcer.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionConfig, ScriptedProvider};
    use intake_core::{FieldValue, Phase};
    use serde_json::json;

    fn reply(field: &str, value: serde_json::Value, confidence: &str, next: &str) -> serde_json::Value {
        json!({
            "acknowledgement": "Thanks",
            "extracted_data": {field: value},
            "summary_for_user": "Noted.",
            "confidence": confidence,
            "next_question": next
        })
    }

    fn session(provider: Arc<ScriptedProvider>) -> InterviewSession {
        InterviewSession::new(
            Interview::innovation_voucher(),
            ContractEnforcer::new(provider, CompletionConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_answer_then_confirm() {
        let provider = Arc::new(ScriptedProvider::new().reply_json(&reply(
            "company.legal_name",
            json!("Acme Ltd"),
            "high",
            "Do you trade under a different name?",
        )));
        let mut session = session(provider);

        let outcome = session.answer("We're Acme Ltd").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::AwaitingConfirmation { .. }));
        session.confirm().unwrap();

        assert_eq!(
            session.interview().data().get("company.legal_name"),
            Some(&FieldValue::Text("Acme Ltd".to_string()))
        );
        assert_eq!(session.usage().llm_calls, 1);
    }

    #[tokio::test]
    async fn test_exhausted_retry_halts_session() {
        let bad = json!({
            "acknowledgement": "ok",
            "extracted_data": {},
            "summary_for_user": "",
            "confidence": "high",
            "next_question": "What is your company's CRO number"
        });
        let provider = Arc::new(ScriptedProvider::new().reply_json(&bad).reply_json(&bad));
        let mut session = session(provider.clone());

        let err = session.answer("Acme").await.unwrap_err();
        assert_eq!(err.kind_name(), "QuestionCardinalityError");
        assert!(session.interview().is_halted());

        // Halted: no further provider calls
        let err = session.answer("Acme").await.unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_provider_down_halts_session() {
        let provider = Arc::new(ScriptedProvider::new().fail("503"));
        let mut session = session(provider);
        let err = session.answer("Acme").await.unwrap_err();
        assert!(matches!(err, InterviewError::ProviderUnavailable(_)));
        assert!(session.interview().is_halted());
    }

    #[tokio::test]
    async fn test_data_for_wrong_field_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new().reply_json(&reply(
            "company.cro_number",
            json!("123"),
            "high",
            "What's next?",
        )));
        let mut session = session(provider);
        let err = session.answer("CRO 123").await.unwrap_err();
        assert_eq!(err.kind_name(), "FieldPathError");
        assert!(session.interview().is_halted());
    }

    #[tokio::test]
    async fn test_rejection_seeds_next_call() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .reply_json(&reply("company.legal_name", json!("Acme"), "medium", "What's next?"))
                .reply_json(&reply(
                    "company.legal_name",
                    json!("Acme Holdings Ltd"),
                    "high",
                    "Do you trade under a different name?",
                )),
        );
        let mut session = session(provider.clone());

        session.answer("Acme").await.unwrap();
        session.reject(Some("Acme Holdings Ltd")).unwrap();
        session.answer("Acme Holdings Ltd").await.unwrap();

        let second = &provider.requests()[1][1].content;
        assert!(second.contains("carry_over"));
        assert!(second.contains("rejected your previous understanding"));
        assert_eq!(session.interview().phase(), &Phase::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_from_config_with_scripted_provider() {
        let config = RuntimeConfig::from_yaml(
            r#"
provider: scripted
provider_config:
  responses:
    - acknowledgement: Hi
      extracted_data: {}
      summary_for_user: ""
      confidence: medium
      next_question: What's your company's legal name?
"#,
        )
        .unwrap();
        let mut session = InterviewSession::from_config(
            &config,
            &ProviderRegistry::with_defaults(),
            Arc::new(intake_core::schema::catalog::innovation_voucher()),
        )
        .unwrap();

        assert_eq!(session.provider_name(), "scripted");
        let outcome = session.answer("hello").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::FollowUp { .. }));
    }
}
