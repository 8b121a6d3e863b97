//! The single-retry boundary around provider calls.
//!
//! A turn gets at most [`MAX_ATTEMPTS`] provider calls. The first
//! recoverable contract violation triggers exactly one re-query carrying
//! the violation's corrective instruction; a second violation of any kind
//! is fatal. Provider failures are fatal immediately.

use std::sync::Arc;

use intake_core::{ContractViolation, InterviewError, TurnRequest, TurnResponse, TurnValidator};

use crate::prompts;
use crate::providers::{CompletionConfig, LlmProvider};
use crate::usage::UsageTracker;

/// Provider calls permitted per turn: the original and one retry.
pub const MAX_ATTEMPTS: u32 = 2;

/// Runs one turn against a provider and enforces the turn contract.
pub struct ContractEnforcer {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    validator: TurnValidator,
    usage: Arc<UsageTracker>,
}

impl ContractEnforcer {
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
            validator: TurnValidator::new(),
            usage: Arc::new(UsageTracker::new()),
        }
    }

    pub fn usage(&self) -> &Arc<UsageTracker> {
        &self.usage
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Obtain one validated turn for `request`.
    pub async fn run_turn(&self, request: &TurnRequest) -> Result<TurnResponse, InterviewError> {
        let violation = match self.attempt(request, 1).await? {
            Ok(turn) => return Ok(turn),
            Err(violation) => violation,
        };

        tracing::warn!(
            field = %request.field_id,
            kind = ?violation.kind(),
            error = %violation,
            "Contract violation; retrying once with correction"
        );
        self.usage.record_retry();
        let retry = request.with_correction(violation.corrective_instruction());

        match self.attempt(&retry, MAX_ATTEMPTS).await? {
            Ok(turn) => Ok(turn),
            Err(violation) => {
                tracing::error!(
                    field = %request.field_id,
                    kind = ?violation.kind(),
                    "Contract violated on retry"
                );
                Err(InterviewError::Contract {
                    violation,
                    attempts: MAX_ATTEMPTS,
                })
            }
        }
    }

    /// One provider call. The outer error is fatal; the inner one is a
    /// contract violation the caller may retry.
    async fn attempt(
        &self,
        request: &TurnRequest,
        attempt: u32,
    ) -> Result<Result<TurnResponse, ContractViolation>, InterviewError> {
        let messages = prompts::build_messages(request);
        let response = self
            .provider
            .complete(messages, &self.completion)
            .await
            .map_err(|e| {
                tracing::error!(provider = self.provider.name(), attempt, error = %e, "Provider call failed");
                InterviewError::ProviderUnavailable(format!("{}: {}", self.provider.name(), e))
            })?;
        self.usage.record(&response.usage, &response.model);

        let result = self.validator.validate(&response.content);
        if result.is_ok() {
            tracing::debug!(field = %request.field_id, attempt, "Turn accepted");
        }
        Ok(result)
    }
}
