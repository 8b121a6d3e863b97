//! # intake-runtime
//!
//! Provider boundary for intake interviews.
//!
//! `intake-core` never calls a provider. This crate does, and owns the one
//! place where a recoverable contract violation may be retried:
//!
//! - [`providers`]: the [`LlmProvider`] seam, factories and credentials
//! - [`prompts`]: the outbound messages for a turn
//! - [`ContractEnforcer`]: one call, at most one corrective retry, then fatal
//! - [`InterviewSession`]: an interview driven turn by turn
//!
//! ## Example
//!
//! ```rust,ignore
//! use intake_runtime::{InterviewSession, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_yaml_file("intake.yaml")?;
//! let registry = Arc::new(intake_core::schema::catalog::innovation_voucher());
//! let mut session = InterviewSession::from_config(&config, &ProviderRegistry::with_defaults(), registry)?;
//!
//! session.answer("We're Acme Ltd").await?;
//! session.confirm()?;
//! ```

pub mod config;
pub mod enforcer;
pub mod prompts;
pub mod providers;
pub mod session;
pub mod usage;

pub use config::{ConfigError, RuntimeConfig};
pub use enforcer::{ContractEnforcer, MAX_ATTEMPTS};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderRegistry, ScriptedProvider, TokenUsage,
};
pub use session::InterviewSession;
pub use usage::{LlmUsage, UsageTracker};
