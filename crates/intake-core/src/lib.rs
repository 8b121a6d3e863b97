//! # intake-core
//!
//! Deterministic turn-validation state machine for structured interviews.
//!
//! An interview fills a declared schema one field at a time from the
//! output of an untrusted language-model provider. This crate decides:
//! - Is this provider turn well-formed?
//! - May the extracted value be written yet?
//! - Where is the interview, and what is legal next?
//!
//! ## Key Guarantees
//!
//! 1. **No provider calls**: validation and transitions are rule-based
//! 2. **Explicit state**: progress lives in [`InterviewState`], never in history
//! 3. **Confirm before write**: no value reaches [`ApplicationData`] unconfirmed
//! 4. **Fail loud**: every illegal transition is a fatal [`InterviewError`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use intake_core::{Interview, TurnValidator};
//!
//! let mut interview = Interview::innovation_voucher();
//! let raw = provider_reply(interview.turn_request("We're Acme Ltd")?);
//! let turn = TurnValidator::new().validate(&raw)?;
//!
//! interview.apply_turn("We're Acme Ltd", turn)?;
//! interview.confirm()?;
//! ```

pub mod interview;
pub mod review;
pub mod schema;
pub mod state;
pub mod turn;

// Re-export main types at crate root
pub use interview::{ConfirmOutcome, Interview, TurnOutcome};
pub use review::{ReviewController, ReviewEntry, ReviewSection, ReviewSnapshot};
pub use schema::{
    ApplicationData, FieldPathError, FieldTag, FieldType, FieldValue, RegistryError, SchemaField,
    SchemaRegistry,
};
pub use state::{InterviewState, PendingConfirmation, Phase};
pub use turn::{
    Confidence, ContractViolation, NextQuestion, TurnRequest, TurnResponse, TurnSeed,
    TurnValidator, ViolationKind, TERMINAL_SENTINEL,
};

use thiserror::Error;

/// Fatal interview errors. Any of these halts the interview.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterviewError {
    /// The provider broke the turn contract on every permitted attempt
    #[error("Agent contract violation after {attempts} attempt(s): {kind}: {violation}", kind = .violation.kind())]
    Contract {
        violation: ContractViolation,
        attempts: u32,
    },

    #[error("Field path error: {0}")]
    FieldPath(#[from] FieldPathError),

    #[error("State discipline violation: {0}")]
    StateDiscipline(String),

    /// The provider could not be reached. Never retried.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl InterviewError {
    /// Short name of the error kind, for logs and the CLI.
    pub fn kind_name(&self) -> String {
        match self {
            InterviewError::Contract { violation, .. } => violation.kind().to_string(),
            InterviewError::FieldPath(_) => "FieldPathError".to_string(),
            InterviewError::StateDiscipline(_) => "StateDisciplineError".to_string(),
            InterviewError::ProviderUnavailable(_) => "ProviderUnavailableError".to_string(),
        }
    }
}
