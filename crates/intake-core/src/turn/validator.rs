//! Turn contract validation.
//!
//! Provider output is untrusted text. It becomes a [`TurnResponse`] only by
//! passing four gates in order:
//! 1. Shape: exactly the five contract keys, correctly typed
//! 2. Single question: one question ending in `?`, or the sentinel
//! 3. Confirmation before data: extracted data requires a summary
//! 4. Confidence domain: `high`, `medium` or `low`
//!
//! There is no partial acceptance. A response that fails any gate yields a
//! [`ContractViolation`]; the caller decides whether a retry remains.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

use super::response::{
    Confidence, ExtractedData, NextQuestion, TurnResponse, TERMINAL_SENTINEL,
};
use super::schema::validate_turn_shape;

lazy_static! {
    /// A single Markdown code fence wrapping the whole response.
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)\A\s*```[a-zA-Z]*[ \t]*\r?\n?(.*?)\s*```\s*\z").unwrap();
}

/// The four recoverable violation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    ContractShape,
    QuestionCardinality,
    ConfirmationMissing,
    ConfidenceDomain,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::ContractShape => "ContractShapeError",
            ViolationKind::QuestionCardinality => "QuestionCardinalityError",
            ViolationKind::ConfirmationMissing => "ConfirmationMissingError",
            ViolationKind::ConfidenceDomain => "ConfidenceDomainError",
        };
        f.write_str(name)
    }
}

/// A provider response broke the turn contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("Invalid response shape: {0}")]
    Shape(String),

    #[error("Question rule violated: {0}")]
    QuestionCardinality(String),

    #[error("Cannot advance without providing summary_for_user: extracted_data is non-empty")]
    ConfirmationMissing,

    #[error("Confidence '{0}' is not one of high, medium, low")]
    ConfidenceDomain(String),
}

impl ContractViolation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            ContractViolation::Shape(_) => ViolationKind::ContractShape,
            ContractViolation::QuestionCardinality(_) => ViolationKind::QuestionCardinality,
            ContractViolation::ConfirmationMissing => ViolationKind::ConfirmationMissing,
            ContractViolation::ConfidenceDomain(_) => ViolationKind::ConfidenceDomain,
        }
    }

    /// Instruction appended verbatim to the single re-query.
    pub fn corrective_instruction(&self) -> String {
        let fix = match self {
            ContractViolation::Shape(_) => {
                "Respond with ONLY a JSON object containing exactly these keys: \
                 acknowledgement, extracted_data, summary_for_user, confidence, next_question. \
                 No other keys, no prose, no code fences."
            }
            ContractViolation::QuestionCardinality(_) => {
                "next_question must be exactly one question ending with a single '?', \
                 or the exact string COMPLETE."
            }
            ContractViolation::ConfirmationMissing => {
                "When extracted_data is non-empty, summary_for_user must restate what you \
                 understood so the user can confirm it."
            }
            ContractViolation::ConfidenceDomain(_) => {
                "confidence must be exactly one of: high, medium, low."
            }
        };
        format!(
            "Your previous response was rejected ({}: {}). {}",
            self.kind(),
            self,
            fix
        )
    }
}

/// Wire shape after the JSON Schema gate.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTurn {
    acknowledgement: String,
    extracted_data: serde_json::Map<String, JsonValue>,
    summary_for_user: String,
    confidence: String,
    next_question: String,
}

/// Validates raw provider text against the turn contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnValidator;

impl TurnValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run all four gates. The first failing gate determines the violation.
    pub fn validate(&self, raw: &str) -> Result<TurnResponse, ContractViolation> {
        let body = strip_code_fence(raw);

        let value: JsonValue = serde_json::from_str(body)
            .map_err(|e| ContractViolation::Shape(format!("Invalid JSON: {}", e)))?;

        validate_turn_shape(&value).map_err(|errors| ContractViolation::Shape(errors.join("; ")))?;

        let turn: RawTurn = serde_json::from_value(value)
            .map_err(|e| ContractViolation::Shape(e.to_string()))?;

        let next_question = check_question(&turn.next_question)?;

        let extracted_data: ExtractedData = turn.extracted_data.into_iter().collect();
        if !extracted_data.is_empty() && turn.summary_for_user.trim().is_empty() {
            return Err(ContractViolation::ConfirmationMissing);
        }

        let confidence: Confidence = turn
            .confidence
            .parse()
            .map_err(ContractViolation::ConfidenceDomain)?;

        Ok(TurnResponse::new(
            turn.acknowledgement,
            extracted_data,
            turn.summary_for_user,
            confidence,
            next_question,
        ))
    }
}

/// Apply the single-question rule to a `next_question` value.
pub fn check_question(text: &str) -> Result<NextQuestion, ContractViolation> {
    let text = text.trim();

    if text == TERMINAL_SENTINEL {
        return Ok(NextQuestion::Complete);
    }
    if text.is_empty() {
        return Err(ContractViolation::QuestionCardinality(
            "next_question is empty".to_string(),
        ));
    }

    match text.matches('?').count() {
        0 => Err(ContractViolation::QuestionCardinality(format!(
            "No question detected (missing '?'): {}",
            text
        ))),
        1 if text.ends_with('?') => Ok(NextQuestion::Ask(text.to_string())),
        1 => Err(ContractViolation::QuestionCardinality(format!(
            "Question must end with '?': {}",
            text
        ))),
        n => Err(ContractViolation::QuestionCardinality(format!(
            "Multiple questions detected ({} '?'): {}",
            n, text
        ))),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}
