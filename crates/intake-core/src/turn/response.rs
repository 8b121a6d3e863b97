//! Validated turn output.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Reserved `next_question` value: no further question for this field.
pub const TERMINAL_SENTINEL: &str = "COMPLETE";

/// Provider-reported confidence in the extracted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = String;

    /// Exact match only; "High" or " high" are outside the domain.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Confidence::Low),
            "medium" => Ok(Confidence::Medium),
            "high" => Ok(Confidence::High),
            other => Err(other.to_string()),
        }
    }
}

/// Either one well-formed question or the terminal sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NextQuestion {
    Ask(String),
    Complete,
}

impl NextQuestion {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NextQuestion::Complete)
    }

    /// The question text, if this is not the sentinel.
    pub fn question(&self) -> Option<&str> {
        match self {
            NextQuestion::Ask(q) => Some(q),
            NextQuestion::Complete => None,
        }
    }
}

impl fmt::Display for NextQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextQuestion::Ask(q) => f.write_str(q),
            NextQuestion::Complete => f.write_str(TERMINAL_SENTINEL),
        }
    }
}

/// Extracted-data fragment: field identifier to raw value.
pub type ExtractedData = BTreeMap<String, JsonValue>;

/// The validated output of one provider exchange.
///
/// Only [`TurnValidator`](super::TurnValidator) can construct one, so every
/// `TurnResponse` in the program has passed all four contract gates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    acknowledgement: String,
    extracted_data: ExtractedData,
    summary_for_user: String,
    confidence: Confidence,
    next_question: NextQuestion,
}

impl TurnResponse {
    pub(crate) fn new(
        acknowledgement: String,
        extracted_data: ExtractedData,
        summary_for_user: String,
        confidence: Confidence,
        next_question: NextQuestion,
    ) -> Self {
        Self {
            acknowledgement,
            extracted_data,
            summary_for_user,
            confidence,
            next_question,
        }
    }

    pub fn acknowledgement(&self) -> &str {
        &self.acknowledgement
    }

    pub fn extracted_data(&self) -> &ExtractedData {
        &self.extracted_data
    }

    pub fn summary_for_user(&self) -> &str {
        &self.summary_for_user
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn next_question(&self) -> &NextQuestion {
        &self.next_question
    }

    pub fn has_data(&self) -> bool {
        !self.extracted_data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_domain_is_exact() {
        assert_eq!("high".parse::<Confidence>(), Ok(Confidence::High));
        assert_eq!("low".parse::<Confidence>(), Ok(Confidence::Low));
        assert!("High".parse::<Confidence>().is_err());
        assert!("certain".parse::<Confidence>().is_err());
    }

    #[test]
    fn test_next_question_display() {
        assert_eq!(NextQuestion::Complete.to_string(), "COMPLETE");
        let q = NextQuestion::Ask("What's the Eircode?".to_string());
        assert_eq!(q.question(), Some("What's the Eircode?"));
        assert!(!q.is_terminal());
    }
}
