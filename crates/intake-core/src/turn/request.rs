//! Outbound turn request and the display-only history log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Carry-over instruction for the next provider call on the same field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnSeed {
    /// The user rejected the proposed value
    Rejected {
        rejected_summary: String,
        correction: Option<String>,
    },

    /// A low-confidence answer to a quality-critical field was withheld
    Strengthen { attempt: u32 },
}

/// One exchange, kept for display only.
///
/// Nothing in the state machine reads history back; progress lives in
/// [`InterviewState`](crate::InterviewState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub field: String,
    pub user: String,
    pub acknowledgement: String,
    pub summary: String,
    pub question: String,
    pub at: DateTime<Utc>,
}

/// Everything the provider needs for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnRequest {
    /// Field under collection
    pub field_id: String,

    /// Question template for the field
    pub prompt: String,

    /// Whether the user may skip the field
    pub required: bool,

    /// The user's answer for this turn
    pub user_input: String,

    /// Display history accumulated so far
    pub history: Vec<HistoryEntry>,

    /// Rejection or strengthen carry-over, if any
    pub seed: Option<TurnSeed>,

    /// Set only on the single retry, appended verbatim
    pub corrective_instruction: Option<String>,
}

impl TurnRequest {
    /// Copy of this request carrying a corrective instruction.
    pub fn with_correction(&self, instruction: impl Into<String>) -> Self {
        Self {
            corrective_instruction: Some(instruction.into()),
            ..self.clone()
        }
    }
}
