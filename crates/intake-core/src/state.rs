//! Explicit interview state.
//!
//! This is the single source of truth for progress. It is mutated only by
//! the orchestrator and the review controller and is never reconstructed
//! from conversation history.

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::schema::SchemaRegistry;
use crate::turn::{Confidence, HistoryEntry, TurnSeed};

/// Machine state of an interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Asking for the field at the pointer
    Collecting,

    /// A proposed value awaits the user's accept or reject
    AwaitingConfirmation,

    /// All required fields resolved; the user is reviewing
    Review,

    /// A review edit awaits confirmation; confirm returns to `Review`
    ReviewEdit { field: String },

    /// Finalized. Terminal.
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Collecting => f.write_str("COLLECTING"),
            Phase::AwaitingConfirmation => f.write_str("AWAITING_CONFIRMATION"),
            Phase::Review => f.write_str("REVIEW"),
            Phase::ReviewEdit { field } => write!(f, "REVIEW/AWAITING_CONFIRMATION({})", field),
            Phase::Complete => f.write_str("COMPLETE"),
        }
    }
}

/// A proposed value waiting for the user's approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfirmation {
    /// Field the value is proposed for
    pub field: String,

    /// Raw value, type-checked when staged
    pub value: JsonValue,

    /// Human-readable summary shown for confirmation
    pub summary: String,

    /// Confidence reported with the value
    pub confidence: Confidence,

    /// The turn's next_question was the terminal sentinel
    pub terminal: bool,
}

/// Progress of one interview session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InterviewState {
    pub(crate) current_field_index: usize,
    pub(crate) completed: BTreeSet<String>,
    pub(crate) skipped: BTreeSet<String>,
    pub(crate) confidence: BTreeMap<String, Confidence>,
    pub(crate) pending: Option<PendingConfirmation>,
    pub(crate) review_mode: bool,
    pub(crate) strengthen_attempts: BTreeMap<String, u32>,
    pub(crate) seed: Option<TurnSeed>,
    /// Fields resolved ahead of the pointer: answers kept across a go-back
    /// and values written by review edits
    pub(crate) kept_ahead: BTreeSet<String>,
    #[serde(skip)]
    pub(crate) history: Vec<HistoryEntry>,
}

impl InterviewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the field under collection, in canonical order.
    pub fn current_field_index(&self) -> usize {
        self.current_field_index
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn skipped(&self) -> &BTreeSet<String> {
        &self.skipped
    }

    /// Confidence recorded when the field was committed.
    pub fn confidence_of(&self, field: &str) -> Option<Confidence> {
        self.confidence.get(field).copied()
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn review_mode(&self) -> bool {
        self.review_mode
    }

    /// Number of withheld low-confidence confirmations for a field.
    pub fn strengthen_attempts(&self, field: &str) -> u32 {
        self.strengthen_attempts.get(field).copied().unwrap_or(0)
    }

    /// Carry-over for the next provider call.
    pub fn seed(&self) -> Option<&TurnSeed> {
        self.seed.as_ref()
    }

    /// Display log. Never an input to any transition.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Completed or skipped.
    pub fn is_resolved(&self, field: &str) -> bool {
        self.completed.contains(field) || self.skipped.contains(field)
    }

    pub(crate) fn mark_completed(&mut self, field: &str, confidence: Confidence) {
        self.skipped.remove(field);
        self.completed.insert(field.to_string());
        self.confidence.insert(field.to_string(), confidence);
        self.strengthen_attempts.remove(field);
    }

    pub(crate) fn mark_skipped(&mut self, field: &str) {
        self.completed.remove(field);
        self.confidence.remove(field);
        self.skipped.insert(field.to_string());
    }

    pub(crate) fn reopen(&mut self, field: &str) {
        self.completed.remove(field);
        self.skipped.remove(field);
        self.confidence.remove(field);
    }

    /// Move the pointer to the next unresolved field after the current one,
    /// or past the end if none remains.
    pub(crate) fn advance(&mut self, registry: &SchemaRegistry) {
        let next = registry
            .fields()
            .iter()
            .enumerate()
            .skip(self.current_field_index + 1)
            .find(|(_, f)| !self.is_resolved(&f.id))
            .map(|(i, _)| i);
        self.current_field_index = next.unwrap_or(registry.len());
        self.prune_kept_ahead(registry);
    }

    /// Put the pointer on `index`. Resolved fields after it are kept.
    pub(crate) fn move_to(&mut self, index: usize, registry: &SchemaRegistry) {
        self.current_field_index = index;
        self.kept_ahead = registry
            .fields()
            .iter()
            .skip(index + 1)
            .filter(|f| self.is_resolved(&f.id))
            .map(|f| f.id.clone())
            .collect();
    }

    /// Record a field resolved out of order, if it lies ahead of the pointer.
    pub(crate) fn keep_if_ahead(&mut self, field: &str, registry: &SchemaRegistry) {
        if registry
            .index_of(field)
            .is_some_and(|i| i > self.current_field_index)
        {
            self.kept_ahead.insert(field.to_string());
        }
    }

    fn prune_kept_ahead(&mut self, registry: &SchemaRegistry) {
        let pointer = self.current_field_index;
        self.kept_ahead
            .retain(|id| registry.index_of(id).is_some_and(|i| i > pointer));
    }

    /// Every required field is completed or skipped.
    pub fn required_resolved(&self, registry: &SchemaRegistry) -> bool {
        registry.required_fields().all(|f| self.is_resolved(&f.id))
    }

    /// Fraction of declared fields resolved, 0.0 to 1.0.
    pub fn progress(&self, registry: &SchemaRegistry) -> f64 {
        if registry.is_empty() {
            return 0.0;
        }
        let resolved = registry
            .fields()
            .iter()
            .filter(|f| self.is_resolved(&f.id))
            .count();
        resolved as f64 / registry.len() as f64
    }

    /// Structural invariants that hold between any two operations.
    pub fn check_invariants(&self, registry: &SchemaRegistry) -> Result<(), String> {
        if let Some(both) = self.completed.intersection(&self.skipped).next() {
            return Err(format!("{} is both completed and skipped", both));
        }
        if self.current_field_index > registry.len() {
            return Err(format!(
                "pointer {} beyond {} fields",
                self.current_field_index,
                registry.len()
            ));
        }
        // Optional fields may be left behind when review ends collection early
        for field in registry.fields().iter().take(self.current_field_index) {
            if field.required && !self.is_resolved(&field.id) {
                return Err(format!("{} is behind the pointer but unresolved", field.id));
            }
        }
        for field in registry.fields().iter().skip(self.current_field_index + 1) {
            if self.is_resolved(&field.id) && !self.kept_ahead.contains(&field.id) {
                return Err(format!("{} is resolved ahead of the pointer", field.id));
            }
        }
        if let Some(current) = registry.at(self.current_field_index) {
            if self.is_resolved(&current.id) {
                return Err(format!("{} is under collection but resolved", current.id));
            }
        }
        for id in self.completed.iter().chain(self.skipped.iter()) {
            if registry.get(id).is_none() {
                return Err(format!("{} is not a declared field", id));
            }
        }
        if let Some(required) = registry
            .required_fields()
            .find(|f| self.skipped.contains(&f.id))
        {
            return Err(format!("required field {} was skipped", required.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;

    #[test]
    fn test_new_state_is_empty() {
        let state = InterviewState::new();
        assert_eq!(state.current_field_index(), 0);
        assert!(state.completed().is_empty());
        assert!(state.skipped().is_empty());
        assert!(state.pending().is_none());
        assert!(!state.review_mode());
    }

    #[test]
    fn test_history_does_not_move_state() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        state.history.push(HistoryEntry {
            field: "company.legal_name".to_string(),
            user: "My company is Test Ltd".to_string(),
            acknowledgement: "Got it".to_string(),
            summary: "Test Ltd".to_string(),
            question: "What's your CRO number?".to_string(),
            at: chrono::Utc::now(),
        });
        assert_eq!(state.current_field_index(), 0);
        assert!(state.completed().is_empty());
        assert!(state.check_invariants(&registry).is_ok());
    }

    #[test]
    fn test_advance_skips_resolved_fields() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        state.mark_completed("company.legal_name", Confidence::High);
        state.mark_completed("company.cro_number", Confidence::High);
        state.advance(&registry);
        assert_eq!(state.current_field_index(), 1);

        state.mark_skipped("company.trading_name");
        state.advance(&registry);
        assert_eq!(state.current_field_index(), 3);
        assert!(state.check_invariants(&registry).is_ok());
    }

    #[test]
    fn test_advance_past_end() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        state.current_field_index = registry.len() - 1;
        for field in registry.fields() {
            state.mark_completed(&field.id, Confidence::Medium);
        }
        state.advance(&registry);
        assert_eq!(state.current_field_index(), registry.len());
        assert!((state.progress(&registry) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invariant_catches_double_resolution() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        state.completed.insert("company.website".to_string());
        state.skipped.insert("company.website".to_string());
        assert!(state.check_invariants(&registry).is_err());
    }

    #[test]
    fn test_invariant_catches_field_resolved_ahead() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        state.mark_completed("project.title", Confidence::High);
        assert!(state.check_invariants(&registry).is_err());

        state.keep_if_ahead("project.title", &registry);
        assert!(state.check_invariants(&registry).is_ok());
    }

    #[test]
    fn test_move_to_keeps_later_answers() {
        let registry = catalog::innovation_voucher();
        let mut state = InterviewState::new();
        for field in registry.fields().iter().take(3) {
            state.mark_completed(&field.id, Confidence::High);
        }
        state.advance(&registry);
        assert_eq!(state.current_field_index(), 3);
        assert!(state.kept_ahead.is_empty());

        state.reopen("company.trading_name");
        state.move_to(1, &registry);
        assert!(state.kept_ahead.contains("company.cro_number"));
        assert!(state.check_invariants(&registry).is_ok());

        state.mark_completed("company.trading_name", Confidence::High);
        state.advance(&registry);
        assert_eq!(state.current_field_index(), 3);
        assert!(state.kept_ahead.is_empty());
    }

    #[test]
    fn test_mark_completed_clears_skip() {
        let mut state = InterviewState::new();
        state.mark_skipped("company.website");
        state.mark_completed("company.website", Confidence::High);
        assert!(state.completed().contains("company.website"));
        assert!(!state.skipped().contains("company.website"));
        assert_eq!(state.confidence_of("company.website"), Some(Confidence::High));
    }
}
