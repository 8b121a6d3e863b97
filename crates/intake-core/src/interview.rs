//! Turn orchestrator: the interview state machine.
//!
//! # States
//! `COLLECTING` → `AWAITING_CONFIRMATION` → `COLLECTING` … → `REVIEW` →
//! `COMPLETE`. `COMPLETE` is terminal and reachable only from `REVIEW`.
//!
//! # Fail-loud
//! Every operation attempted outside its legal state returns a fatal
//! [`InterviewError`]. The first fatal error halts the interview; every
//! later mutating call is refused.

use chrono::Utc;
use std::sync::Arc;

use crate::review::{ReviewController, ReviewSnapshot};
use crate::schema::{catalog, ApplicationData, FieldPathError, SchemaField, SchemaRegistry};
use crate::state::{InterviewState, PendingConfirmation, Phase};
use crate::turn::{Confidence, HistoryEntry, NextQuestion, TurnRequest, TurnResponse, TurnSeed};
use crate::InterviewError;

/// Result of applying a validated turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Data was extracted and awaits the user's accept or reject
    AwaitingConfirmation {
        field: String,
        summary: String,
        confidence: Confidence,
    },

    /// Nothing extracted; ask again
    FollowUp {
        field: String,
        acknowledgement: String,
        question: NextQuestion,
    },
}

/// Result of a confirm action.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// Value written; `next_field` is the new pointer target, if any
    Committed {
        field: String,
        next_field: Option<String>,
        review: bool,
    },

    /// Quality gate: low-confidence answer to a quality-critical field.
    /// Nothing written, pointer unchanged.
    Withheld { field: String, attempt: u32 },
}

/// One interview session: registry, collected data and explicit state.
#[derive(Debug, Clone)]
pub struct Interview {
    pub(crate) registry: Arc<SchemaRegistry>,
    pub(crate) data: ApplicationData,
    pub(crate) state: InterviewState,
    pub(crate) phase: Phase,
    pub(crate) halted: Option<String>,
    pub(crate) snapshot: Option<ReviewSnapshot>,
}

impl Interview {
    /// Start collecting at the first canonical field.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            data: ApplicationData::new(registry.clone()),
            registry,
            state: InterviewState::new(),
            phase: Phase::Collecting,
            halted: None,
            snapshot: None,
        }
    }

    /// Interview over the Innovation Voucher catalog.
    pub fn innovation_voucher() -> Self {
        Self::new(Arc::new(catalog::innovation_voucher()))
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn data(&self) -> &ApplicationData {
        &self.data
    }

    pub fn state(&self) -> &InterviewState {
        &self.state
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Reason the interview halted, if it has.
    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Field at the pointer, if collection has not run past the end.
    pub fn current_field(&self) -> Option<&SchemaField> {
        self.registry.at(self.state.current_field_index)
    }

    /// Section of the field under collection.
    pub fn current_section(&self) -> Option<&str> {
        self.current_field().map(|f| f.section.as_str())
    }

    /// Fraction of declared fields resolved.
    pub fn progress(&self) -> f64 {
        self.state.progress(&self.registry)
    }

    /// Final snapshot. Exists only in `COMPLETE`.
    pub fn snapshot(&self) -> Option<&ReviewSnapshot> {
        match self.phase {
            Phase::Complete => self.snapshot.as_ref(),
            _ => None,
        }
    }

    /// Review controller over this interview.
    pub fn review(&mut self) -> ReviewController<'_> {
        ReviewController::new(self)
    }

    /// Record a fatal error raised outside the state machine (provider
    /// failure, exhausted contract retry). The interview halts.
    pub fn halt(&mut self, error: &InterviewError) {
        if self.halted.is_none() {
            tracing::error!(error = %error, phase = %self.phase, "Interview halted");
            self.halted = Some(error.to_string());
        }
    }

    /// Build the outbound request for the field under collection.
    pub fn turn_request(&mut self, user_input: &str) -> Result<TurnRequest, InterviewError> {
        self.guarded("turn_request", |this| {
            this.expect_phase(&[Phase::Collecting], "request a turn")?;
            let field = this.require_current_field()?.clone();
            Ok(TurnRequest {
                field_id: field.id,
                prompt: field.prompt,
                required: field.required,
                user_input: user_input.to_string(),
                history: this.state.history.clone(),
                seed: this.state.seed.clone(),
                corrective_instruction: None,
            })
        })
    }

    /// Apply a validated provider turn to the field under collection.
    ///
    /// Extracted data is staged as a [`PendingConfirmation`]; nothing is
    /// written until the user confirms.
    pub fn apply_turn(
        &mut self,
        user_input: &str,
        turn: TurnResponse,
    ) -> Result<TurnOutcome, InterviewError> {
        self.guarded("apply_turn", |this| {
            this.expect_phase(&[Phase::Collecting], "apply a provider turn")?;
            let field = this.require_current_field()?.clone();

            for (path, value) in turn.extracted_data() {
                this.registry.coerce(path, value)?;
                if *path != field.id {
                    return Err(FieldPathError::NotCurrentField {
                        path: path.clone(),
                        expected: field.id.clone(),
                    }
                    .into());
                }
            }

            this.state.seed = None;
            this.state.history.push(HistoryEntry {
                field: field.id.clone(),
                user: user_input.to_string(),
                acknowledgement: turn.acknowledgement().to_string(),
                summary: turn.summary_for_user().to_string(),
                question: turn.next_question().to_string(),
                at: Utc::now(),
            });

            let Some(value) = turn.extracted_data().get(&field.id).cloned() else {
                tracing::debug!(field = %field.id, "Turn extracted nothing; follow-up");
                return Ok(TurnOutcome::FollowUp {
                    field: field.id,
                    acknowledgement: turn.acknowledgement().to_string(),
                    question: turn.next_question().clone(),
                });
            };

            this.state.pending = Some(PendingConfirmation {
                field: field.id.clone(),
                value,
                summary: turn.summary_for_user().to_string(),
                confidence: turn.confidence(),
                terminal: turn.next_question().is_terminal(),
            });
            this.set_phase(Phase::AwaitingConfirmation);
            tracing::debug!(field = %field.id, confidence = %turn.confidence(), "Value staged for confirmation");

            Ok(TurnOutcome::AwaitingConfirmation {
                field: field.id,
                summary: turn.summary_for_user().to_string(),
                confidence: turn.confidence(),
            })
        })
    }

    /// The user accepts the pending value.
    pub fn confirm(&mut self) -> Result<ConfirmOutcome, InterviewError> {
        self.guarded("confirm", |this| match this.phase.clone() {
            Phase::AwaitingConfirmation => this.confirm_collected(),
            Phase::ReviewEdit { .. } => this.confirm_review_edit(),
            other => Err(InterviewError::StateDiscipline(format!(
                "Cannot confirm in {}: no confirmation is pending",
                other
            ))),
        })
    }

    fn confirm_collected(&mut self) -> Result<ConfirmOutcome, InterviewError> {
        let pending = self.take_pending()?;
        let field = self
            .registry
            .get(&pending.field)
            .cloned()
            .ok_or_else(|| FieldPathError::UnknownPath {
                path: pending.field.clone(),
            })?;

        if field.is_quality_critical() && pending.confidence == Confidence::Low {
            let attempt = self.state.strengthen_attempts(&field.id) + 1;
            self.state
                .strengthen_attempts
                .insert(field.id.clone(), attempt);
            self.state.seed = Some(TurnSeed::Strengthen { attempt });
            self.set_phase(Phase::Collecting);
            tracing::warn!(field = %field.id, attempt, "Low-confidence answer withheld; requesting a stronger answer");
            return Ok(ConfirmOutcome::Withheld {
                field: field.id,
                attempt,
            });
        }

        self.commit(&pending)?;
        self.state.advance(&self.registry);

        let review = pending.terminal && self.state.required_resolved(&self.registry);
        self.set_phase(if review { Phase::Review } else { Phase::Collecting });

        let next_field = match self.phase {
            Phase::Review => None,
            _ => self.current_field().map(|f| f.id.clone()),
        };
        tracing::info!(field = %field.id, next = ?next_field, review, "Field confirmed");

        Ok(ConfirmOutcome::Committed {
            field: field.id,
            next_field,
            review,
        })
    }

    fn confirm_review_edit(&mut self) -> Result<ConfirmOutcome, InterviewError> {
        let pending = self.take_pending()?;
        self.commit(&pending)?;
        self.state.keep_if_ahead(&pending.field, &self.registry);
        if self
            .current_field()
            .is_some_and(|f| self.state.is_resolved(&f.id))
        {
            self.state.advance(&self.registry);
        }
        self.set_phase(Phase::Review);
        tracing::info!(field = %pending.field, "Review edit confirmed");
        Ok(ConfirmOutcome::Committed {
            field: pending.field,
            next_field: None,
            review: true,
        })
    }

    /// The user rejects the pending value, optionally with a correction.
    pub fn reject(&mut self, correction: Option<&str>) -> Result<(), InterviewError> {
        self.guarded("reject", |this| match this.phase.clone() {
            Phase::AwaitingConfirmation => {
                let pending = this.take_pending()?;
                this.state.seed = Some(TurnSeed::Rejected {
                    rejected_summary: pending.summary,
                    correction: correction
                        .map(str::trim)
                        .filter(|c| !c.is_empty())
                        .map(str::to_string),
                });
                this.set_phase(Phase::Collecting);
                tracing::info!(field = %pending.field, "Proposed value rejected");
                Ok(())
            }
            Phase::ReviewEdit { field } => {
                this.state.pending = None;
                this.set_phase(Phase::Review);
                tracing::info!(field = %field, "Review edit discarded");
                Ok(())
            }
            other => Err(InterviewError::StateDiscipline(format!(
                "Cannot reject in {}: no confirmation is pending",
                other
            ))),
        })
    }

    /// Skip the field under collection. Only optional fields can be skipped.
    pub fn skip(&mut self) -> Result<Option<String>, InterviewError> {
        self.guarded("skip", |this| {
            this.expect_phase(
                &[Phase::Collecting, Phase::AwaitingConfirmation],
                "skip a field",
            )?;
            let field = this.require_current_field()?.clone();
            if field.required {
                return Err(InterviewError::StateDiscipline(format!(
                    "Cannot skip required field {}",
                    field.id
                )));
            }

            this.state.pending = None;
            this.state.seed = None;
            this.state.strengthen_attempts.remove(&field.id);
            this.state.mark_skipped(&field.id);
            this.state.advance(&this.registry);
            this.set_phase(Phase::Collecting);
            tracing::info!(field = %field.id, "Field skipped");

            Ok(this.current_field().map(|f| f.id.clone()))
        })
    }

    /// Return to a completed or skipped field.
    ///
    /// While collecting the target must lie behind the pointer; from review
    /// any resolved field may be reopened. The target re-enters collection.
    /// Other fields keep their values.
    pub fn go_back(&mut self, target: &str) -> Result<(), InterviewError> {
        self.guarded("go_back", |this| {
            this.expect_phase(
                &[Phase::Collecting, Phase::AwaitingConfirmation, Phase::Review],
                "go back",
            )?;
            let index = this
                .registry
                .index_of(target)
                .ok_or_else(|| FieldPathError::UnknownPath {
                    path: target.to_string(),
                })?;
            if !this.state.is_resolved(target) {
                return Err(InterviewError::StateDiscipline(format!(
                    "Cannot go back to {}: not a completed or skipped field",
                    target
                )));
            }
            if this.phase != Phase::Review && index >= this.state.current_field_index {
                return Err(InterviewError::StateDiscipline(format!(
                    "Cannot go back to {}: field is not behind the pointer",
                    target
                )));
            }

            this.state.pending = None;
            this.state.seed = None;
            this.state.reopen(target);
            this.state.move_to(index, &this.registry);
            this.set_phase(Phase::Collecting);
            tracing::info!(field = %target, "Went back to field");
            Ok(())
        })
    }

    /// Go back to the nearest resolved field before the pointer.
    pub fn go_back_previous(&mut self) -> Result<String, InterviewError> {
        let pointer = self.state.current_field_index.min(self.registry.len());
        let previous = self.registry.fields()[..pointer]
            .iter()
            .rev()
            .find(|f| self.state.is_resolved(&f.id))
            .map(|f| f.id.clone());

        match previous {
            Some(target) => {
                self.go_back(&target)?;
                Ok(target)
            }
            None => self.guarded("go_back", |_| {
                Err(InterviewError::StateDiscipline(
                    "Cannot go back: no earlier field".to_string(),
                ))
            }),
        }
    }

    /// Explicitly enter review once every required field is resolved.
    pub fn enter_review(&mut self) -> Result<(), InterviewError> {
        self.guarded("enter_review", |this| {
            this.expect_phase(&[Phase::Collecting], "enter review")?;
            if !this.state.required_resolved(&this.registry) {
                return Err(InterviewError::StateDiscipline(format!(
                    "Cannot enter review mode: data collection not complete (missing {})",
                    this.missing_required().join(", ")
                )));
            }
            this.set_phase(Phase::Review);
            tracing::info!("Entered review");
            Ok(())
        })
    }

    /// Required fields neither completed nor skipped.
    pub fn missing_required(&self) -> Vec<String> {
        self.registry
            .required_fields()
            .filter(|f| !self.state.is_resolved(&f.id))
            .map(|f| f.id.clone())
            .collect()
    }

    pub(crate) fn guarded<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut Self) -> Result<T, InterviewError>,
    ) -> Result<T, InterviewError> {
        if let Some(reason) = &self.halted {
            return Err(InterviewError::StateDiscipline(format!(
                "Cannot {}: interview halted after fatal error: {}",
                operation, reason
            )));
        }

        let result = f(self);
        if let Err(e) = &result {
            self.halt(e);
        }
        debug_assert!(
            self.halted.is_some() || self.state.check_invariants(&self.registry).is_ok(),
            "state invariant broken after {}",
            operation
        );
        result
    }

    pub(crate) fn expect_phase(&self, allowed: &[Phase], action: &str) -> Result<(), InterviewError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(InterviewError::StateDiscipline(format!(
                "Cannot {} in {}",
                action, self.phase
            )))
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.state.review_mode = matches!(phase, Phase::Review | Phase::ReviewEdit { .. });
        self.phase = phase;
    }

    fn require_current_field(&self) -> Result<&SchemaField, InterviewError> {
        self.current_field().ok_or_else(|| {
            InterviewError::StateDiscipline("No field left to collect".to_string())
        })
    }

    fn take_pending(&mut self) -> Result<PendingConfirmation, InterviewError> {
        self.state.pending.take().ok_or_else(|| {
            InterviewError::StateDiscipline("No pending confirmation".to_string())
        })
    }

    /// Write a confirmed value through the registry and mark it completed.
    fn commit(&mut self, pending: &PendingConfirmation) -> Result<(), InterviewError> {
        if !self.data.write(&pending.field, &pending.value) {
            let error = self
                .registry
                .coerce(&pending.field, &pending.value)
                .err()
                .unwrap_or_else(|| FieldPathError::UnknownPath {
                    path: pending.field.clone(),
                });
            return Err(error.into());
        }
        self.state.mark_completed(&pending.field, pending.confidence);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::FieldValue;
    use crate::turn::TurnValidator;
    use serde_json::json;

    pub(crate) fn turn(extracted: serde_json::Value, confidence: &str, next: &str) -> TurnResponse {
        let summary = if extracted.as_object().map_or(true, |o| o.is_empty()) {
            String::new()
        } else {
            format!("You said {}", extracted)
        };
        let raw = json!({
            "acknowledgement": "Thanks",
            "extracted_data": extracted,
            "summary_for_user": summary,
            "confidence": confidence,
            "next_question": next,
        });
        TurnValidator::new().validate(&raw.to_string()).unwrap()
    }

    pub(crate) fn sample_value(field: &SchemaField) -> serde_json::Value {
        match &field.field_type {
            crate::schema::FieldType::Number => json!(3),
            crate::schema::FieldType::TextList => json!(["a report"]),
            crate::schema::FieldType::Boolean => json!(true),
            crate::schema::FieldType::Enum { options } => json!(options[0]),
            crate::schema::FieldType::Text => json!("value"),
        }
    }

    /// Answer and confirm the current field with a well-typed value.
    pub(crate) fn fill(interview: &mut Interview) {
        let value = sample_value(interview.current_field().unwrap());
        answer(interview, value, "high");
    }

    pub(crate) fn answer(interview: &mut Interview, value: serde_json::Value, confidence: &str) {
        let field = interview.current_field().unwrap().id.clone();
        interview
            .apply_turn("answer", turn(json!({ field: value }), confidence, "What's next?"))
            .unwrap();
        interview.confirm().unwrap();
    }

    #[test]
    fn test_initial_state() {
        let interview = Interview::innovation_voucher();
        assert_eq!(interview.phase(), &Phase::Collecting);
        assert_eq!(interview.current_field().unwrap().id, "company.legal_name");
        assert!(interview.data().is_empty());
    }

    #[test]
    fn test_turn_with_data_awaits_confirmation_without_writing() {
        let mut interview = Interview::innovation_voucher();
        let outcome = interview
            .apply_turn(
                "We're Acme",
                turn(json!({"company.legal_name": "Acme Ltd"}), "high", "What's your CRO number?"),
            )
            .unwrap();

        assert!(matches!(outcome, TurnOutcome::AwaitingConfirmation { .. }));
        assert_eq!(interview.phase(), &Phase::AwaitingConfirmation);
        assert!(interview.data().get("company.legal_name").is_none());
        assert_eq!(interview.state().pending().unwrap().field, "company.legal_name");
    }

    #[test]
    fn test_confirm_commits_and_advances() {
        let mut interview = Interview::innovation_voucher();
        interview
            .apply_turn(
                "We're Acme",
                turn(json!({"company.legal_name": "Acme Ltd"}), "high", "What's your CRO number?"),
            )
            .unwrap();
        let outcome = interview.confirm().unwrap();

        assert_eq!(
            outcome,
            ConfirmOutcome::Committed {
                field: "company.legal_name".to_string(),
                next_field: Some("company.trading_name".to_string()),
                review: false,
            }
        );
        assert_eq!(
            interview.data().get("company.legal_name"),
            Some(&FieldValue::Text("Acme Ltd".to_string()))
        );
        assert!(interview.state().completed().contains("company.legal_name"));
        assert_eq!(
            interview.state().confidence_of("company.legal_name"),
            Some(Confidence::High)
        );
        assert!(interview.state().pending().is_none());
        assert_eq!(interview.state().current_field_index(), 1);
    }

    #[test]
    fn test_follow_up_keeps_collecting() {
        let mut interview = Interview::innovation_voucher();
        let outcome = interview
            .apply_turn("hmm", turn(json!({}), "medium", "Could you give me the registered name?"))
            .unwrap();
        assert!(matches!(outcome, TurnOutcome::FollowUp { .. }));
        assert_eq!(interview.phase(), &Phase::Collecting);
        assert_eq!(interview.state().history().len(), 1);
    }

    #[test]
    fn test_reject_seeds_next_request() {
        let mut interview = Interview::innovation_voucher();
        interview
            .apply_turn(
                "Acme",
                turn(json!({"company.legal_name": "Acme"}), "medium", "What's your CRO number?"),
            )
            .unwrap();
        interview.reject(Some("It's Acme Holdings Ltd")).unwrap();

        assert_eq!(interview.phase(), &Phase::Collecting);
        assert_eq!(interview.state().current_field_index(), 0);
        assert!(interview.data().is_empty());

        let request = interview.turn_request("Acme Holdings Ltd").unwrap();
        assert_eq!(
            request.seed,
            Some(TurnSeed::Rejected {
                rejected_summary: "You said {\"company.legal_name\":\"Acme\"}".to_string(),
                correction: Some("It's Acme Holdings Ltd".to_string()),
            })
        );
    }

    #[test]
    fn test_quality_gate_withholds_low_confidence() {
        let mut interview = Interview::innovation_voucher();
        let challenge = interview.registry().index_of("project.challenge").unwrap();
        while interview.state().current_field_index() < challenge {
            fill(&mut interview);
        }
        assert_eq!(interview.current_field().unwrap().id, "project.challenge");

        interview
            .apply_turn(
                "we're too slow",
                turn(json!({"project.challenge": "we're too slow"}), "low", "What else?"),
            )
            .unwrap();
        let outcome = interview.confirm().unwrap();

        assert_eq!(
            outcome,
            ConfirmOutcome::Withheld {
                field: "project.challenge".to_string(),
                attempt: 1,
            }
        );
        assert!(!interview.state().completed().contains("project.challenge"));
        assert!(interview.data().get("project.challenge").is_none());
        assert_eq!(interview.state().current_field_index(), challenge);
        assert_eq!(interview.phase(), &Phase::Collecting);
        assert_eq!(
            interview.state().seed(),
            Some(&TurnSeed::Strengthen { attempt: 1 })
        );

        // A stronger answer goes through
        answer(&mut interview, json!("Manual QA takes 3 days per batch"), "medium");
        assert!(interview.state().completed().contains("project.challenge"));
        assert_eq!(interview.state().strengthen_attempts("project.challenge"), 0);
    }

    #[test]
    fn test_low_confidence_simple_field_advances() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "low");
        assert!(interview.state().completed().contains("company.legal_name"));
        assert_eq!(
            interview.state().confidence_of("company.legal_name"),
            Some(Confidence::Low)
        );
    }

    #[test]
    fn test_skip_optional_field() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "high");
        let next = interview.skip().unwrap();
        assert_eq!(next.as_deref(), Some("company.cro_number"));
        assert!(interview.state().skipped().contains("company.trading_name"));
    }

    #[test]
    fn test_skip_required_field_is_fatal() {
        let mut interview = Interview::innovation_voucher();
        let err = interview.skip().unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
        assert!(interview.is_halted());
    }

    #[test]
    fn test_skip_clears_pending() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "high");
        interview
            .apply_turn(
                "same",
                turn(json!({"company.trading_name": "Acme"}), "high", "What's your CRO number?"),
            )
            .unwrap();
        interview.skip().unwrap();
        assert!(interview.state().pending().is_none());
        assert_eq!(interview.phase(), &Phase::Collecting);
    }

    #[test]
    fn test_go_back_reopens_field() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "high");
        interview.skip().unwrap();
        answer(&mut interview, json!("123456"), "high");

        interview.go_back("company.legal_name").unwrap();
        assert_eq!(interview.state().current_field_index(), 0);
        assert!(!interview.state().completed().contains("company.legal_name"));
        assert!(interview.state().completed().contains("company.cro_number"));

        // Re-confirming jumps over fields resolved on the first pass
        answer(&mut interview, json!("Acme Holdings Ltd"), "high");
        assert_eq!(
            interview.current_field().unwrap().id,
            "company.incorporation_date"
        );
        assert!(interview.state().check_invariants(interview.registry()).is_ok());
    }

    #[test]
    fn test_go_back_previous_reopens_skipped() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "high");
        interview.skip().unwrap();
        let target = interview.go_back_previous().unwrap();
        assert_eq!(target, "company.trading_name");
        assert!(!interview.state().skipped().contains("company.trading_name"));
    }

    #[test]
    fn test_go_back_to_unvisited_field_is_fatal() {
        let mut interview = Interview::innovation_voucher();
        let err = interview.go_back("project.title").unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
    }

    #[test]
    fn test_go_back_unknown_field_is_field_path_error() {
        let mut interview = Interview::innovation_voucher();
        let err = interview.go_back("company.invented").unwrap_err();
        assert!(matches!(err, InterviewError::FieldPath(_)));
    }

    #[test]
    fn test_new_turn_while_awaiting_confirmation_is_fatal() {
        let mut interview = Interview::innovation_voucher();
        interview
            .apply_turn(
                "Acme",
                turn(json!({"company.legal_name": "Acme"}), "high", "What's your CRO number?"),
            )
            .unwrap();
        let err = interview
            .apply_turn("again", turn(json!({}), "high", "What's next?"))
            .unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
    }

    #[test]
    fn test_confirm_without_pending_is_fatal() {
        let mut interview = Interview::innovation_voucher();
        let err = interview.confirm().unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
    }

    #[test]
    fn test_data_for_other_field_is_field_path_error() {
        let mut interview = Interview::innovation_voucher();
        let err = interview
            .apply_turn(
                "Acme, CRO 123",
                turn(
                    json!({"company.legal_name": "Acme", "company.cro_number": "123"}),
                    "high",
                    "What's next?",
                ),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::FieldPath(FieldPathError::NotCurrentField { .. })
        ));
        assert!(interview.state().pending().is_none());
    }

    #[test]
    fn test_mistyped_value_is_field_path_error() {
        let mut interview = Interview::innovation_voucher();
        let err = interview
            .apply_turn(
                "Acme",
                turn(json!({"company.legal_name": 42}), "high", "What's next?"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::FieldPath(FieldPathError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_halted_interview_refuses_everything() {
        let mut interview = Interview::innovation_voucher();
        interview.confirm().unwrap_err();
        let err = interview.turn_request("Acme").unwrap_err();
        match err {
            InterviewError::StateDiscipline(msg) => assert!(msg.contains("halted")),
            other => panic!("Expected StateDiscipline, got {other:?}"),
        }
    }

    #[test]
    fn test_enter_review_requires_required_fields() {
        let mut interview = Interview::innovation_voucher();
        let err = interview.enter_review().unwrap_err();
        match err {
            InterviewError::StateDiscipline(msg) => {
                assert!(msg.contains("Cannot enter review mode"))
            }
            other => panic!("Expected StateDiscipline, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_sentinel_enters_review_when_required_resolved() {
        let mut interview = Interview::innovation_voucher();
        let last = interview.registry().len() - 1;
        while interview.state().current_field_index() < last {
            fill(&mut interview);
        }
        assert_eq!(interview.phase(), &Phase::Collecting);

        interview
            .apply_turn(
                "six months",
                turn(json!({"project.timeline": "6 months"}), "high", "COMPLETE"),
            )
            .unwrap();
        let outcome = interview.confirm().unwrap();
        assert_eq!(
            outcome,
            ConfirmOutcome::Committed {
                field: "project.timeline".to_string(),
                next_field: None,
                review: true,
            }
        );
        assert_eq!(interview.phase(), &Phase::Review);
        assert!(interview.state().review_mode());
    }

    #[test]
    fn test_sentinel_with_missing_required_stays_collecting() {
        let mut interview = Interview::innovation_voucher();
        interview
            .apply_turn(
                "Acme",
                turn(json!({"company.legal_name": "Acme"}), "high", "COMPLETE"),
            )
            .unwrap();
        interview.confirm().unwrap();
        assert_eq!(interview.phase(), &Phase::Collecting);
    }

    /// Fill up to `project.skills_required` and end collection there with
    /// the sentinel, leaving the later optional fields unanswered.
    fn review_after_early_sentinel() -> Interview {
        let mut interview = Interview::innovation_voucher();
        let skills = interview.registry().index_of("project.skills_required").unwrap();
        while interview.state().current_field_index() < skills {
            fill(&mut interview);
        }
        interview
            .apply_turn(
                "python and ML",
                turn(json!({"project.skills_required": "Machine learning"}), "high", "COMPLETE"),
            )
            .unwrap();
        interview.confirm().unwrap();
        assert_eq!(interview.phase(), &Phase::Review);
        interview
    }

    #[test]
    fn test_go_back_from_review_to_field_ahead_of_pointer() {
        let mut interview = review_after_early_sentinel();
        let pointer = interview.state().current_field_index();
        let impact = interview.registry().index_of("project.commercial_impact").unwrap();
        assert!(impact > pointer);

        interview
            .review()
            .edit("project.commercial_impact", json!("Exports up 20%"))
            .unwrap();
        interview.confirm().unwrap();
        assert!(interview.state().check_invariants(interview.registry()).is_ok());

        interview.go_back("project.commercial_impact").unwrap();
        assert!(!interview.is_halted());
        assert_eq!(interview.phase(), &Phase::Collecting);
        assert_eq!(interview.current_field().unwrap().id, "project.commercial_impact");
        assert!(interview.state().check_invariants(interview.registry()).is_ok());

        answer(&mut interview, json!("Exports up 25% within two years"), "high");
        assert_eq!(
            interview.data().get("project.commercial_impact"),
            Some(&FieldValue::Text("Exports up 25% within two years".to_string()))
        );
        assert!(interview.state().check_invariants(interview.registry()).is_ok());
    }

    #[test]
    fn test_go_back_ahead_of_pointer_while_collecting_is_fatal() {
        let mut interview = Interview::innovation_voucher();
        answer(&mut interview, json!("Acme Ltd"), "high");
        interview.skip().unwrap();
        answer(&mut interview, json!("123456"), "high");
        interview.go_back("company.legal_name").unwrap();

        let err = interview.go_back("company.cro_number").unwrap_err();
        assert!(matches!(err, InterviewError::StateDiscipline(_)));
    }

    #[test]
    fn test_turn_request_carries_field_prompt() {
        let mut interview = Interview::innovation_voucher();
        let request = interview.turn_request("Acme Ltd").unwrap();
        assert_eq!(request.field_id, "company.legal_name");
        assert_eq!(request.prompt, "What's your company's legal name?");
        assert!(request.required);
        assert!(request.corrective_instruction.is_none());
    }
}
