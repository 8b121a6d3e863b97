//! Review and finalization.
//!
//! Review renders every declared field in canonical order, lets the user
//! edit any field (each edit goes through its own confirmation) and
//! freezes the data into a [`ReviewSnapshot`] on finalize.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::interview::Interview;
use crate::schema::{catalog, FieldPathError, FieldValue};
use crate::state::{PendingConfirmation, Phase};
use crate::turn::Confidence;
use crate::InterviewError;

/// One rendered field.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewEntry {
    pub field: String,
    pub label: String,
    pub section: String,
    pub required: bool,
    pub value: Option<FieldValue>,
    pub confidence: Option<Confidence>,
    pub skipped: bool,
}

impl ReviewEntry {
    /// Value for display: the value, "Skipped" or "Not provided".
    pub fn display_value(&self) -> String {
        match (&self.value, self.skipped) {
            (Some(value), _) => value.display(),
            (None, true) => "Skipped".to_string(),
            (None, false) => "Not provided".to_string(),
        }
    }
}

/// Entries of one section, in canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSection {
    pub section: String,
    pub title: String,
    pub entries: Vec<ReviewEntry>,
}

/// Frozen, ordered copy of the collected data.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    entries: Vec<ReviewEntry>,
    finalized_at: DateTime<Utc>,
}

impl ReviewSnapshot {
    pub fn entries(&self) -> &[ReviewEntry] {
        &self.entries
    }

    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }

    /// Value for a field, if provided.
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|e| e.field == field)
            .and_then(|e| e.value.as_ref())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

struct OrderedFields<'a>(&'a [ReviewEntry]);

#[derive(Serialize)]
struct SnapshotValue<'a> {
    value: Option<&'a FieldValue>,
    confidence: Option<Confidence>,
    skipped: bool,
}

impl Serialize for OrderedFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(
                &entry.field,
                &SnapshotValue {
                    value: entry.value.as_ref(),
                    confidence: entry.confidence,
                    skipped: entry.skipped,
                },
            )?;
        }
        map.end()
    }
}

impl Serialize for ReviewSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ReviewSnapshot", 2)?;
        state.serialize_field("finalized_at", &self.finalized_at)?;
        state.serialize_field("fields", &OrderedFields(&self.entries))?;
        state.end()
    }
}

/// Review operations over an interview.
pub struct ReviewController<'a> {
    interview: &'a mut Interview,
}

impl<'a> ReviewController<'a> {
    pub(crate) fn new(interview: &'a mut Interview) -> Self {
        Self { interview }
    }

    /// Every declared field in canonical order.
    pub fn enumerate_sections(&self) -> Vec<ReviewEntry> {
        entries(self.interview)
    }

    /// Entries grouped by section, sections in first-appearance order.
    pub fn sections(&self) -> Vec<ReviewSection> {
        let mut sections: Vec<ReviewSection> = Vec::new();
        for entry in entries(self.interview) {
            match sections.last_mut() {
                Some(section) if section.section == entry.section => section.entries.push(entry),
                _ => sections.push(ReviewSection {
                    title: catalog::section_title(&entry.section).to_string(),
                    section: entry.section.clone(),
                    entries: vec![entry],
                }),
            }
        }
        sections
    }

    /// Propose a new value for any declared field.
    ///
    /// The value is staged, not written; confirm or reject it through the
    /// interview.
    pub fn edit(&mut self, field: &str, value: JsonValue) -> Result<PendingConfirmation, InterviewError> {
        self.interview.guarded("edit", |this| {
            this.expect_phase(&[Phase::Review], "edit a field")?;
            let typed = this.registry.coerce(field, &value)?;
            let label = this
                .registry
                .get(field)
                .map(|f| f.label.clone())
                .ok_or_else(|| FieldPathError::UnknownPath {
                    path: field.to_string(),
                })?;

            let pending = PendingConfirmation {
                field: field.to_string(),
                value,
                summary: format!("{}: {}", label, typed.display()),
                confidence: Confidence::High,
                terminal: false,
            };
            this.state.pending = Some(pending.clone());
            this.set_phase(Phase::ReviewEdit {
                field: field.to_string(),
            });
            tracing::debug!(field = %field, "Review edit staged");
            Ok(pending)
        })
    }

    /// Freeze the data. Legal only in `REVIEW`; the interview becomes
    /// `COMPLETE`.
    pub fn finalize(&mut self) -> Result<ReviewSnapshot, InterviewError> {
        self.interview.guarded("finalize", |this| {
            if this.phase == Phase::Complete {
                return Err(InterviewError::StateDiscipline(
                    "Cannot finalize: already finalized".to_string(),
                ));
            }
            this.expect_phase(&[Phase::Review], "finalize")?;
            let missing = this.missing_required();
            if !missing.is_empty() {
                return Err(InterviewError::StateDiscipline(format!(
                    "Cannot finalize: required fields missing ({})",
                    missing.join(", ")
                )));
            }

            let snapshot = ReviewSnapshot {
                entries: entries(this),
                finalized_at: Utc::now(),
            };
            this.snapshot = Some(snapshot.clone());
            this.set_phase(Phase::Complete);
            tracing::info!(fields = this.data.len(), "Interview finalized");
            Ok(snapshot)
        })
    }
}

fn entries(interview: &Interview) -> Vec<ReviewEntry> {
    let state = interview.state();
    interview
        .registry()
        .fields()
        .iter()
        .map(|field| ReviewEntry {
            field: field.id.clone(),
            label: field.label.clone(),
            section: field.section.clone(),
            required: field.required,
            value: interview.data().get(&field.id).cloned(),
            confidence: state.confidence_of(&field.id),
            skipped: state.skipped().contains(&field.id),
        })
        .collect()
}
