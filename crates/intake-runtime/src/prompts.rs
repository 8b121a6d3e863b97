//! Prompt construction for interview turns.
//!
//! Every call sends the same system prompt followed by one user message
//! carrying the structured turn context as JSON. On the single retry the
//! corrective instruction is appended to that message verbatim.

use serde::Serialize;

use intake_core::{TurnRequest, TurnSeed};

use crate::providers::ChatMessage;

/// Number of most recent display exchanges sent as context.
pub const HISTORY_WINDOW: usize = 6;

/// System prompt for the interviewer.
pub const SYSTEM_PROMPT: &str = r#"
You are an expert grant consultant conducting a structured but conversational application interview.

## Goals
1. Collect the value for the ONE field named in current_field
2. Ask one question at a time
3. Translate informal answers into clear, formal grant language
4. Never expose field identifiers or internal structure to the user
5. Restate what you understood so the user can confirm it
6. If the answer is unclear, ask a follow-up instead of guessing

## Rules
- Be concise and professional
- Do not invent facts
- extracted_data may only contain current_field, and only when the user actually answered it
- If the user rambles, summarise and confirm
- If you are unsure of the answer's quality, report confidence "low"

## Response Format
Respond with ONLY a JSON object with exactly these keys:
- acknowledgement: brief acknowledgement of the user's input
- extracted_data: object mapping current_field to its value, or {} if nothing was extracted
- summary_for_user: what you understood, in grant language (required whenever extracted_data is non-empty)
- confidence: "high" | "medium" | "low"
- next_question: exactly one question ending in "?", or "COMPLETE" if nothing more is needed

No markdown, no code fences, no text outside the JSON object.
"#;

#[derive(Debug, Serialize)]
struct TurnContext<'a> {
    current_field: &'a str,
    field_question: &'a str,
    is_required: bool,
    user_input: &'a str,
    recent_exchanges: Vec<Exchange<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    carry_over: Option<String>,
    instruction: &'static str,
}

#[derive(Debug, Serialize)]
struct Exchange<'a> {
    field: &'a str,
    user: &'a str,
    understood: &'a str,
    asked: &'a str,
}

/// Text describing a rejection or strengthen carry-over.
pub fn seed_text(seed: &TurnSeed) -> String {
    match seed {
        TurnSeed::Rejected {
            rejected_summary,
            correction: Some(correction),
        } => format!(
            "The user rejected your previous understanding (\"{}\") and corrected it: \"{}\". \
             Use the correction.",
            rejected_summary, correction
        ),
        TurnSeed::Rejected {
            rejected_summary,
            correction: None,
        } => format!(
            "The user rejected your previous understanding (\"{}\"). Ask again for this field.",
            rejected_summary
        ),
        TurnSeed::Strengthen { attempt } => format!(
            "The previous answer for this field was too weak to accept (attempt {}). \
             Help the user give a more specific, concrete answer.",
            attempt
        ),
    }
}

/// Build the messages for one provider call.
pub fn build_messages(request: &TurnRequest) -> Vec<ChatMessage> {
    let skip = request.history.len().saturating_sub(HISTORY_WINDOW);
    let context = TurnContext {
        current_field: &request.field_id,
        field_question: &request.prompt,
        is_required: request.required,
        user_input: &request.user_input,
        recent_exchanges: request.history[skip..]
            .iter()
            .map(|entry| Exchange {
                field: &entry.field,
                user: &entry.user,
                understood: &entry.summary,
                asked: &entry.question,
            })
            .collect(),
        carry_over: request.seed.as_ref().map(seed_text),
        instruction: "Extract the value for current_field from user_input and decide the next question",
    };

    // Serializing borrowed strings and bools cannot fail
    let mut user = serde_json::to_string_pretty(&context).unwrap_or_default();
    if let Some(correction) = &request.corrective_instruction {
        user.push_str("\n\n");
        user.push_str(correction);
    }

    vec![ChatMessage::system(SYSTEM_PROMPT.trim()), ChatMessage::user(user)]
}
