//! Interview input parsing.
//!
//! Plain lines are answers. Lines starting with `:` are commands.

use serde_json::Value as JsonValue;

pub const HELP: &str = "\
Commands:
  <text>                     answer the current question
  :yes                       accept the proposed value
  :no [correction]           reject it, optionally with a correction
  :skip                      skip an optional field
  :back [field]              go back to a field (default: the previous one)
  :review                    enter review once required fields are done
  :edit <field> <json>       propose a new value during review
  :finalize                  finalize and write the snapshot
  :quit                      abandon the interview
  :help                      show this help";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Answer(String),
    Yes,
    No(Option<String>),
    Skip,
    Back(Option<String>),
    Review,
    Edit { field: String, value: JsonValue },
    Finalize,
    Quit,
    Help,
    Empty,
}

/// Parse a line. Unknown commands and malformed `:edit` are errors.
pub fn parse(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Input::Answer(line.to_string()));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "yes" | "y" => Ok(Input::Yes),
        "no" | "n" => Ok(Input::No(arg)),
        "skip" => Ok(Input::Skip),
        "back" => Ok(Input::Back(arg)),
        "review" => Ok(Input::Review),
        "finalize" => Ok(Input::Finalize),
        "quit" | "q" => Ok(Input::Quit),
        "help" | "h" => Ok(Input::Help),
        "edit" => {
            let (field, raw) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: :edit <field> <json-value>".to_string())?;
            // Bare text is taken as a string value
            let value = serde_json::from_str(raw.trim())
                .unwrap_or_else(|_| JsonValue::String(raw.trim().to_string()));
            Ok(Input::Edit {
                field: field.to_string(),
                value,
            })
        }
        other => Err(format!("unknown command ':{}' (try :help)", other)),
    }
}
