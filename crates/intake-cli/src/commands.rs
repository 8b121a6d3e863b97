//! Subcommand implementations.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use intake_core::schema::catalog;
use intake_core::{
    ConfirmOutcome, Interview, InterviewError, NextQuestion, Phase, ReviewSection, TurnOutcome,
    TurnValidator,
};
use intake_runtime::{InterviewSession, ProviderRegistry, RuntimeConfig};

use crate::repl::{self, Input, HELP};

/// `intake fields`
pub fn fields(json: bool) -> Result<()> {
    let registry = catalog::innovation_voucher();

    if json {
        println!("{}", serde_json::to_string_pretty(registry.fields())?);
        return Ok(());
    }

    let mut section = "";
    for field in registry.fields() {
        if field.section != section {
            section = field.section.as_str();
            println!("\n{}", catalog::section_title(section));
        }
        println!(
            "  {:<38} {:<10} {:<8} {}",
            field.id,
            field.field_type.name(),
            if field.required { "required" } else { "" },
            if field.is_quality_critical() { "critical" } else { "" },
        );
    }
    Ok(())
}

/// `intake check`
pub fn check(path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match TurnValidator::new().validate(&raw) {
        Ok(turn) => {
            println!("OK");
            println!("{}", serde_json::to_string_pretty(&turn)?);
            Ok(())
        }
        Err(violation) => bail!("{}: {}", violation.kind(), violation),
    }
}

/// `intake interview`
pub async fn interview(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let config = RuntimeConfig::from_yaml_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    let mut session = InterviewSession::from_config(
        &config,
        &ProviderRegistry::with_defaults(),
        Arc::new(catalog::innovation_voucher()),
    )?;

    println!("Type :help for commands.\n");
    print_current_question(session.interview());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match repl::parse(&line) {
            Ok(input) => input,
            Err(msg) => {
                println!("{}", msg);
                continue;
            }
        };

        if let Some(hint) = refuse(session.interview(), &input) {
            println!("{}", hint);
            continue;
        }

        match step(&mut session, input, output).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done) => break,
            Err(e) => {
                let usage = session.usage();
                tracing::info!(calls = usage.llm_calls, retries = usage.retries, "Session usage");
                let halted = e.downcast_ref::<InterviewError>().map(InterviewError::kind_name);
                return match halted {
                    Some(kind) => Err(e.context(format!("Interview halted ({})", kind))),
                    None => Err(e),
                };
            }
        }
    }

    let usage = session.usage();
    tracing::info!(
        calls = usage.llm_calls,
        retries = usage.retries,
        tokens = usage.total_tokens(),
        cost = usage.estimated_cost,
        "Session usage"
    );
    Ok(())
}

enum Flow {
    Continue,
    Done,
}

/// Refuse input that cannot be legal right now, before it reaches the
/// interview and halts it.
fn refuse(interview: &Interview, input: &Input) -> Option<&'static str> {
    let phase = interview.phase();
    let pending = matches!(phase, Phase::AwaitingConfirmation | Phase::ReviewEdit { .. });
    let pointer = interview
        .state()
        .current_field_index()
        .min(interview.registry().len());
    match input {
        Input::Answer(_) if pending => Some("Please confirm with :yes or reject with :no first."),
        Input::Answer(_) if *phase != Phase::Collecting || interview.current_field().is_none() => {
            Some("No question is open. Use :review, :back or :finalize.")
        }
        Input::Yes | Input::No(_) if !pending => Some("Nothing to confirm."),
        Input::Skip
            if !matches!(phase, Phase::Collecting | Phase::AwaitingConfirmation)
                || interview.current_field().is_none() =>
        {
            Some("There is no open question to skip.")
        }
        Input::Skip if interview.current_field().is_some_and(|f| f.required) => {
            Some("This field is required and cannot be skipped.")
        }
        Input::Edit { .. } if *phase != Phase::Review => Some("Edits are only possible in review."),
        Input::Edit { field, value } if interview.registry().coerce(field, value).is_err() => {
            Some("That value does not fit the field. See `intake fields` for types.")
        }
        Input::Finalize if *phase != Phase::Review => Some("Enter review with :review first."),
        Input::Review | Input::Back(_) if pending => {
            Some("Please confirm with :yes or reject with :no first.")
        }
        Input::Back(Some(target)) if !can_go_back(interview, target) => {
            Some("You can only go back to a field you have already answered or skipped.")
        }
        Input::Back(None)
            if !interview.registry().fields()[..pointer]
                .iter()
                .any(|f| interview.state().is_resolved(&f.id)) =>
        {
            Some("There is no earlier field to go back to.")
        }
        Input::Review if !interview.missing_required().is_empty() => {
            Some("Some required fields are still missing.")
        }
        _ => None,
    }
}

fn can_go_back(interview: &Interview, target: &str) -> bool {
    let in_review = *interview.phase() == Phase::Review;
    interview
        .registry()
        .index_of(target)
        .is_some_and(|i| in_review || i < interview.state().current_field_index())
        && interview.state().is_resolved(target)
}

async fn step(
    session: &mut InterviewSession,
    input: Input,
    output: Option<&Path>,
) -> Result<Flow> {
    match input {
        Input::Empty => {}
        Input::Help => println!("{}", HELP),
        Input::Quit => return Ok(Flow::Done),
        Input::Answer(text) => match session.answer(&text).await? {
            TurnOutcome::AwaitingConfirmation {
                summary,
                confidence,
                ..
            } => {
                println!("{} (confidence: {})", summary, confidence);
                println!("Is that right? (:yes / :no [correction])");
            }
            TurnOutcome::FollowUp {
                acknowledgement,
                question,
                ..
            } => {
                println!("{}", acknowledgement);
                match question {
                    NextQuestion::Ask(q) => println!("{}", q),
                    NextQuestion::Complete => print_current_question(session.interview()),
                }
            }
        },
        Input::Yes => match session.confirm()? {
            ConfirmOutcome::Committed { review: true, .. } => {
                print_review(&session.review().sections());
            }
            ConfirmOutcome::Committed { .. } => print_current_question(session.interview()),
            ConfirmOutcome::Withheld { attempt, .. } => {
                println!("That answer needs more detail before I can record it (attempt {}).", attempt);
                print_current_question(session.interview());
            }
        },
        Input::No(correction) => {
            session.reject(correction.as_deref())?;
            if *session.interview().phase() == Phase::Review {
                print_review(&session.review().sections());
            } else {
                print_current_question(session.interview());
            }
        }
        Input::Skip => {
            session.skip()?;
            print_current_question(session.interview());
        }
        Input::Back(target) => {
            match target {
                Some(target) => session.go_back(&target)?,
                None => {
                    session.go_back_previous()?;
                }
            }
            print_current_question(session.interview());
        }
        Input::Review => {
            if *session.interview().phase() != Phase::Review {
                session.enter_review()?;
            }
            print_review(&session.review().sections());
        }
        Input::Edit { field, value } => {
            let pending = session.review().edit(&field, value)?;
            println!("{}", pending.summary);
            println!("Is that right? (:yes / :no)");
        }
        Input::Finalize => {
            let snapshot = session.review().finalize()?;
            let json = snapshot.to_json()?;
            match output {
                Some(path) => {
                    fs::write(path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Application saved to {}", path.display());
                }
                None => println!("{}", json),
            }
            return Ok(Flow::Done);
        }
    }
    Ok(Flow::Continue)
}

fn print_current_question(interview: &Interview) {
    match interview.current_field() {
        Some(field) => println!(
            "[{} {:.0}%] {}",
            catalog::section_title(&field.section),
            interview.progress() * 100.0,
            field.prompt
        ),
        None => println!("All questions answered. Type :review to check your answers."),
    }
}

fn print_review(sections: &[ReviewSection]) {
    for section in sections {
        println!("\n{}", section.title);
        for entry in &section.entries {
            let flag = match entry.confidence {
                Some(intake_core::Confidence::Low) => " (low confidence)",
                _ => "",
            };
            println!("  {}: {}{}", entry.label, entry.display_value(), flag);
        }
    }
    println!("\n:edit <field> <value> to change a field, :finalize to finish.");
}
