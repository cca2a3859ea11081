//! Menu-driven session over uploaded datasets.
//!
//! Prompts for the input files, then loops over a `dialoguer` menu until
//! the user quits. Every action runs against one [`Session`], so the
//! analysis is computed once and the chat history accumulates.

use std::path::PathBuf;

use bli_cli_utils::MultiProgress;
use bli_dataset_models::DatasetKind;
use bli_engine::{ChatRole, EngineConfig, Session};
use dialoguer::{Confirm, Input, Select};

use crate::{ingest_file, output};

/// Top-level actions in the interactive menu.
#[derive(Clone, Copy)]
enum Action {
    Summary,
    States,
    GapSeries,
    Seasonality,
    Ask,
    History,
    ClearHistory,
    Upload,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Summary,
        Self::States,
        Self::GapSeries,
        Self::Seasonality,
        Self::Ask,
        Self::History,
        Self::ClearHistory,
        Self::Upload,
        Self::Quit,
    ];

    #[must_use]
    const fn label(self) -> &'static str {
        match self {
            Self::Summary => "Summary and top problem districts",
            Self::States => "State ranking",
            Self::GapSeries => "Gap series for a district",
            Self::Seasonality => "Monthly update seasonality",
            Self::Ask => "Ask a question",
            Self::History => "Show chat history",
            Self::ClearHistory => "Clear chat history",
            Self::Upload => "Replace a dataset",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails. Engine errors are printed and the
/// menu continues.
pub fn run(config: EngineConfig, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(config);

    for kind in DatasetKind::ALL {
        prompt_upload(&mut session, multi, *kind)?;
    }

    let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();

    loop {
        println!();
        let idx = Select::new()
            .with_prompt("BLI")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::Summary => match session.compute_analysis() {
                Ok(result) => output::print_analysis(&result),
                Err(e) => output::print_error(&e),
            },
            Action::States => match session.get_state_summary() {
                Ok(states) => output::print_states(&states),
                Err(e) => output::print_error(&e),
            },
            Action::GapSeries => handle_gap_series(&mut session)?,
            Action::Seasonality => match session.get_seasonality() {
                Ok(profile) => output::print_seasonality(&profile),
                Err(e) => output::print_error(&e),
            },
            Action::Ask => handle_ask(&mut session)?,
            Action::History => print_history(&session),
            Action::ClearHistory => {
                session.clear_history();
                println!("History cleared.");
            }
            Action::Upload => {
                let kinds: Vec<&str> = DatasetKind::ALL.iter().map(|k| k.label()).collect();
                let idx = Select::new()
                    .with_prompt("Dataset")
                    .items(&kinds)
                    .default(0)
                    .interact()?;
                prompt_upload(&mut session, multi, DatasetKind::ALL[idx])?;
            }
            Action::Quit => break,
        }
    }

    Ok(())
}

/// Asks for a file path for `kind` and ingests it. An empty answer skips
/// the dataset.
fn prompt_upload(
    session: &mut Session,
    multi: &MultiProgress,
    kind: DatasetKind,
) -> Result<(), Box<dyn std::error::Error>> {
    let optional = if kind.is_mandatory() { "" } else { ", optional" };
    let path: String = Input::new()
        .with_prompt(format!("{} CSV path (blank to skip{optional})", kind.label()))
        .allow_empty(true)
        .interact_text()?;
    let path = path.trim();
    if path.is_empty() {
        return Ok(());
    }

    match ingest_file(session, multi, kind, &PathBuf::from(path)) {
        Ok(report) => output::print_ingest(&report),
        Err(e) => match e.downcast_ref::<bli_engine::EngineError>() {
            Some(engine) => output::print_error(engine),
            None => output::print_failure(e.as_ref()),
        },
    }
    Ok(())
}

fn handle_gap_series(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let district: String = Input::new().with_prompt("District").interact_text()?;
    let state: String = Input::new()
        .with_prompt("State (blank for any)")
        .allow_empty(true)
        .interact_text()?;
    let state = Some(state.trim()).filter(|s| !s.is_empty());

    match session.get_gap_series(district.trim(), state) {
        Ok(series) => output::print_gap_series(&series),
        Err(e) => output::print_error(&e),
    }
    Ok(())
}

fn handle_ask(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    let question: String = Input::new().with_prompt("Question").interact_text()?;

    match session.ask(question.trim()) {
        Ok(answer) => {
            output::print_answer(&answer);
            if !answer.suggested_questions.is_empty()
                && Confirm::new()
                    .with_prompt("Ask a suggested question?")
                    .default(false)
                    .interact()?
            {
                let idx = Select::new()
                    .items(&answer.suggested_questions)
                    .default(0)
                    .interact()?;
                let follow_up = answer.suggested_questions[idx].clone();
                println!("> {follow_up}");
                match session.ask(&follow_up) {
                    Ok(answer) => output::print_answer(&answer),
                    Err(e) => output::print_error(&e),
                }
            }
        }
        Err(e) => output::print_error(&e),
    }
    Ok(())
}

fn print_history(session: &Session) {
    let history = session.history();
    if history.is_empty() {
        println!("No questions asked yet.");
        return;
    }
    for turn in history.turns() {
        let who = match turn.role {
            ChatRole::User => "you",
            ChatRole::Assistant => "bli",
        };
        println!("{who:>4}: {}", turn.text);
    }
}
