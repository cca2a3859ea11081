#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the BLI engine.
//!
//! ```text
//! bli analyze --enrollment enr.csv --biometric bio.csv [--demographic demo.csv]
//! bli gap-series --enrollment enr.csv --biometric bio.csv --district Pune [--state Maharashtra]
//! bli seasonality --biometric bio.csv [--enrollment enr.csv]
//! bli states --enrollment enr.csv --biometric bio.csv
//! bli ask --enrollment enr.csv --biometric bio.csv "Which district has the highest BLI?"
//! ```
//!
//! Running `bli` with no subcommand enters interactive mode.
//!
//! Uses `indicatif-log-bridge` (via [`bli_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

mod interactive;
mod output;

use std::path::{Path, PathBuf};

use bli_cli_utils::{IndicatifProgress, MultiProgress};
use bli_dataset_models::DatasetKind;
use bli_engine::{
    CancelToken, EngineConfig, EngineError, IngestControl, IngestReport, Session,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "bli", about = "Biometric Lag Index analytics")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of top problem districts to report
    #[arg(long, global = true)]
    top: Option<usize>,

    /// Rejected rows tolerated per file before the file fails
    #[arg(long, global = true)]
    tolerance: Option<usize>,

    /// Rows per parse and aggregation chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Input files shared by every subcommand.
#[derive(Args)]
struct DataArgs {
    /// Enrollment CSV (optionally gzipped)
    #[arg(long)]
    enrollment: Option<PathBuf>,

    /// Biometric update CSV (optionally gzipped)
    #[arg(long)]
    biometric: Option<PathBuf>,

    /// Demographic update CSV (optionally gzipped)
    #[arg(long)]
    demographic: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long)]
    json: bool,
}

impl DataArgs {
    fn files(&self) -> Vec<(DatasetKind, &Path)> {
        [
            (DatasetKind::Enrollment, self.enrollment.as_deref()),
            (DatasetKind::Biometric, self.biometric.as_deref()),
            (DatasetKind::Demographic, self.demographic.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, path)| path.map(|p| (kind, p)))
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute district and state BLI and print the ranking
    Analyze {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Print the cumulative enrollment vs. update curve of one district
    GapSeries {
        #[command(flatten)]
        data: DataArgs,
        /// District name
        #[arg(long)]
        district: String,
        /// State name, required when the district name exists in several states
        #[arg(long)]
        state: Option<String>,
    },
    /// Print monthly biometric update volume
    Seasonality {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Print every state ranked by BLI
    States {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Ask a question about the data
    Ask {
        #[command(flatten)]
        data: DataArgs,
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

impl Cli {
    /// Defaults, then the config file and environment, then flags.
    fn engine_config(&self) -> Result<EngineConfig, EngineError> {
        let mut config = EngineConfig::load(self.config.as_deref())?;
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if let Some(tolerance) = self.tolerance {
            config.error_tolerance = tolerance;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Reads and ingests one file with a progress bar.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn ingest_file(
    session: &mut Session,
    multi: &MultiProgress,
    kind: DatasetKind,
    path: &Path,
) -> Result<IngestReport, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let progress = IndicatifProgress::rows_bar(multi, &format!("Reading {}", path.display()));
    let control = IngestControl::new(CancelToken::new(), progress);
    Ok(session.ingest_with(kind, &bytes, &control)?)
}

/// Prints `value` as JSON or through `table`.
fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    table: impl FnOnce(&T),
) -> Result<(), serde_json::Error> {
    if json {
        output::print_json(value)
    } else {
        table(value);
        Ok(())
    }
}

fn execute(
    session: &mut Session,
    command: &Commands,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Analyze { .. } => {
            let result = session.compute_analysis()?;
            emit(json, result.as_ref(), output::print_analysis)?;
        }
        Commands::GapSeries {
            district, state, ..
        } => {
            let series = session.get_gap_series(district, state.as_deref())?;
            emit(json, &series, output::print_gap_series)?;
        }
        Commands::Seasonality { .. } => {
            let profile = session.get_seasonality()?;
            emit(json, &profile, output::print_seasonality)?;
        }
        Commands::States { .. } => {
            let states = session.get_state_summary()?;
            emit(json, states.as_slice(), output::print_states)?;
        }
        Commands::Ask { question, .. } => {
            let answer = session.ask(&question.join(" "))?;
            emit(json, &answer, output::print_answer)?;
        }
    }
    Ok(())
}

fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.engine_config()?;
    log::debug!("Effective config: {config:?}");

    let Some(command) = cli.command else {
        return interactive::run(config, multi);
    };

    let mut session = Session::new(config);
    let data = match &command {
        Commands::Analyze { data }
        | Commands::GapSeries { data, .. }
        | Commands::Seasonality { data }
        | Commands::States { data }
        | Commands::Ask { data, .. } => data,
    };
    for (kind, path) in data.files() {
        let report = ingest_file(&mut session, multi, kind, path)?;
        if !data.json {
            output::print_ingest(&report);
        }
    }

    execute(&mut session, &command, data.json)
}

fn main() {
    let multi = bli_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli, &multi) {
        match e.downcast_ref::<EngineError>() {
            Some(engine) => output::print_error(engine),
            None => output::print_failure(e.as_ref()),
        }
        std::process::exit(1);
    }
}
