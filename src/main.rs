//! range-cleaner CLI
//!
//! Cleans a listings artifact and registers the result as a new artifact.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use range_cleaner::artifact::LocalArtifactStore;
use range_cleaner::run::{RunContext, RunStatus};
use range_cleaner::step::{run_step, StepArgs};
use range_cleaner::Variant;

#[derive(Parser)]
#[command(name = "range-cleaner")]
#[command(version, about = "This step cleans the data", long_about = None)]
struct Cli {
    /// The input artifact (`name`, `name:latest` or `name:vN`)
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Output file; its file name is the output artifact name
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// The type for the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// A description for the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// The minimum price to consider
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// The maximum price to consider
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,

    /// Which filters run
    #[arg(long, value_enum, default_value = "extended")]
    variant: Variant,

    /// Remove the local output after registration (defaults to the variant's behaviour)
    #[arg(long, action = clap::ArgAction::Set)]
    cleanup: Option<bool>,

    /// Root directory of the local artifact store
    #[arg(long = "artifact_root", env = "ARTIFACT_ROOT", default_value = "artifacts")]
    artifact_root: PathBuf,

    /// Job type recorded on the run
    #[arg(long = "job_type", default_value = "basic_cleaning")]
    job_type: String,
}

impl Cli {
    fn step_args(&self) -> StepArgs {
        StepArgs {
            input_artifact: self.input_artifact.clone(),
            output_artifact: self.output_artifact.clone(),
            output_type: self.output_type.clone(),
            output_description: self.output_description.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            variant: self.variant,
            cleanup: self.cleanup,
        }
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let store = LocalArtifactStore::new(&cli.artifact_root);
    let mut ctx = RunContext::new(&store, cli.job_type.as_str());
    info!("Started run {} ({})", ctx.id(), cli.job_type);

    match run_step(&mut ctx, &cli.step_args()) {
        Ok(outcome) => {
            let summary = serde_json::to_value(&outcome.report)?;
            ctx.finish(RunStatus::Finished, summary)
                .context("recording run")?;
            info!(
                "Done: {} of {} rows kept, registered {}",
                outcome.report.rows_written,
                outcome.report.rows_read,
                outcome.artifact.tag()
            );
            Ok(())
        }
        Err(e) => {
            let summary = serde_json::json!({ "error": e.to_string() });
            if let Err(record_err) = ctx.finish(RunStatus::Failed, summary) {
                error!("could not record failed run: {record_err}");
            }
            Err(e).context("cleaning step failed")
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
