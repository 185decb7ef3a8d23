//! The pipeline step: retrieve, clean, register, optionally clean up.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactVersion;
use crate::cleaner::{CleaningReport, RangeFilterCleaner};
use crate::config::{CleaningConfig, Variant};
use crate::error::{CleanError, Result};
use crate::run::RunContext;

/// Everything one invocation is configured with; recorded on the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepArgs {
    pub input_artifact: String,
    /// Output file path; its file name doubles as the artifact name.
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
    pub variant: Variant,
    /// Remove the local output after registration.  `None` follows the
    /// variant's default.
    pub cleanup: Option<bool>,
}

impl StepArgs {
    pub fn cleaning_config(&self) -> Result<CleaningConfig> {
        CleaningConfig::new(self.min_price, self.max_price, self.variant)
    }

    pub fn cleanup_enabled(&self) -> bool {
        self.cleanup
            .unwrap_or_else(|| self.variant.cleans_up_by_default())
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_artifact)
    }

    /// Artifact name derived from the output path.
    pub fn output_name(&self) -> Result<String> {
        Path::new(&self.output_artifact)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                CleanError::Argument(format!(
                    "output_artifact '{}' does not name a file",
                    self.output_artifact
                ))
            })
    }
}

/// Result of a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub report: CleaningReport,
    pub artifact: ArtifactVersion,
    /// Local output path, `None` once cleaned up.
    pub local_output: Option<PathBuf>,
}

/// Run the cleaning step inside `run`.
///
/// Either the fully filtered dataset is registered or nothing is: if
/// anything fails after the output file is written, the file is removed.
pub fn run_step(run: &mut RunContext<'_>, args: &StepArgs) -> Result<StepOutcome> {
    let config = args.cleaning_config()?;
    let name = args.output_name()?;
    crate::artifact::validate_name(&name)?;
    run.update_config(args)?;

    info!("Cleaning data");
    let input = run.use_artifact(&args.input_artifact)?;

    let output = args.output_path();
    let cleaner = RangeFilterCleaner::new(config)?;
    let report = cleaner.clean(&input, &output)?;

    info!("Logging artifact");
    let registered = run.log_artifact(
        &output,
        &name,
        &args.output_type,
        &args.output_description,
    );
    let artifact = match registered {
        Ok(artifact) => artifact,
        Err(e) => {
            remove_output(&output);
            return Err(e);
        }
    };

    let local_output = if args.cleanup_enabled() {
        clean_up_output(output)
    } else {
        Some(output)
    };

    Ok(StepOutcome {
        report,
        artifact,
        local_output,
    })
}

/// Remove the registered output.  The artifact is already stored, so a
/// failed removal only warns and the file is reported as still local.
fn clean_up_output(path: PathBuf) -> Option<PathBuf> {
    match std::fs::remove_file(&path) {
        Ok(()) => {
            info!("Removed local file {}", path.display());
            None
        }
        Err(e) => {
            warn!("could not remove local file {}: {e}", path.display());
            Some(path)
        }
    }
}

fn remove_output(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("could not remove {}: {e}", path.display());
    }
}
