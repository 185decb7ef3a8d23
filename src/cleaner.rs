//! The range-filter cleaning pass

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{CleaningConfig, LAST_REVIEW_COLUMN};
use crate::data::model::Dataset;
use crate::data::{convert, filter, loader, writer};
use crate::error::Result;

/// Rows removed by one filter stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub removed: usize,
}

/// Row accounting for one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_read: usize,
    pub rows_written: usize,
    pub columns: usize,
    pub stages: Vec<StageReport>,
}

/// Loads a dataset, drops rows outside the configured ranges, re-types
/// `last_review` to dates and writes the survivors.
#[derive(Debug, Clone)]
pub struct RangeFilterCleaner {
    config: CleaningConfig,
}

impl RangeFilterCleaner {
    pub fn new(config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        Ok(RangeFilterCleaner { config })
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Read `input`, clean it and write the result to `output`.
    ///
    /// Nothing is written unless every stage succeeds.
    pub fn clean(&self, input: &Path, output: &Path) -> Result<CleaningReport> {
        let dataset = loader::load_file(input)?;
        info!(
            "Loaded {} rows x {} columns from {}",
            dataset.len(),
            dataset.columns.len(),
            input.display()
        );

        let (cleaned, report) = self.clean_dataset(&dataset)?;
        writer::write_csv(&cleaned, output)?;
        info!(
            "Wrote {} of {} rows to {}",
            report.rows_written,
            report.rows_read,
            output.display()
        );
        Ok(report)
    }

    /// The in-memory pass.  `dataset` is left untouched.
    pub fn clean_dataset(&self, dataset: &Dataset) -> Result<(Dataset, CleaningReport)> {
        dataset.require_columns(&self.config.required_columns())?;

        let mut stages = Vec::new();

        info!(
            "Removing listings with price out of range ({},{})",
            self.config.min_price, self.config.max_price
        );
        let mut current = filter::apply(dataset, &self.config.price_stage())?;
        stages.push(StageReport {
            stage: "price".to_string(),
            removed: dataset.len() - current.len(),
        });

        info!("Change format of {LAST_REVIEW_COLUMN} column from string to date");
        current = convert::retype_dates(&current, LAST_REVIEW_COLUMN)?;

        for (name, predicates) in self.config.extended_stages() {
            let bounds: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
            info!("Removing listings outside {name} ({})", bounds.join(", "));
            let before = current.len();
            current = filter::apply(&current, &predicates)?;
            stages.push(StageReport {
                stage: name.to_string(),
                removed: before - current.len(),
            });
        }

        for stage in &stages {
            log::debug!("stage '{}' removed {} rows", stage.stage, stage.removed);
        }

        let report = CleaningReport {
            rows_read: dataset.len(),
            rows_written: current.len(),
            columns: current.columns.len(),
            stages,
        };
        Ok((current, report))
    }
}
