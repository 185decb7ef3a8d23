//! Range-filter cleaning step for tabular listing datasets.
//!
//! Loads a dataset retrieved from an artifact store, drops rows whose price
//! (and, in the extended variant, location and minimum stay) fall outside
//! fixed ranges, converts `last_review` to dates, writes the survivors to a
//! new CSV file and registers it as a new artifact version.

pub mod artifact;
pub mod cleaner;
pub mod config;
pub mod data;
pub mod error;
pub mod run;
pub mod step;

pub use cleaner::{CleaningReport, RangeFilterCleaner};
pub use config::{CleaningConfig, Variant};
pub use error::{CleanError, Result};
