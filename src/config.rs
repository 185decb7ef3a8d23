//! Cleaning configuration and the fixed filtering policy

use serde::{Deserialize, Serialize};

use crate::data::filter::RangePredicate;
use crate::error::{CleanError, Result};

pub const PRICE_COLUMN: &str = "price";
pub const LAST_REVIEW_COLUMN: &str = "last_review";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const MINIMUM_NIGHTS_COLUMN: &str = "minimum_nights";

/// New York City bounding box.
pub const LONGITUDE_BOUNDS: (f64, f64) = (-74.25, -73.50);
pub const LATITUDE_BOUNDS: (f64, f64) = (40.5, 41.2);

pub const MINIMUM_NIGHTS_BOUNDS: (f64, f64) = (0.0, 365.0);

/// Which optional filters run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Price filter and date re-typing only
    Basic,
    /// Adds the geographic and minimum-nights filters
    Extended,
}

impl Variant {
    /// Whether the local output is removed after registration when the
    /// caller does not say otherwise.
    pub fn cleans_up_by_default(self) -> bool {
        matches!(self, Variant::Extended)
    }
}

/// Bounds and switches for one cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub min_price: f64,
    pub max_price: f64,
    pub variant: Variant,
}

impl CleaningConfig {
    /// Validated constructor; price bounds have no default.
    pub fn new(min_price: f64, max_price: f64, variant: Variant) -> Result<Self> {
        let config = CleaningConfig {
            min_price,
            max_price,
            variant,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min_price.is_finite() || !self.max_price.is_finite() {
            return Err(CleanError::Argument(format!(
                "price bounds must be finite, got ({}, {})",
                self.min_price, self.max_price
            )));
        }
        if self.min_price > self.max_price {
            return Err(CleanError::Argument(format!(
                "min_price {} is greater than max_price {}",
                self.min_price, self.max_price
            )));
        }
        Ok(())
    }

    /// Every column the pass reads, checked up front.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![PRICE_COLUMN, LAST_REVIEW_COLUMN];
        if self.variant == Variant::Extended {
            cols.extend([LONGITUDE_COLUMN, LATITUDE_COLUMN, MINIMUM_NIGHTS_COLUMN]);
        }
        cols
    }

    pub fn price_stage(&self) -> Vec<RangePredicate> {
        vec![RangePredicate::new(PRICE_COLUMN, self.min_price, self.max_price)]
    }

    /// Filter stages that run after date re-typing, in order.
    pub fn extended_stages(&self) -> Vec<(&'static str, Vec<RangePredicate>)> {
        if self.variant != Variant::Extended {
            return Vec::new();
        }
        vec![
            (
                "geographic bounds",
                vec![
                    RangePredicate::new(LONGITUDE_COLUMN, LONGITUDE_BOUNDS.0, LONGITUDE_BOUNDS.1),
                    RangePredicate::new(LATITUDE_COLUMN, LATITUDE_BOUNDS.0, LATITUDE_BOUNDS.1),
                ],
            ),
            (
                "minimum nights",
                vec![RangePredicate::new(
                    MINIMUM_NIGHTS_COLUMN,
                    MINIMUM_NIGHTS_BOUNDS.0,
                    MINIMUM_NIGHTS_BOUNDS.1,
                )],
            ),
        ]
    }
}
