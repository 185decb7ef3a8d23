/// Data layer: core types, loading, filtering, re-typing and writing.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  range predicates → surviving rows (stable)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  convert  │  text column → dates (strict)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Dataset → .csv, no index column
///   └──────────┘
/// ```

pub mod convert;
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
