use std::path::{Path, PathBuf};

use super::model::Dataset;
use crate::error::Result;

/// Write `dataset` as comma-delimited text with a header row and no index
/// column.
///
/// Cells still carrying their source text are written verbatim; only cells
/// replaced after loading are rendered from their typed value.
///
/// Rows are written to a sibling `.partial` file which is renamed into place
/// once complete, so a failed write never leaves a truncated file at `path`.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let partial = partial_path(path);

    if let Err(e) = write_rows(dataset, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    std::fs::rename(&partial, path)?;
    log::debug!("wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

fn write_rows(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(std::io::Error::from)?;
    writer
        .write_record(&dataset.columns)
        .map_err(std::io::Error::from)?;
    for row in &dataset.rows {
        writer
            .write_record((0..row.cells.len()).map(|i| row.output_text(i)))
            .map_err(std::io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
