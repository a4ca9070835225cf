//! Export per-loan risk metrics to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::LoanRiskMetric;
use crate::error::AppError;

/// Write per-loan metrics to a CSV file.
pub fn write_metrics_csv(path: &Path, metrics: &[LoanRiskMetric]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;
    write_metrics(file, metrics)
}

/// Write per-loan metrics as CSV (header row included) to any writer.
pub fn write_metrics<W: Write>(out: W, metrics: &[LoanRiskMetric]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for m in metrics {
        writer
            .serialize(m)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
