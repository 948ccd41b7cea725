#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Writes the response log ("Goldmann sheet") to CSV or JSON.
//!
//! Rows keep detection order and floats are written with their shortest
//! exact representation, so reading an export back yields the same values.

use std::{fs::File, io::Write, path::Path};

use anyhow::Context;
use kinetic_perimetry_core::{ResponseLog, ResponseRecord};
use serde::{Deserialize, Serialize};

/// File encoding of an export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Comma separated values with a header row.
    Csv,
    /// Pretty-printed JSON array.
    Json,
}

impl ExportFormat {
    /// Guesses the format from a file extension, if it is a known one.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("csv") {
            Some(Self::Csv)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// One exported row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Position in detection order, starting at zero.
    pub index: usize,
    /// Goldmann size label.
    pub size: String,
    /// Meridian the stimulus was sweeping along.
    pub meridian_deg: f64,
    /// Vertical component of the response.
    pub theta_deg: f64,
    /// Horizontal component of the response.
    pub phi_deg: f64,
    /// Distance of the response from the field center.
    pub eccentricity_deg: f64,
}

impl ExportRecord {
    fn new(index: usize, record: &ResponseRecord) -> Self {
        Self {
            index,
            size: record.size.label().to_owned(),
            meridian_deg: record.meridian_deg,
            theta_deg: record.response.theta_deg(),
            phi_deg: record.response.phi_deg(),
            eccentricity_deg: record.response.eccentricity_deg(),
        }
    }
}

/// Rows of `log` in detection order.
#[must_use]
pub fn export_records(log: &ResponseLog) -> Vec<ExportRecord> {
    log.iter()
        .enumerate()
        .map(|(index, record)| ExportRecord::new(index, record))
        .collect()
}

/// Failures while writing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The CSV writer failed.
    #[error("failed to write CSV export")]
    Csv(#[from] csv::Error),
    /// The JSON serializer failed.
    #[error("failed to write JSON export")]
    Json(#[from] serde_json::Error),
    /// The underlying writer failed.
    #[error("failed to flush export")]
    Io(#[from] std::io::Error),
}

/// Writes `log` as CSV with a header row.
pub fn write_csv<W>(log: &ResponseLog, writer: W) -> Result<(), ExportError>
where
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    for record in export_records(log) {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `log` as a JSON array.
pub fn write_json<W>(log: &ResponseLog, mut writer: W) -> Result<(), ExportError>
where
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, &export_records(log))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `log` in `format`.
pub fn write_export<W>(log: &ResponseLog, format: ExportFormat, writer: W) -> Result<(), ExportError>
where
    W: Write,
{
    match format {
        ExportFormat::Csv => write_csv(log, writer),
        ExportFormat::Json => write_json(log, writer),
    }
}

/// Creates `path` and writes `log` into it.
pub fn export_to_path(log: &ResponseLog, format: ExportFormat, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create export file {}", path.display()))?;
    write_export(log, format, file)
        .with_context(|| format!("failed to export responses to {}", path.display()))?;
    tracing::info!(
        responses = log.len(),
        path = %path.display(),
        "responses exported"
    );
    Ok(())
}
