// CSV export
// Header-less rows for downstream mass spectrometry pipelines
use std::io::Write;
use thiserror::Error;

use crate::state::{ChromatographyMethod, CompoundMean, Observation};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Attachment name of a method's export
pub fn export_filename(method: &ChromatographyMethod, raw: bool) -> String {
    let stem = sanitize_filename(&method.name);
    if raw {
        format!("{}-raw.csv", stem)
    } else {
        format!("{}.csv", stem)
    }
}

/// Keep printable ASCII that is safe inside a quoted `Content-Disposition` filename
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect()
}

/// Shortest round-trip representation, always with a decimal point; empty when absent
pub fn format_retention_time(value: Option<f64>) -> String {
    value.map(|v| format!("{:?}", v)).unwrap_or_default()
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer)
}

/// One `name,molecular_formula,mean_retention_time` row per compound
pub fn write_means_csv<W: Write>(writer: W, means: &[CompoundMean]) -> ExportResult<()> {
    let mut csv = csv_writer(writer);
    for mean in means {
        csv.write_record([
            mean.compound.name.as_str(),
            mean.compound.molecular_formula.as_str(),
            format_retention_time(mean.mean_retention_time).as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// One `name,molecular_formula,retention_time,standard_run_id` row per observation
pub fn write_observations_csv<W: Write>(
    writer: W,
    observations: &[Observation],
) -> ExportResult<()> {
    let mut csv = csv_writer(writer);
    for observation in observations {
        csv.write_record([
            observation.compound.name.as_str(),
            observation.compound.molecular_formula.as_str(),
            format_retention_time(observation.retention_time.retention_time).as_str(),
            observation.retention_time.standard_run_id.to_string().as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn means_to_csv(means: &[CompoundMean]) -> ExportResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_means_csv(&mut buffer, means)?;
    Ok(buffer)
}

pub fn observations_to_csv(observations: &[Observation]) -> ExportResult<Vec<u8>> {
    let mut buffer = Vec::new();
    write_observations_csv(&mut buffer, observations)?;
    Ok(buffer)
}
