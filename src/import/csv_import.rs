// Retention time CSV import
// Loads `Name, Formula, RT` rows measured in one standard run of one method
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

use super::trace::{ImportEvent, TraceError, TraceWriter};
use crate::chem::{Formula, FormulaError};
use crate::state::{
    get_or_create, in_savepoint, queries, standardize_name, ChromatographyMethod, Compound,
    CompoundDefaults, DbConnection, DbError, RetentionTime, RetentionTimeKey, StandardRun,
    StandardRunDefaults, StandardRunKey,
};

pub const NAME_COLUMN: &str = "Name";
pub const FORMULA_COLUMN: &str = "Formula";
pub const RT_COLUMN: &str = "RT";

/// Errors that abort the whole import
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("Unrecognized run date {0:?}")]
    InvalidDate(String),

    #[error(
        "Standard run {run_id} already exists for method {existing_method:?}, not {requested_method:?}"
    )]
    RunMethodMismatch {
        run_id: i64,
        existing_method: String,
        requested_method: String,
    },
}

pub type ImportResult<T> = Result<T, ImportError>;

/// Why a single row was rejected; the rest of the batch carries on
#[derive(Debug, Error)]
pub enum RowError {
    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("compound name is blank")]
    BlankName,

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("unable to parse retention time {0:?}")]
    InvalidRetentionTime(String),

    #[error("compound {name:?} already exists with formula {existing}, not {new}")]
    ConflictingAttributes {
        name: String,
        existing: String,
        new: String,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based line in the source file
    pub line: u64,
    pub name: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub compounds_created: usize,
    pub retention_times_created: usize,
    pub retention_times_updated: usize,
    pub rows_skipped: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    fn record(&mut self, outcome: &RowOutcome) {
        if outcome.compound_created {
            self.compounds_created += 1;
        }
        match outcome.retention_time {
            RetentionOutcome::Created => self.retention_times_created += 1,
            RetentionOutcome::Updated => self.retention_times_updated += 1,
            RetentionOutcome::Unchanged => {}
            RetentionOutcome::Skipped => self.rows_skipped += 1,
        }
    }
}

/// Where the measurements come from
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub method: String,
    pub date: DateTime<Utc>,
    pub operator: String,
    pub raw_data_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetentionOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

#[derive(Debug, Clone, Copy)]
struct RowOutcome {
    compound_created: bool,
    retention_time: RetentionOutcome,
}

struct Columns {
    name: usize,
    formula: usize,
    retention_time: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> ImportResult<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|header| header.trim() == column)
                .ok_or(ImportError::MissingColumn(column))
        };

        Ok(Columns {
            name: find(NAME_COLUMN)?,
            formula: find(FORMULA_COLUMN)?,
            retention_time: find(RT_COLUMN)?,
        })
    }
}

/// A row that passed validation and is ready to write
struct ParsedRow {
    name: String,
    formula: Formula,
    retention_time: Option<f64>,
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or("").trim()
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> Result<ParsedRow, RowError> {
    let name = field(record, columns.name);
    if standardize_name(name).is_empty() {
        return Err(RowError::BlankName);
    }

    let formula = Formula::parse(field(record, columns.formula))?;

    let rt_text = field(record, columns.retention_time);
    let retention_time = if rt_text.is_empty() {
        None
    } else {
        // NaN would be stored as NULL and infinities poison the means
        let value = rt_text
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| RowError::InvalidRetentionTime(rt_text.to_string()))?;
        Some(value)
    };

    Ok(ParsedRow {
        name: name.to_string(),
        formula,
        retention_time,
    })
}

fn write_row(conn: &Connection, row: ParsedRow, run: &StandardRun) -> Result<RowOutcome, RowError> {
    let (compound, compound_created) = get_or_create::<Compound>(
        conn,
        &row.name,
        &CompoundDefaults {
            molecular_formula: row.formula.clone(),
            notes: None,
        },
    )?;

    if compound.molecular_formula != row.formula {
        return Err(RowError::ConflictingAttributes {
            name: compound.name,
            existing: compound.molecular_formula.to_string(),
            new: row.formula.to_string(),
        });
    }

    let Some(value) = row.retention_time else {
        return Ok(RowOutcome {
            compound_created,
            retention_time: RetentionOutcome::Skipped,
        });
    };

    let key = RetentionTimeKey {
        compound_id: compound.id,
        standard_run_id: run.id,
    };
    let (existing, created) = get_or_create::<RetentionTime>(conn, &key, &Some(value))?;

    let retention_time = if created {
        RetentionOutcome::Created
    } else if existing.retention_time != Some(value) {
        queries::update_retention_time(conn, existing.id, Some(value))?;
        RetentionOutcome::Updated
    } else {
        RetentionOutcome::Unchanged
    };

    Ok(RowOutcome {
        compound_created,
        retention_time,
    })
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date.
/// Times without an offset are taken as UTC.
pub fn parse_run_date(text: &str) -> ImportResult<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ImportError::InvalidDate(text.to_string()))
}

/// Resolve the method and standard run the rows belong to
fn resolve_run(
    conn: &Connection,
    request: &ImportRequest,
) -> ImportResult<(ChromatographyMethod, StandardRun)> {
    let (method, created) = get_or_create::<ChromatographyMethod>(conn, &request.method, &None)?;
    if created {
        log::info!("Created chromatography method {}", method.name);
    }

    let (run, created) = get_or_create::<StandardRun>(
        conn,
        &StandardRunKey {
            date: request.date,
            operator: request.operator.clone(),
        },
        &StandardRunDefaults {
            chromatography_method_id: method.id,
            raw_data_file: request.raw_data_file.clone(),
        },
    )?;

    if created {
        log::info!(
            "Created standard run {} on {} by {}",
            run.id,
            run.date,
            run.operator
        );
    } else if run.chromatography_method_id != method.id {
        let existing_method = queries::get_method(conn, run.chromatography_method_id)?
            .map(|m| m.name)
            .unwrap_or_else(|| run.chromatography_method_id.to_string());
        return Err(ImportError::RunMethodMismatch {
            run_id: run.id,
            existing_method,
            requested_method: method.name,
        });
    }

    Ok((method, run))
}

/// Import retention times from CSV into an open transaction.
///
/// Each row is validated before any write and written inside its own savepoint, so a
/// rejected row leaves no partial state behind. Row problems are collected in the
/// report; only missing columns, an unusable run, or storage failures outside a row
/// abort the import.
///
/// `Started` and `RowFailed` trace entries are written as rows are processed, before
/// the caller commits. The `Finished` entry is left to [`run_import`].
pub fn import_retention_times<R: Read>(
    conn: &Connection,
    source: R,
    request: &ImportRequest,
    trace: Option<&TraceWriter>,
) -> ImportResult<ImportReport> {
    let (method, run) = resolve_run(conn, request)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let columns = Columns::locate(csv_reader.headers()?)?;

    if let Some(trace) = trace {
        trace.write(ImportEvent::Started {
            method: method.name.clone(),
            operator: run.operator.clone(),
            standard_run_id: run.id,
        })?;
    }

    let mut report = ImportReport::default();

    for (index, result) in csv_reader.records().enumerate() {
        // Header is line 1
        let fallback_line = index as u64 + 2;

        let (line, name, outcome) = match result {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                let name = Some(field(&record, columns.name).to_string()).filter(|n| !n.is_empty());
                let outcome = parse_row(&record, &columns).and_then(|row| {
                    in_savepoint(conn, "import_row", || write_row(conn, row, &run))
                });
                (line, name, outcome)
            }
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                (line, None, Err(RowError::Malformed(e.to_string())))
            }
        };

        match outcome {
            Ok(outcome) => report.record(&outcome),
            Err(err) => {
                log::warn!("Skipping line {}: {}", line, err);
                let failure = RowFailure {
                    line,
                    name,
                    reason: err.to_string(),
                };
                if let Some(trace) = trace {
                    trace.write(ImportEvent::RowFailed {
                        line: failure.line,
                        name: failure.name.clone(),
                        reason: failure.reason.clone(),
                    })?;
                }
                report.failures.push(failure);
            }
        }
    }

    log::info!(
        "Imported into run {}: {} compounds created, {} retention times created, {} updated, {} skipped, {} failed",
        run.id,
        report.compounds_created,
        report.retention_times_created,
        report.retention_times_updated,
        report.rows_skipped,
        report.failures.len()
    );

    Ok(report)
}

/// Import a CSV file as one transaction, optionally tracing to `trace_path`
pub fn run_import(
    db: &DbConnection,
    csv_path: &Path,
    request: &ImportRequest,
    trace_path: Option<&Path>,
) -> ImportResult<ImportReport> {
    let file = BufReader::new(File::open(csv_path)?);
    let trace = trace_path.map(|path| TraceWriter::new(path.to_path_buf()));

    log::info!("Importing records from {}", csv_path.display());
    let report =
        db.with_transaction(|tx| import_retention_times(tx, file, request, trace.as_ref()))?;

    // Only a committed import gets its summary line
    if let Some(trace) = &trace {
        trace.write(ImportEvent::Finished {
            compounds_created: report.compounds_created,
            retention_times_created: report.retention_times_created,
            retention_times_updated: report.retention_times_updated,
            rows_skipped: report.rows_skipped,
            rows_failed: report.failures.len(),
        })?;
    }

    Ok(report)
}
