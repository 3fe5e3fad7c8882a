// Compound list import
// One compound reference per line: numeric id, exact name, or exact molecular formula
use rusqlite::Connection;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::csv_import::{ImportError, ImportResult};
use crate::state::{get_or_create, queries, Compound, CompoundList, DbConnection, DbResult};

/// Why a reference matched no single compound
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Unresolved {
    NoMatch,
    /// The formula is shared by several compounds
    AmbiguousFormula { compound_ids: Vec<i64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedEntry {
    pub line: usize,
    pub reference: String,
    #[serde(flatten)]
    pub reason: Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListImportReport {
    pub list: CompoundList,
    pub list_created: bool,
    pub added: usize,
    pub already_present: usize,
    pub unresolved: Vec<UnresolvedEntry>,
}

/// Resolve a reference, trying in order: numeric id, exact name, exact formula
pub fn resolve_compound_reference(
    conn: &Connection,
    reference: &str,
) -> DbResult<Result<Compound, Unresolved>> {
    let reference = reference.trim();

    if let Ok(id) = reference.parse::<i64>() {
        if let Some(compound) = queries::get_compound(conn, id)? {
            return Ok(Ok(compound));
        }
    }

    if let Some(compound) = queries::get_compound_by_name(conn, reference)? {
        return Ok(Ok(compound));
    }

    let mut by_formula = queries::find_compounds_by_formula(conn, reference)?;
    Ok(match by_formula.len() {
        0 => Err(Unresolved::NoMatch),
        1 => Ok(by_formula.remove(0)),
        _ => Err(Unresolved::AmbiguousFormula {
            compound_ids: by_formula.iter().map(|c| c.id).collect(),
        }),
    })
}

/// Add every resolvable reference read from `source` to the named list, creating the
/// list when needed. Blank lines and `#` comments are ignored.
pub fn import_compound_list<R: BufRead>(
    conn: &Connection,
    source: R,
    list_name: &str,
    description: Option<&str>,
) -> ImportResult<ListImportReport> {
    let (list, list_created) =
        get_or_create::<CompoundList>(conn, list_name, &description.map(str::to_string))?;
    if list_created {
        log::info!("Created compound list {}", list.name);
    }

    let mut report = ListImportReport {
        list,
        list_created,
        added: 0,
        already_present: 0,
        unresolved: Vec::new(),
    };

    for (index, line) in source.lines().enumerate() {
        let line = line?;
        let reference = line.trim();
        if reference.is_empty() || reference.starts_with('#') {
            continue;
        }

        match resolve_compound_reference(conn, reference)? {
            Ok(compound) => {
                if queries::add_compound_to_list(conn, report.list.id, compound.id)? {
                    report.added += 1;
                } else {
                    report.already_present += 1;
                }
            }
            Err(reason) => {
                log::warn!("Unresolved compound reference {:?} on line {}", reference, index + 1);
                report.unresolved.push(UnresolvedEntry {
                    line: index + 1,
                    reference: reference.to_string(),
                    reason,
                });
            }
        }
    }

    log::info!(
        "Compound list {}: {} added, {} already present, {} unresolved",
        report.list.name,
        report.added,
        report.already_present,
        report.unresolved.len()
    );
    Ok(report)
}

/// Import a reference file as one transaction
pub fn run_list_import(
    db: &DbConnection,
    path: &Path,
    list_name: &str,
    description: Option<&str>,
) -> ImportResult<ListImportReport> {
    let file = BufReader::new(File::open(path).map_err(ImportError::Io)?);
    db.with_transaction(|tx| import_compound_list(tx, file, list_name, description))
}
