// Data models for the metabolite database
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use super::db::{DbError, DbResult};
use crate::chem::{Formula, IonMode};

/// Normalize a compound name for uniqueness checks.
///
/// Lowercases, trims, and collapses every run of whitespace, `-` or `_` into a
/// single `-`. Applying it twice gives the same result.
pub fn standardize_name(name: &str) -> String {
    let mut standardized = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !standardized.is_empty() {
            standardized.push('-');
        }
        pending_separator = false;
        standardized.extend(ch.to_lowercase());
    }

    standardized
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub id: i64,
    pub name: String,
    pub standardized_name: String,
    pub molecular_formula: Formula,
    pub notes: Option<String>,
}

impl Compound {
    pub fn monoisotopic_mass(&self) -> f64 {
        self.molecular_formula.monoisotopic_mass()
    }

    pub fn m_z(&self, mode: IonMode) -> f64 {
        self.molecular_formula.m_z(mode)
    }
}

/// A compound that has not been stored yet; construction validates it
#[derive(Debug, Clone, PartialEq)]
pub struct NewCompound {
    pub name: String,
    pub standardized_name: String,
    pub molecular_formula: Formula,
    pub notes: Option<String>,
}

impl NewCompound {
    /// Validate name and formula. An invalid formula never reaches the database.
    pub fn new(name: &str, molecular_formula: &str, notes: Option<String>) -> DbResult<Self> {
        let formula = Formula::parse(molecular_formula)?;
        Self::with_formula(name, formula, notes)
    }

    pub fn with_formula(name: &str, molecular_formula: Formula, notes: Option<String>) -> DbResult<Self> {
        let name = name.trim();
        let standardized_name = standardize_name(name);
        if standardized_name.is_empty() {
            return Err(DbError::InvalidInput(format!(
                "compound name {:?} is blank",
                name
            )));
        }

        Ok(NewCompound {
            name: name.to_string(),
            standardized_name,
            molecular_formula,
            notes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatographyMethod {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRun {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub operator: String,
    pub raw_data_file: Option<String>,
    pub chromatography_method_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStandardRun {
    pub date: DateTime<Utc>,
    pub operator: String,
    pub raw_data_file: Option<String>,
    pub chromatography_method_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionTime {
    pub id: i64,
    pub compound_id: i64,
    pub standard_run_id: i64,
    pub retention_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundList {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalDatabase {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    /// Link template; `{}` is replaced by the external compound id
    pub compound_url: Option<String>,
}

impl ExternalDatabase {
    pub fn compound_link(&self, external_compound_id: &str) -> Option<String> {
        self.compound_url
            .as_ref()
            .map(|template| template.replace("{}", external_compound_id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbXref {
    pub compound_id: i64,
    pub external_database_id: i64,
    pub external_compound_id: String,
}

/// A cross-reference joined with its database, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrefLink {
    pub database_name: String,
    pub external_compound_id: String,
    pub url: Option<String>,
}

/// Mean retention time of one compound; `None` when no run matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundMean {
    pub compound: Compound,
    pub mean_retention_time: Option<f64>,
}

/// One observed (non-null) retention time with its compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub compound: Compound,
    pub retention_time: RetentionTime,
}

/// A retention time of a compound, with the run and method it was measured in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundRetention {
    pub retention_time: RetentionTime,
    pub standard_run: StandardRun,
    pub method_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardRunSummary {
    pub run: StandardRun,
    pub retention_time_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundListSummary {
    pub list: CompoundList,
    pub compound_count: i64,
}

impl ToSql for Formula {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Formula {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Formula::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
