//! JSON request and response bodies.

use serde::{Deserialize, Serialize};

use crate::state::{
    ChromatographyMethod, Compound, CompoundList, CompoundMean, CompoundRetention, Observation,
    StandardRun, XrefLink,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database_connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompoundRequest {
    pub name: String,
    pub molecular_formula: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A compound with its derived masses and everything recorded about it
#[derive(Debug, Serialize)]
pub struct CompoundDetail {
    #[serde(flatten)]
    pub compound: Compound,
    pub monoisotopic_mass: f64,
    pub m_z_negative: f64,
    pub m_z_positive: f64,
    pub xrefs: Vec<XrefLink>,
    pub retention_times: Vec<CompoundRetention>,
}

/// `?mode=N`; kept as text so a bad mode becomes a JSON error
#[derive(Debug, Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MzQuery {
    pub formula: String,
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MzResponse {
    pub formula: String,
    pub monoisotopic_mass: f64,
    pub mode: i32,
    pub adduct: String,
    pub m_z: f64,
}

#[derive(Debug, Serialize)]
pub struct CompoundListDetail {
    #[serde(flatten)]
    pub list: CompoundList,
    pub compounds: Vec<Compound>,
}

/// One option of a selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct MethodDetail {
    #[serde(flatten)]
    pub method: ChromatographyMethod,
    /// Id 0 selects every compound
    pub compound_lists: Vec<Choice>,
    pub standard_runs: Vec<Choice>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionTimesAction {
    #[default]
    Select,
    Export,
    ExportRaw,
}

#[derive(Debug, Deserialize)]
pub struct RetentionTimesRequest {
    /// Compound list id, 0 for all compounds
    #[serde(default)]
    pub compound_list: i64,
    /// Runs to include; all runs of the method when absent
    #[serde(default)]
    pub standard_runs: Option<Vec<i64>>,
    #[serde(default)]
    pub action: RetentionTimesAction,
}

#[derive(Debug, Serialize)]
pub struct RetentionTimesResponse {
    pub method: ChromatographyMethod,
    pub compound_list: Option<i64>,
    pub standard_runs: Option<Vec<i64>>,
    pub means: Vec<CompoundMean>,
}

#[derive(Debug, Serialize)]
pub struct StandardRunDetail {
    #[serde(flatten)]
    pub run: StandardRun,
    pub method: ChromatographyMethod,
    pub retention_times: Vec<Observation>,
}
