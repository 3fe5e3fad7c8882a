// Get-or-create over natural keys
// Lookup first; on a miss insert, and if another writer won the race re-query its row
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::db::{DbError, DbResult};
use super::models::{
    ChromatographyMethod, Compound, CompoundList, ExternalDatabase, NewCompound, NewStandardRun,
    RetentionTime, StandardRun,
};
use super::queries;
use crate::chem::Formula;

/// Attempts before a persistently conflicting insert is reported
pub const MAX_ATTEMPTS: usize = 3;

/// An entity addressable by a natural key that the schema declares unique
pub trait GetOrCreate: Sized {
    type Key: ?Sized;
    type Defaults;

    const ENTITY: &'static str;

    fn find(conn: &Connection, key: &Self::Key) -> DbResult<Option<Self>>;

    fn create(conn: &Connection, key: &Self::Key, defaults: &Self::Defaults) -> DbResult<Self>;
}

/// Return the entity stored under `key`, inserting it with `defaults` when absent.
///
/// The flag is true only for the caller whose insert landed. Losing a race to a
/// concurrent writer shows up as `ConstraintViolation`, after which the winner's row
/// is returned instead.
pub fn get_or_create<E: GetOrCreate>(
    conn: &Connection,
    key: &E::Key,
    defaults: &E::Defaults,
) -> DbResult<(E, bool)> {
    for attempt in 1..=MAX_ATTEMPTS {
        if let Some(existing) = E::find(conn, key)? {
            return Ok((existing, false));
        }

        match E::create(conn, key, defaults) {
            Ok(created) => return Ok((created, true)),
            Err(DbError::ConstraintViolation(message)) => {
                log::debug!(
                    "Lost insert race for {} (attempt {}): {}",
                    E::ENTITY,
                    attempt,
                    message
                );
            }
            Err(e) => return Err(e),
        }
    }

    Err(DbError::RetriesExhausted {
        entity: E::ENTITY,
        attempts: MAX_ATTEMPTS,
    })
}

impl GetOrCreate for ChromatographyMethod {
    type Key = str;
    type Defaults = Option<String>;

    const ENTITY: &'static str = "chromatography method";

    fn find(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        queries::get_method_by_name(conn, name)
    }

    fn create(conn: &Connection, name: &str, description: &Option<String>) -> DbResult<Self> {
        queries::create_method(conn, name, description.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct CompoundDefaults {
    pub molecular_formula: Formula,
    pub notes: Option<String>,
}

/// Compounds are keyed by standardized name; the key given is also the stored name
impl GetOrCreate for Compound {
    type Key = str;
    type Defaults = CompoundDefaults;

    const ENTITY: &'static str = "compound";

    fn find(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        queries::find_compound_by_standardized_name(conn, name)
    }

    fn create(conn: &Connection, name: &str, defaults: &CompoundDefaults) -> DbResult<Self> {
        let compound = NewCompound::with_formula(
            name,
            defaults.molecular_formula.clone(),
            defaults.notes.clone(),
        )?;
        queries::create_compound(conn, &compound)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardRunKey {
    pub date: DateTime<Utc>,
    pub operator: String,
}

#[derive(Debug, Clone)]
pub struct StandardRunDefaults {
    pub chromatography_method_id: i64,
    pub raw_data_file: Option<String>,
}

impl GetOrCreate for StandardRun {
    type Key = StandardRunKey;
    type Defaults = StandardRunDefaults;

    const ENTITY: &'static str = "standard run";

    fn find(conn: &Connection, key: &StandardRunKey) -> DbResult<Option<Self>> {
        queries::find_standard_run(conn, &key.date, &key.operator)
    }

    fn create(
        conn: &Connection,
        key: &StandardRunKey,
        defaults: &StandardRunDefaults,
    ) -> DbResult<Self> {
        queries::create_standard_run(
            conn,
            &NewStandardRun {
                date: key.date,
                operator: key.operator.clone(),
                raw_data_file: defaults.raw_data_file.clone(),
                chromatography_method_id: defaults.chromatography_method_id,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionTimeKey {
    pub compound_id: i64,
    pub standard_run_id: i64,
}

impl GetOrCreate for RetentionTime {
    type Key = RetentionTimeKey;
    type Defaults = Option<f64>;

    const ENTITY: &'static str = "retention time";

    fn find(conn: &Connection, key: &RetentionTimeKey) -> DbResult<Option<Self>> {
        queries::find_retention_time(conn, key.compound_id, key.standard_run_id)
    }

    fn create(
        conn: &Connection,
        key: &RetentionTimeKey,
        retention_time: &Option<f64>,
    ) -> DbResult<Self> {
        queries::create_retention_time(conn, key.compound_id, key.standard_run_id, *retention_time)
    }
}

impl GetOrCreate for CompoundList {
    type Key = str;
    type Defaults = Option<String>;

    const ENTITY: &'static str = "compound list";

    fn find(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        queries::get_compound_list_by_name(conn, name)
    }

    fn create(conn: &Connection, name: &str, description: &Option<String>) -> DbResult<Self> {
        queries::create_compound_list(conn, name, description.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExternalDatabaseDefaults {
    pub url: Option<String>,
    pub compound_url: Option<String>,
}

impl GetOrCreate for ExternalDatabase {
    type Key = str;
    type Defaults = ExternalDatabaseDefaults;

    const ENTITY: &'static str = "external database";

    fn find(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        queries::get_external_database_by_name(conn, name)
    }

    fn create(
        conn: &Connection,
        name: &str,
        defaults: &ExternalDatabaseDefaults,
    ) -> DbResult<Self> {
        queries::create_external_database(
            conn,
            name,
            defaults.url.as_deref(),
            defaults.compound_url.as_deref(),
        )
    }
}
