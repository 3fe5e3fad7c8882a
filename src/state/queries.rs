// Database CRUD operations
//
// Every query takes the connection (or an open transaction) explicitly, so callers
// decide the unit of work.
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::DbResult;
use super::models::{
    standardize_name, ChromatographyMethod, Compound, CompoundList, CompoundListSummary,
    CompoundRetention, DbXref, ExternalDatabase, NewCompound, NewStandardRun, Observation,
    RetentionTime, StandardRun, StandardRunSummary, XrefLink,
};

pub(crate) const COMPOUND_COLUMNS: &str =
    "c.id, c.name, c.standardized_name, c.molecular_formula, c.notes";
pub(crate) const COMPOUND_COLUMN_COUNT: usize = 5;

const STANDARD_RUN_COLUMNS: &str =
    "sr.id, sr.date, sr.operator, sr.raw_data_file, sr.chromatography_method_id";

const RETENTION_TIME_COLUMNS: &str =
    "rt.id, rt.compound_id, rt.standard_run_id, rt.retention_time";

/// Map `COMPOUND_COLUMNS` starting at column `offset`
pub(crate) fn compound_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Compound> {
    Ok(Compound {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        standardized_name: row.get(offset + 2)?,
        molecular_formula: row.get(offset + 3)?,
        notes: row.get(offset + 4)?,
    })
}

pub(crate) fn standard_run_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<StandardRun> {
    Ok(StandardRun {
        id: row.get(offset)?,
        date: row.get(offset + 1)?,
        operator: row.get(offset + 2)?,
        raw_data_file: row.get(offset + 3)?,
        chromatography_method_id: row.get(offset + 4)?,
    })
}

pub(crate) fn retention_time_from_row(
    row: &Row<'_>,
    offset: usize,
) -> rusqlite::Result<RetentionTime> {
    Ok(RetentionTime {
        id: row.get(offset)?,
        compound_id: row.get(offset + 1)?,
        standard_run_id: row.get(offset + 2)?,
        retention_time: row.get(offset + 3)?,
    })
}

fn method_from_row(row: &Row<'_>) -> rusqlite::Result<ChromatographyMethod> {
    Ok(ChromatographyMethod {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn compound_list_from_row(row: &Row<'_>) -> rusqlite::Result<CompoundList> {
    Ok(CompoundList {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn external_database_from_row(row: &Row<'_>) -> rusqlite::Result<ExternalDatabase> {
    Ok(ExternalDatabase {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        compound_url: row.get(3)?,
    })
}

fn query_compounds<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> DbResult<Vec<Compound>> {
    let mut stmt = conn.prepare(sql)?;
    let compounds = stmt
        .query_map(params, |row| compound_from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(compounds)
}

fn query_compound<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> DbResult<Option<Compound>> {
    let compound = conn
        .query_row(sql, params, |row| compound_from_row(row, 0))
        .optional()?;
    Ok(compound)
}

// ==================== COMPOUND QUERIES ====================

/// Insert a validated compound
pub fn create_compound(conn: &Connection, compound: &NewCompound) -> DbResult<Compound> {
    conn.execute(
        "INSERT INTO compound (name, standardized_name, molecular_formula, notes)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            compound.name,
            compound.standardized_name,
            compound.molecular_formula,
            compound.notes,
        ],
    )?;

    Ok(Compound {
        id: conn.last_insert_rowid(),
        name: compound.name.clone(),
        standardized_name: compound.standardized_name.clone(),
        molecular_formula: compound.molecular_formula.clone(),
        notes: compound.notes.clone(),
    })
}

/// Get a compound by ID
pub fn get_compound(conn: &Connection, id: i64) -> DbResult<Option<Compound>> {
    query_compound(
        conn,
        &format!("SELECT {} FROM compound c WHERE c.id = ?1", COMPOUND_COLUMNS),
        [id],
    )
}

/// Get a compound by its exact name
pub fn get_compound_by_name(conn: &Connection, name: &str) -> DbResult<Option<Compound>> {
    query_compound(
        conn,
        &format!("SELECT {} FROM compound c WHERE c.name = ?1", COMPOUND_COLUMNS),
        [name],
    )
}

/// Find the compound whose standardized name matches `name` once standardized
pub fn find_compound_by_standardized_name(
    conn: &Connection,
    name: &str,
) -> DbResult<Option<Compound>> {
    query_compound(
        conn,
        &format!(
            "SELECT {} FROM compound c WHERE c.standardized_name = ?1",
            COMPOUND_COLUMNS
        ),
        [standardize_name(name)],
    )
}

/// All compounds with exactly this molecular formula
pub fn find_compounds_by_formula(conn: &Connection, formula: &str) -> DbResult<Vec<Compound>> {
    query_compounds(
        conn,
        &format!(
            "SELECT {} FROM compound c WHERE c.molecular_formula = ?1 ORDER BY c.id",
            COMPOUND_COLUMNS
        ),
        [formula],
    )
}

/// List all compounds in creation order
pub fn list_compounds(conn: &Connection) -> DbResult<Vec<Compound>> {
    query_compounds(
        conn,
        &format!("SELECT {} FROM compound c ORDER BY c.id", COMPOUND_COLUMNS),
        [],
    )
}

pub fn count_compounds(conn: &Connection) -> DbResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM compound", [], |row| row.get(0))?)
}

/// Retention times of a compound across all runs, with run and method
pub fn compound_retention_times(
    conn: &Connection,
    compound_id: i64,
) -> DbResult<Vec<CompoundRetention>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {}, m.name
         FROM retention_time rt
         JOIN standard_run sr ON sr.id = rt.standard_run_id
         JOIN chromatography_method m ON m.id = sr.chromatography_method_id
         WHERE rt.compound_id = ?1
         ORDER BY m.name, sr.date",
        RETENTION_TIME_COLUMNS, STANDARD_RUN_COLUMNS
    ))?;

    let retention_times = stmt
        .query_map([compound_id], |row| {
            Ok(CompoundRetention {
                retention_time: retention_time_from_row(row, 0)?,
                standard_run: standard_run_from_row(row, 4)?,
                method_name: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(retention_times)
}

// ==================== METHOD QUERIES ====================

/// Create a new chromatography method
pub fn create_method(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> DbResult<ChromatographyMethod> {
    conn.execute(
        "INSERT INTO chromatography_method (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;

    Ok(ChromatographyMethod {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

/// Get a method by ID
pub fn get_method(conn: &Connection, id: i64) -> DbResult<Option<ChromatographyMethod>> {
    let method = conn
        .query_row(
            "SELECT id, name, description FROM chromatography_method WHERE id = ?1",
            [id],
            method_from_row,
        )
        .optional()?;
    Ok(method)
}

/// Get a method by name
pub fn get_method_by_name(
    conn: &Connection,
    name: &str,
) -> DbResult<Option<ChromatographyMethod>> {
    let method = conn
        .query_row(
            "SELECT id, name, description FROM chromatography_method WHERE name = ?1",
            [name],
            method_from_row,
        )
        .optional()?;
    Ok(method)
}

/// List all methods
pub fn list_methods(conn: &Connection) -> DbResult<Vec<ChromatographyMethod>> {
    let mut stmt =
        conn.prepare("SELECT id, name, description FROM chromatography_method ORDER BY id")?;
    let methods = stmt
        .query_map([], method_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(methods)
}

/// Standard runs of a method with their retention time counts
pub fn list_standard_runs_for_method(
    conn: &Connection,
    method_id: i64,
) -> DbResult<Vec<StandardRunSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, COUNT(rt.id)
         FROM standard_run sr
         LEFT JOIN retention_time rt ON rt.standard_run_id = sr.id
         WHERE sr.chromatography_method_id = ?1
         GROUP BY sr.id
         ORDER BY sr.date, sr.id",
        STANDARD_RUN_COLUMNS
    ))?;

    let runs = stmt
        .query_map([method_id], |row| {
            Ok(StandardRunSummary {
                run: standard_run_from_row(row, 0)?,
                retention_time_count: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

// ==================== STANDARD RUN QUERIES ====================

/// Create a new standard run
pub fn create_standard_run(conn: &Connection, run: &NewStandardRun) -> DbResult<StandardRun> {
    conn.execute(
        "INSERT INTO standard_run (date, operator, raw_data_file, chromatography_method_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            run.date,
            run.operator,
            run.raw_data_file,
            run.chromatography_method_id,
        ],
    )?;

    Ok(StandardRun {
        id: conn.last_insert_rowid(),
        date: run.date,
        operator: run.operator.clone(),
        raw_data_file: run.raw_data_file.clone(),
        chromatography_method_id: run.chromatography_method_id,
    })
}

/// Get a standard run by ID
pub fn get_standard_run(conn: &Connection, id: i64) -> DbResult<Option<StandardRun>> {
    let run = conn
        .query_row(
            &format!("SELECT {} FROM standard_run sr WHERE sr.id = ?1", STANDARD_RUN_COLUMNS),
            [id],
            |row| standard_run_from_row(row, 0),
        )
        .optional()?;
    Ok(run)
}

/// Find the run recorded by `operator` at `date`
pub fn find_standard_run(
    conn: &Connection,
    date: &chrono::DateTime<chrono::Utc>,
    operator: &str,
) -> DbResult<Option<StandardRun>> {
    let run = conn
        .query_row(
            &format!(
                "SELECT {} FROM standard_run sr WHERE sr.date = ?1 AND sr.operator = ?2",
                STANDARD_RUN_COLUMNS
            ),
            params![date, operator],
            |row| standard_run_from_row(row, 0),
        )
        .optional()?;
    Ok(run)
}

/// List all standard runs, oldest first
pub fn list_standard_runs(conn: &Connection) -> DbResult<Vec<StandardRunSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, COUNT(rt.id)
         FROM standard_run sr
         LEFT JOIN retention_time rt ON rt.standard_run_id = sr.id
         GROUP BY sr.id
         ORDER BY sr.date, sr.id",
        STANDARD_RUN_COLUMNS
    ))?;

    let runs = stmt
        .query_map([], |row| {
            Ok(StandardRunSummary {
                run: standard_run_from_row(row, 0)?,
                retention_time_count: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

/// Retention times recorded in one run, with their compounds
pub fn retention_times_for_run(conn: &Connection, run_id: i64) -> DbResult<Vec<Observation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {}
         FROM retention_time rt
         JOIN compound c ON c.id = rt.compound_id
         WHERE rt.standard_run_id = ?1
         ORDER BY c.id",
        COMPOUND_COLUMNS, RETENTION_TIME_COLUMNS
    ))?;

    let observations = stmt
        .query_map([run_id], |row| {
            Ok(Observation {
                compound: compound_from_row(row, 0)?,
                retention_time: retention_time_from_row(row, COMPOUND_COLUMN_COUNT)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(observations)
}

// ==================== RETENTION TIME QUERIES ====================

/// Record a retention time for a compound in a run
pub fn create_retention_time(
    conn: &Connection,
    compound_id: i64,
    standard_run_id: i64,
    retention_time: Option<f64>,
) -> DbResult<RetentionTime> {
    conn.execute(
        "INSERT INTO retention_time (compound_id, standard_run_id, retention_time)
         VALUES (?1, ?2, ?3)",
        params![compound_id, standard_run_id, retention_time],
    )?;

    Ok(RetentionTime {
        id: conn.last_insert_rowid(),
        compound_id,
        standard_run_id,
        retention_time,
    })
}

/// Find the retention time of a compound in a run
pub fn find_retention_time(
    conn: &Connection,
    compound_id: i64,
    standard_run_id: i64,
) -> DbResult<Option<RetentionTime>> {
    let retention_time = conn
        .query_row(
            &format!(
                "SELECT {} FROM retention_time rt
                 WHERE rt.compound_id = ?1 AND rt.standard_run_id = ?2",
                RETENTION_TIME_COLUMNS
            ),
            [compound_id, standard_run_id],
            |row| retention_time_from_row(row, 0),
        )
        .optional()?;
    Ok(retention_time)
}

/// Update the observed value of a retention time
pub fn update_retention_time(
    conn: &Connection,
    id: i64,
    retention_time: Option<f64>,
) -> DbResult<()> {
    conn.execute(
        "UPDATE retention_time SET retention_time = ?1 WHERE id = ?2",
        params![retention_time, id],
    )?;
    Ok(())
}

// ==================== COMPOUND LIST QUERIES ====================

/// Create a new compound list
pub fn create_compound_list(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
) -> DbResult<CompoundList> {
    conn.execute(
        "INSERT INTO compound_list (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;

    Ok(CompoundList {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.map(str::to_string),
    })
}

/// Get a compound list by ID
pub fn get_compound_list(conn: &Connection, id: i64) -> DbResult<Option<CompoundList>> {
    let list = conn
        .query_row(
            "SELECT id, name, description FROM compound_list WHERE id = ?1",
            [id],
            compound_list_from_row,
        )
        .optional()?;
    Ok(list)
}

/// Get a compound list by name
pub fn get_compound_list_by_name(conn: &Connection, name: &str) -> DbResult<Option<CompoundList>> {
    let list = conn
        .query_row(
            "SELECT id, name, description FROM compound_list WHERE name = ?1",
            [name],
            compound_list_from_row,
        )
        .optional()?;
    Ok(list)
}

/// List all compound lists with member counts
pub fn list_compound_lists(conn: &Connection) -> DbResult<Vec<CompoundListSummary>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.name, l.description, COUNT(m.compound_id)
         FROM compound_list l
         LEFT JOIN compound_list_compound m ON m.compound_list_id = l.id
         GROUP BY l.id
         ORDER BY l.id",
    )?;

    let lists = stmt
        .query_map([], |row| {
            Ok(CompoundListSummary {
                list: compound_list_from_row(row)?,
                compound_count: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(lists)
}

/// Members of a compound list in compound order
pub fn compound_list_members(conn: &Connection, list_id: i64) -> DbResult<Vec<Compound>> {
    query_compounds(
        conn,
        &format!(
            "SELECT {} FROM compound c
             JOIN compound_list_compound m ON m.compound_id = c.id
             WHERE m.compound_list_id = ?1
             ORDER BY c.id",
            COMPOUND_COLUMNS
        ),
        [list_id],
    )
}

/// Add a compound to a list. Returns false when it was already a member.
pub fn add_compound_to_list(conn: &Connection, list_id: i64, compound_id: i64) -> DbResult<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO compound_list_compound (compound_list_id, compound_id)
         VALUES (?1, ?2)",
        [list_id, compound_id],
    )?;
    Ok(inserted > 0)
}

// ==================== EXTERNAL DATABASE QUERIES ====================

/// Register an external database
pub fn create_external_database(
    conn: &Connection,
    name: &str,
    url: Option<&str>,
    compound_url: Option<&str>,
) -> DbResult<ExternalDatabase> {
    conn.execute(
        "INSERT INTO external_database (name, url, compound_url) VALUES (?1, ?2, ?3)",
        params![name, url, compound_url],
    )?;

    Ok(ExternalDatabase {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        url: url.map(str::to_string),
        compound_url: compound_url.map(str::to_string),
    })
}

/// Get an external database by name
pub fn get_external_database_by_name(
    conn: &Connection,
    name: &str,
) -> DbResult<Option<ExternalDatabase>> {
    let database = conn
        .query_row(
            "SELECT id, name, url, compound_url FROM external_database WHERE name = ?1",
            [name],
            external_database_from_row,
        )
        .optional()?;
    Ok(database)
}

/// List all external databases
pub fn list_external_databases(conn: &Connection) -> DbResult<Vec<ExternalDatabase>> {
    let mut stmt =
        conn.prepare("SELECT id, name, url, compound_url FROM external_database ORDER BY id")?;
    let databases = stmt
        .query_map([], external_database_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(databases)
}

/// Cross-reference a compound to an identifier in an external database
pub fn add_db_xref(
    conn: &Connection,
    compound_id: i64,
    external_database_id: i64,
    external_compound_id: &str,
) -> DbResult<DbXref> {
    conn.execute(
        "INSERT INTO dbxref (compound_id, external_database_id, external_compound_id)
         VALUES (?1, ?2, ?3)",
        params![compound_id, external_database_id, external_compound_id],
    )?;

    Ok(DbXref {
        compound_id,
        external_database_id,
        external_compound_id: external_compound_id.to_string(),
    })
}

/// Cross-references of a compound with resolved links
pub fn compound_xrefs(conn: &Connection, compound_id: i64) -> DbResult<Vec<XrefLink>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.name, d.url, d.compound_url, x.external_compound_id
         FROM dbxref x
         JOIN external_database d ON d.id = x.external_database_id
         WHERE x.compound_id = ?1
         ORDER BY d.name",
    )?;

    let xrefs = stmt
        .query_map([compound_id], |row| {
            let database = external_database_from_row(row)?;
            let external_compound_id: String = row.get(4)?;
            Ok(XrefLink {
                url: database.compound_link(&external_compound_id),
                database_name: database.name,
                external_compound_id,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(xrefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::{DbConnection, DbError};
    use chrono::TimeZone;

    fn run_date(day: u32) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2019, 3, day, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_create_and_get_compound() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let new = NewCompound::new("aconitate", "C6H6O6", Some("TCA cycle".to_string())).unwrap();
        let created = create_compound(&conn, &new).unwrap();

        let fetched = get_compound(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.notes.as_deref(), Some("TCA cycle"));

        assert_eq!(get_compound_by_name(&conn, "aconitate").unwrap(), Some(created.clone()));
        assert_eq!(
            find_compound_by_standardized_name(&conn, " Aconitate ").unwrap(),
            Some(created)
        );
        assert!(get_compound(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_standardized_name_rejected() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        create_compound(&conn, &NewCompound::new("Cis Aconitate", "C6H6O6", None).unwrap())
            .unwrap();
        let err = create_compound(
            &conn,
            &NewCompound::new("cis-aconitate", "C6H6O6", None).unwrap(),
        )
        .unwrap_err();

        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(count_compounds(&conn).unwrap(), 1);
    }

    #[test]
    fn test_find_compounds_by_formula() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let citrate = create_compound(&conn, &NewCompound::new("citrate", "C6H8O7", None).unwrap())
            .unwrap();
        let isocitrate =
            create_compound(&conn, &NewCompound::new("isocitrate", "C6H8O7", None).unwrap())
                .unwrap();
        create_compound(&conn, &NewCompound::new("malate", "C4H6O5", None).unwrap()).unwrap();

        let found = find_compounds_by_formula(&conn, "C6H8O7").unwrap();
        assert_eq!(found, vec![citrate, isocitrate]);
        assert_eq!(list_compounds(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_method_and_runs() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let method = create_method(&conn, "HILIC", Some("Hydrophilic interaction")).unwrap();
        assert_eq!(get_method_by_name(&conn, "HILIC").unwrap(), Some(method.clone()));

        let run = create_standard_run(
            &conn,
            &NewStandardRun {
                date: run_date(7),
                operator: "Lance".to_string(),
                raw_data_file: Some("runs/2019-03-07.raw".to_string()),
                chromatography_method_id: method.id,
            },
        )
        .unwrap();

        let fetched = get_standard_run(&conn, run.id).unwrap().unwrap();
        assert_eq!(fetched, run);
        assert_eq!(find_standard_run(&conn, &run_date(7), "Lance").unwrap(), Some(run.clone()));
        assert!(find_standard_run(&conn, &run_date(8), "Lance").unwrap().is_none());

        let compound = create_compound(&conn, &NewCompound::new("aconitate", "C6H6O6", None).unwrap())
            .unwrap();
        create_retention_time(&conn, compound.id, run.id, Some(5.25)).unwrap();

        let summaries = list_standard_runs_for_method(&conn, method.id).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].retention_time_count, 1);
        assert_eq!(list_standard_runs(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_retention_time_unique_per_run() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let method = create_method(&conn, "RP", None).unwrap();
        let run = create_standard_run(
            &conn,
            &NewStandardRun {
                date: run_date(7),
                operator: "Lance".to_string(),
                raw_data_file: None,
                chromatography_method_id: method.id,
            },
        )
        .unwrap();
        let compound = create_compound(&conn, &NewCompound::new("aconitate", "C6H6O6", None).unwrap())
            .unwrap();

        let rt = create_retention_time(&conn, compound.id, run.id, None).unwrap();
        let err = create_retention_time(&conn, compound.id, run.id, Some(1.0)).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        update_retention_time(&conn, rt.id, Some(4.5)).unwrap();
        let updated = find_retention_time(&conn, compound.id, run.id).unwrap().unwrap();
        assert_eq!(updated.retention_time, Some(4.5));

        let observations = retention_times_for_run(&conn, run.id).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].compound, compound);

        let history = compound_retention_times(&conn, compound.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].method_name, "RP");
        assert_eq!(history[0].standard_run, run);
    }

    #[test]
    fn test_compound_list_membership() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let list = create_compound_list(&conn, "TCA", Some("TCA cycle intermediates")).unwrap();
        let compound = create_compound(&conn, &NewCompound::new("aconitate", "C6H6O6", None).unwrap())
            .unwrap();

        assert!(add_compound_to_list(&conn, list.id, compound.id).unwrap());
        assert!(!add_compound_to_list(&conn, list.id, compound.id).unwrap());

        assert_eq!(compound_list_members(&conn, list.id).unwrap(), vec![compound]);
        let summaries = list_compound_lists(&conn).unwrap();
        assert_eq!(summaries[0].compound_count, 1);
        assert_eq!(get_compound_list_by_name(&conn, "TCA").unwrap(), Some(list.clone()));
        assert_eq!(get_compound_list(&conn, list.id).unwrap(), Some(list));
    }

    #[test]
    fn test_xrefs() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();

        let compound = create_compound(&conn, &NewCompound::new("aconitate", "C6H6O6", None).unwrap())
            .unwrap();
        let kegg = create_external_database(
            &conn,
            "KEGG",
            Some("https://www.kegg.jp"),
            Some("https://www.kegg.jp/entry/{}"),
        )
        .unwrap();
        add_db_xref(&conn, compound.id, kegg.id, "C00417").unwrap();

        let xrefs = compound_xrefs(&conn, compound.id).unwrap();
        assert_eq!(
            xrefs,
            vec![XrefLink {
                database_name: "KEGG".to_string(),
                external_compound_id: "C00417".to_string(),
                url: Some("https://www.kegg.jp/entry/C00417".to_string()),
            }]
        );
        assert_eq!(get_external_database_by_name(&conn, "KEGG").unwrap(), Some(kegg));
        assert_eq!(list_external_databases(&conn).unwrap().len(), 1);
    }
}
