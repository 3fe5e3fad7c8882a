// Retention time aggregation
// Per-compound means for one chromatography method, optionally narrowed to a run subset
// and a compound list
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::db::DbResult;
use super::models::{ChromatographyMethod, CompoundMean, Observation};
use super::queries::{
    compound_from_row, retention_time_from_row, COMPOUND_COLUMNS, COMPOUND_COLUMN_COUNT,
};

/// SQL fragment restricting `sr` to the given runs, pushing their ids onto `params`.
/// An empty subset matches nothing.
fn run_filter(standard_runs: Option<&[i64]>, params: &mut Vec<Value>) -> String {
    match standard_runs {
        None => String::new(),
        Some([]) => " AND 0".to_string(),
        Some(ids) => {
            params.extend(ids.iter().map(|&id| Value::Integer(id)));
            let placeholders = vec!["?"; ids.len()].join(", ");
            format!(" AND sr.id IN ({})", placeholders)
        }
    }
}

/// Mean retention time of every qualifying compound under `method`.
///
/// Qualifying compounds are all compounds, or the members of `compound_list` when one
/// is given. Every qualifying compound appears exactly once, ordered by id; its mean is
/// `None` when no retention time of a matching run is recorded. With `standard_runs`
/// only those runs count, and runs of other methods never count.
pub fn retention_time_means(
    conn: &Connection,
    method: &ChromatographyMethod,
    standard_runs: Option<&[i64]>,
    compound_list: Option<i64>,
) -> DbResult<Vec<CompoundMean>> {
    let mut params: Vec<Value> = Vec::new();
    let mut sql = format!("SELECT {}, AVG(obs.retention_time) FROM compound c", COMPOUND_COLUMNS);

    if let Some(list_id) = compound_list {
        sql.push_str(
            " JOIN compound_list_compound m ON m.compound_id = c.id AND m.compound_list_id = ?",
        );
        params.push(Value::Integer(list_id));
    }

    sql.push_str(
        " LEFT JOIN (
            SELECT rt.compound_id, rt.retention_time
            FROM retention_time rt
            JOIN standard_run sr ON sr.id = rt.standard_run_id
            WHERE sr.chromatography_method_id = ?",
    );
    params.push(Value::Integer(method.id));
    sql.push_str(&run_filter(standard_runs, &mut params));
    sql.push_str(") obs ON obs.compound_id = c.id GROUP BY c.id ORDER BY c.id");

    let mut stmt = conn.prepare(&sql)?;
    let means = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(CompoundMean {
                compound: compound_from_row(row, 0)?,
                mean_retention_time: row.get(COMPOUND_COLUMN_COUNT)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Computed {} retention time means for method {}",
        means.len(),
        method.name
    );
    Ok(means)
}

/// Every recorded (non-null) retention time under `method`, one row per observation,
/// ordered by compound id then run id
pub fn compounds_with_retention_times(
    conn: &Connection,
    method: &ChromatographyMethod,
    standard_runs: Option<&[i64]>,
) -> DbResult<Vec<Observation>> {
    let mut params: Vec<Value> = vec![Value::Integer(method.id)];
    let mut sql = format!(
        "SELECT {}, rt.id, rt.compound_id, rt.standard_run_id, rt.retention_time
         FROM compound c
         JOIN retention_time rt ON rt.compound_id = c.id
         JOIN standard_run sr ON sr.id = rt.standard_run_id
         WHERE sr.chromatography_method_id = ? AND rt.retention_time IS NOT NULL",
        COMPOUND_COLUMNS
    );
    sql.push_str(&run_filter(standard_runs, &mut params));
    sql.push_str(" ORDER BY c.id, sr.id");

    let mut stmt = conn.prepare(&sql)?;
    let observations = stmt
        .query_map(params_from_iter(params), |row| {
            Ok(Observation {
                compound: compound_from_row(row, 0)?,
                retention_time: retention_time_from_row(row, COMPOUND_COLUMN_COUNT)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::db::DbConnection;
    use crate::state::models::{Compound, NewCompound, NewStandardRun, StandardRun};
    use crate::state::queries::*;
    use chrono::{TimeZone, Utc};

    struct Fixture {
        method: ChromatographyMethod,
        other_method: ChromatographyMethod,
        run1: StandardRun,
        run2: StandardRun,
        aconitate: Compound,
        citrate: Compound,
        malate: Compound,
    }

    fn run(conn: &Connection, method_id: i64, day: u32) -> StandardRun {
        create_standard_run(
            conn,
            &NewStandardRun {
                date: Utc.with_ymd_and_hms(2019, 3, day, 9, 0, 0).unwrap(),
                operator: "Lance".to_string(),
                raw_data_file: None,
                chromatography_method_id: method_id,
            },
        )
        .unwrap()
    }

    fn compound(conn: &Connection, name: &str, formula: &str) -> Compound {
        create_compound(conn, &NewCompound::new(name, formula, None).unwrap()).unwrap()
    }

    fn fixture(conn: &Connection) -> Fixture {
        let method = create_method(conn, "HILIC", None).unwrap();
        let other_method = create_method(conn, "RP", None).unwrap();
        let run1 = run(conn, method.id, 1);
        let run2 = run(conn, method.id, 2);
        let other_run = run(conn, other_method.id, 3);

        let aconitate = compound(conn, "aconitate", "C6H6O6");
        let citrate = compound(conn, "citrate", "C6H8O7");
        let malate = compound(conn, "malate", "C4H6O5");

        create_retention_time(conn, aconitate.id, run1.id, Some(5.0)).unwrap();
        create_retention_time(conn, aconitate.id, run2.id, Some(7.0)).unwrap();
        create_retention_time(conn, aconitate.id, other_run.id, Some(100.0)).unwrap();
        create_retention_time(conn, citrate.id, run2.id, Some(3.0)).unwrap();
        create_retention_time(conn, citrate.id, run1.id, None).unwrap();
        create_retention_time(conn, malate.id, other_run.id, Some(2.0)).unwrap();

        Fixture {
            method,
            other_method,
            run1,
            run2,
            aconitate,
            citrate,
            malate,
        }
    }

    fn mean_of(means: &[CompoundMean], compound: &Compound) -> Option<f64> {
        means
            .iter()
            .find(|m| m.compound.id == compound.id)
            .and_then(|m| m.mean_retention_time)
    }

    #[test]
    fn test_mean_without_run_filter() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        let means = retention_time_means(&conn, &f.method, None, None).unwrap();
        let ids: Vec<i64> = means.iter().map(|m| m.compound.id).collect();
        assert_eq!(ids, vec![f.aconitate.id, f.citrate.id, f.malate.id]);

        assert_eq!(mean_of(&means, &f.aconitate), Some(6.0));
        // Null retention times are ignored by the average
        assert_eq!(mean_of(&means, &f.citrate), Some(3.0));
        // Malate was only measured under the other method
        assert_eq!(mean_of(&means, &f.malate), None);
    }

    #[test]
    fn test_mean_with_run_filter() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        let means = retention_time_means(&conn, &f.method, Some(&[f.run1.id]), None).unwrap();
        assert_eq!(means.len(), 3);
        assert_eq!(mean_of(&means, &f.aconitate), Some(5.0));
        assert_eq!(mean_of(&means, &f.citrate), None);

        let both = retention_time_means(&conn, &f.method, Some(&[f.run1.id, f.run2.id]), None)
            .unwrap();
        assert_eq!(mean_of(&both, &f.aconitate), Some(6.0));
    }

    #[test]
    fn test_empty_run_filter_matches_nothing() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        let means = retention_time_means(&conn, &f.method, Some(&[]), None).unwrap();
        assert_eq!(means.len(), 3);
        assert!(means.iter().all(|m| m.mean_retention_time.is_none()));
    }

    #[test]
    fn test_runs_of_other_methods_are_ignored() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        // A run of RP passed to a HILIC query contributes nothing
        let other_runs = list_standard_runs_for_method(&conn, f.other_method.id).unwrap();
        let other_ids: Vec<i64> = other_runs.iter().map(|s| s.run.id).collect();
        let means = retention_time_means(&conn, &f.method, Some(other_ids.as_slice()), None).unwrap();
        assert!(means.iter().all(|m| m.mean_retention_time.is_none()));

        let rp = retention_time_means(&conn, &f.other_method, None, None).unwrap();
        assert_eq!(mean_of(&rp, &f.aconitate), Some(100.0));
        assert_eq!(mean_of(&rp, &f.malate), Some(2.0));
    }

    #[test]
    fn test_compound_list_filter_excludes_non_members() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        let list = create_compound_list(&conn, "TCA", None).unwrap();
        add_compound_to_list(&conn, list.id, f.citrate.id).unwrap();
        add_compound_to_list(&conn, list.id, f.malate.id).unwrap();

        let means = retention_time_means(&conn, &f.method, None, Some(list.id)).unwrap();
        let ids: Vec<i64> = means.iter().map(|m| m.compound.id).collect();
        assert_eq!(ids, vec![f.citrate.id, f.malate.id]);
        assert_eq!(mean_of(&means, &f.citrate), Some(3.0));

        let empty = create_compound_list(&conn, "empty", None).unwrap();
        assert!(retention_time_means(&conn, &f.method, None, Some(empty.id))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_observations_inner_join() {
        let db = DbConnection::open_in_memory().unwrap();
        let conn = db.lock();
        let f = fixture(&conn);

        let observations = compounds_with_retention_times(&conn, &f.method, None).unwrap();
        let rows: Vec<(i64, i64, Option<f64>)> = observations
            .iter()
            .map(|o| {
                (
                    o.compound.id,
                    o.retention_time.standard_run_id,
                    o.retention_time.retention_time,
                )
            })
            .collect();

        assert_eq!(
            rows,
            vec![
                (f.aconitate.id, f.run1.id, Some(5.0)),
                (f.aconitate.id, f.run2.id, Some(7.0)),
                (f.citrate.id, f.run2.id, Some(3.0)),
            ]
        );

        let filtered =
            compounds_with_retention_times(&conn, &f.method, Some(&[f.run2.id])).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(compounds_with_retention_times(&conn, &f.method, Some(&[]))
            .unwrap()
            .is_empty());
    }
}
