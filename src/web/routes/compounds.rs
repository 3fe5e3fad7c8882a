//! Compound endpoints and the m/z calculator.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::chem::{Formula, IonMode};
use crate::state::{queries, Compound, DbError, NewCompound};
use crate::web::error::AppError;
use crate::web::json::{CompoundDetail, CreateCompoundRequest, ModeQuery, MzQuery, MzResponse};
use crate::web::AppState;

/// Compound routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/compounds", get(list_compounds).post(create_compound))
        .route("/compounds/:id", get(get_compound))
        .route("/compounds/:id/mz", get(compound_mz))
        .route("/mz", get(formula_mz))
}

fn parse_mode(mode: Option<&str>) -> Result<IonMode, AppError> {
    let mode = mode.ok_or_else(|| AppError::BadRequest("mode is required".to_string()))?;
    Ok(mode.parse::<IonMode>()?)
}

fn mz_response(formula: &Formula, mode: IonMode) -> MzResponse {
    MzResponse {
        formula: formula.to_string(),
        monoisotopic_mass: formula.monoisotopic_mass(),
        mode: mode.charge(),
        adduct: mode.label(),
        m_z: formula.m_z(mode),
    }
}

async fn list_compounds(State(state): State<AppState>) -> Result<Json<Vec<Compound>>, AppError> {
    let compounds = state.run(|conn| Ok(queries::list_compounds(conn)?)).await?;
    Ok(Json(compounds))
}

async fn create_compound(
    State(state): State<AppState>,
    Json(request): Json<CreateCompoundRequest>,
) -> Result<(StatusCode, Json<Compound>), AppError> {
    let new = NewCompound::new(&request.name, &request.molecular_formula, request.notes)?;
    let compound = state
        .run(move |conn| Ok(queries::create_compound(conn, &new)?))
        .await?;

    log::info!("Created compound {} ({})", compound.name, compound.id);
    Ok((StatusCode::CREATED, Json(compound)))
}

async fn get_compound(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CompoundDetail>, AppError> {
    let detail = state
        .run(move |conn| {
            let compound = queries::get_compound(conn, id)?
                .ok_or_else(|| DbError::not_found("compound", id))?;
            let xrefs = queries::compound_xrefs(conn, id)?;
            let retention_times = queries::compound_retention_times(conn, id)?;

            Ok(CompoundDetail {
                monoisotopic_mass: compound.monoisotopic_mass(),
                m_z_negative: compound.m_z(IonMode::NEGATIVE),
                m_z_positive: compound.m_z(IonMode::POSITIVE),
                compound,
                xrefs,
                retention_times,
            })
        })
        .await?;

    Ok(Json(detail))
}

async fn compound_mz(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ModeQuery>,
) -> Result<Json<MzResponse>, AppError> {
    let mode = parse_mode(query.mode.as_deref())?;
    let compound = state
        .run(move |conn| {
            Ok(queries::get_compound(conn, id)?
                .ok_or_else(|| DbError::not_found("compound", id))?)
        })
        .await?;

    Ok(Json(mz_response(&compound.molecular_formula, mode)))
}

async fn formula_mz(Query(query): Query<MzQuery>) -> Result<Json<MzResponse>, AppError> {
    let formula = Formula::parse(&query.formula)?;
    let mode = parse_mode(query.mode.as_deref())?;
    Ok(Json(mz_response(&formula, mode)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::state::{get_or_create, queries, ExternalDatabaseDefaults, ExternalDatabase};
    use crate::web::test_support::{app, get_json, post_json, send};

    #[tokio::test]
    async fn test_create_and_fetch_compound() {
        let (app, db) = app();

        let request = post_json(
            "/compounds",
            json!({"name": "aconitate", "molecular_formula": "C6H6O6"}),
        );
        let (status, body, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["standardized_name"], "aconitate");

        {
            let conn = db.lock();
            let (kegg, _) = get_or_create::<ExternalDatabase>(
                &conn,
                "KEGG",
                &ExternalDatabaseDefaults {
                    url: None,
                    compound_url: Some("https://www.kegg.jp/entry/{}".to_string()),
                },
            )
            .unwrap();
            queries::add_db_xref(&conn, id, kegg.id, "C00417").unwrap();
        }

        let (status, detail) = get_json(&app, &format!("/compounds/{}", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["name"], "aconitate");
        assert!((detail["monoisotopic_mass"].as_f64().unwrap() - 174.01643792604).abs() < 1e-9);
        assert!((detail["m_z_negative"].as_f64().unwrap() - 173.00916147370944).abs() < 1e-9);
        assert_eq!(detail["xrefs"][0]["url"], "https://www.kegg.jp/entry/C00417");

        let (status, list) = get_json(&app, "/compounds").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_formula_rejected() {
        let (app, _db) = app();

        let request = post_json(
            "/compounds",
            json!({"name": "Invalid compound", "molecular_formula": "C6Z6O6"}),
        );
        let (status, body, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (app, _db) = app();

        let first = post_json(
            "/compounds",
            json!({"name": "Cis Aconitate", "molecular_formula": "C6H6O6"}),
        );
        assert_eq!(send(&app, first).await.0, StatusCode::CREATED);

        let second = post_json(
            "/compounds",
            json!({"name": "cis-aconitate", "molecular_formula": "C6H6O6"}),
        );
        assert_eq!(send(&app, second).await.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_missing_compound_is_404() {
        let (app, _db) = app();
        let (status, body) = get_json(&app, "/compounds/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let request = Request::get("/compounds/42/mz?mode=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mz_calculator() {
        let (app, _db) = app();

        let (status, body) = get_json(&app, "/mz?formula=C6H6O6&mode=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!((body["m_z"].as_f64().unwrap() - 175.02371437837056).abs() < 1e-9);
        assert_eq!(body["adduct"], "[M+H]+");

        let (status, _) = get_json(&app, "/mz?formula=C6H6O6&mode=0.5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&app, "/mz?formula=C6Z6O6&mode=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(&app, "/mz?formula=C6H6O6").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
