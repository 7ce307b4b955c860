//! CRUD and computed endpoints for medications.
//!
//! Routes:
//! - `GET    /medications`                     — list all
//! - `POST   /medications`                     — create
//! - `GET    /medications/:id`                 — retrieve
//! - `PUT    /medications/:id`                 — full update
//! - `PATCH  /medications/:id`                 — partial update
//! - `DELETE /medications/:id`                 — delete (cascades logs + notes)
//! - `GET    /medications/:id/expected-doses`  — schedule arithmetic
//! - `GET    /medications/:id/adherence`       — adherence rate (overall or windowed)
//! - `GET    /medications/:id/external-info`   — OpenFDA drug label
//! - `GET    /medications/:id/dose-logs`       — that medication's logs
//! - `GET    /medications/:id/notes`           — that medication's notes

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::adherence;
use crate::cache::KeyedTtlCache;
use crate::error::{ApiError, FieldErrors};
use crate::metrics::AppMetrics;
use crate::repository::{DoseLog, Medication, MedicationRepository, NewMedication, Note};
use crate::services::openfda::{DrugInfo, DrugInfoProvider};

use super::validate;

/// Shared state for the medications routes.
pub type MedicationsState = Arc<MedicationsApiState>;

pub struct MedicationsApiState {
    pub repo: Arc<MedicationRepository>,
    pub drug_info: Arc<dyn DrugInfoProvider + Send + Sync>,
    pub drug_info_cache: Arc<Mutex<KeyedTtlCache<DrugInfo>>>,
    pub metrics: Arc<AppMetrics>,
}

pub fn create_medications_router(state: MedicationsState) -> Router {
    Router::new()
        .route("/medications", get(list_medications).post(create_medication))
        .route(
            "/medications/:id",
            get(get_medication)
                .put(update_medication)
                .patch(patch_medication)
                .delete(delete_medication),
        )
        .route("/medications/:id/expected-doses", get(expected_doses))
        .route("/medications/:id/adherence", get(adherence_rate))
        .route("/medications/:id/external-info", get(external_info))
        .route("/medications/:id/dose-logs", get(medication_dose_logs))
        .route("/medications/:id/notes", get(medication_notes))
        .with_state(state)
}

// ---- Validation ----

fn parse_medication_body(body: &Value) -> Result<NewMedication, ApiError> {
    let mut errors = FieldErrors::new();
    let name = validate::require_string(body, "name", &mut errors);
    let dosage_mg = validate::require_positive_int(body, "dosage_mg", &mut errors);
    let prescribed_per_day = validate::require_positive_int(body, "prescribed_per_day", &mut errors);

    match (name, dosage_mg, prescribed_per_day) {
        (Some(name), Some(dosage_mg), Some(prescribed_per_day)) => Ok(NewMedication {
            name,
            dosage_mg,
            prescribed_per_day,
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Merge a partial update onto the current row; only fields present in
/// the body are validated and replaced.
fn apply_medication_patch(current: &Medication, body: &Value) -> Result<NewMedication, ApiError> {
    let mut errors = FieldErrors::new();

    let name = if body.get("name").is_some() {
        validate::require_string(body, "name", &mut errors)
    } else {
        Some(current.name.clone())
    };
    let dosage_mg = if body.get("dosage_mg").is_some() {
        validate::require_positive_int(body, "dosage_mg", &mut errors)
    } else {
        Some(current.dosage_mg)
    };
    let prescribed_per_day = if body.get("prescribed_per_day").is_some() {
        validate::require_positive_int(body, "prescribed_per_day", &mut errors)
    } else {
        Some(current.prescribed_per_day)
    };

    match (name, dosage_mg, prescribed_per_day) {
        (Some(name), Some(dosage_mg), Some(prescribed_per_day)) => Ok(NewMedication {
            name,
            dosage_mg,
            prescribed_per_day,
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

async fn fetch_medication(state: &MedicationsState, id: i64) -> Result<Medication, ApiError> {
    state
        .repo
        .get_medication(id)
        .await?
        .ok_or(ApiError::NotFound("Medication"))
}

// ---- CRUD handlers ----

async fn list_medications(
    State(state): State<MedicationsState>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    Ok(Json(state.repo.list_medications().await?))
}

async fn create_medication(
    State(state): State<MedicationsState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let new = parse_medication_body(&body)?;
    let id = state.repo.insert_medication(&new).await?;
    let med = fetch_medication(&state, id).await?;
    Ok((StatusCode::CREATED, Json(med)))
}

async fn get_medication(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
) -> Result<Json<Medication>, ApiError> {
    Ok(Json(fetch_medication(&state, id).await?))
}

async fn update_medication(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Medication>, ApiError> {
    let new = parse_medication_body(&body)?;
    if !state.repo.update_medication(id, &new).await? {
        return Err(ApiError::NotFound("Medication"));
    }
    Ok(Json(fetch_medication(&state, id).await?))
}

async fn patch_medication(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Medication>, ApiError> {
    let current = fetch_medication(&state, id).await?;
    let new = apply_medication_patch(&current, &body)?;
    state.repo.update_medication(id, &new).await?;
    Ok(Json(fetch_medication(&state, id).await?))
}

async fn delete_medication(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_medication(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Medication"))
    }
}

// ---- Computed endpoints ----

#[derive(Debug, Deserialize)]
struct ExpectedDosesQuery {
    days: Option<String>,
}

/// `GET /medications/:id/expected-doses?days=N`
async fn expected_doses(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
    Query(params): Query<ExpectedDosesQuery>,
) -> Result<Json<Value>, ApiError> {
    let med = fetch_medication(&state, id).await?;

    let raw = params
        .days
        .ok_or_else(|| ApiError::bad_request("days query parameter is required"))?;
    let days: i64 = raw
        .parse()
        .map_err(|_| ApiError::bad_request("days must be an integer"))?;

    let expected = adherence::expected_doses(med.prescribed_per_day, days)?;
    Ok(Json(json!({
        "medication_id": med.id,
        "days": days,
        "expected_doses": expected,
    })))
}

#[derive(Debug, Deserialize)]
struct AdherenceQuery {
    start: Option<String>,
    end: Option<String>,
}

/// `GET /medications/:id/adherence[?start=&end=]`
///
/// Without parameters: adherence over all of the medication's logs.
/// With both `start` and `end` (`YYYY-MM-DD`): adherence against the
/// prescription schedule over the inclusive date window.
async fn adherence_rate(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
    Query(params): Query<AdherenceQuery>,
) -> Result<Json<Value>, ApiError> {
    let med = fetch_medication(&state, id).await?;
    let logs = state.repo.list_dose_logs_for_medication(id).await?;

    match (params.start, params.end) {
        (None, None) => Ok(Json(json!({
            "medication_id": med.id,
            "adherence_rate": adherence::adherence_rate(&logs),
        }))),
        (Some(start_raw), Some(end_raw)) => {
            let start = validate::parse_date(&start_raw)?;
            let end = validate::parse_date(&end_raw)?;
            let rate =
                adherence::adherence_rate_over_period(med.prescribed_per_day, start, end, &logs)?;
            Ok(Json(json!({
                "medication_id": med.id,
                "start": start_raw,
                "end": end_raw,
                "adherence_rate": rate,
            })))
        }
        _ => Err(ApiError::bad_request(
            "start and end must be provided together",
        )),
    }
}

/// `GET /medications/:id/external-info`
///
/// Lookup failures come back as a structured 502 payload; they are never
/// allowed to surface as a handler fault. Successes are cached per name.
async fn external_info(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
) -> Result<Json<DrugInfo>, ApiError> {
    let med = fetch_medication(&state, id).await?;

    if let Some(cached) = state.drug_info_cache.lock().await.get(&med.name) {
        return Ok(Json(cached));
    }

    state.metrics.drug_info_lookups_total.inc();
    let info = match state.drug_info.get_drug_info(&med.name).await {
        Ok(info) => info,
        Err(err) => {
            state.metrics.drug_info_lookup_errors_total.inc();
            tracing::warn!("drug-info lookup failed for '{}': {}", med.name, err);
            return Err(err);
        }
    };

    state
        .drug_info_cache
        .lock()
        .await
        .insert(med.name.clone(), info.clone());
    Ok(Json(info))
}

// ---- Nested listings ----

async fn medication_dose_logs(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DoseLog>>, ApiError> {
    fetch_medication(&state, id).await?;
    Ok(Json(state.repo.list_dose_logs_for_medication(id).await?))
}

async fn medication_notes(
    State(state): State<MedicationsState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Note>>, ApiError> {
    fetch_medication(&state, id).await?;
    Ok(Json(state.repo.list_notes_for_medication(id).await?))
}
