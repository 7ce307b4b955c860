//! CRUD and date filtering for dose logs.
//!
//! Routes:
//! - `GET    /dose-logs`                — list all, newest first
//! - `POST   /dose-logs`                — create
//! - `GET    /dose-logs/filter-by-date` — logs in an inclusive date window
//! - `GET    /dose-logs/:id`            — retrieve
//! - `PUT    /dose-logs/:id`            — full update
//! - `PATCH  /dose-logs/:id`            — partial update
//! - `DELETE /dose-logs/:id`            — delete
//!
//! Creating or moving a log onto a nonexistent medication is a 400
//! validation error on the `medication_id` field, never a server fault.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};
use crate::repository::{DoseLog, MedicationRepository, NewDoseLog};

use super::validate;

/// Shared state for the dose-log routes.
pub type DoseLogsState = Arc<MedicationRepository>;

pub fn create_dose_logs_router(repo: DoseLogsState) -> Router {
    Router::new()
        .route("/dose-logs", get(list_dose_logs).post(create_dose_log))
        .route("/dose-logs/filter-by-date", get(filter_by_date))
        .route(
            "/dose-logs/:id",
            get(get_dose_log)
                .put(update_dose_log)
                .patch(patch_dose_log)
                .delete(delete_dose_log),
        )
        .with_state(repo)
}

// ---- Validation ----

fn parse_dose_log_body(body: &Value) -> Result<NewDoseLog, ApiError> {
    let mut errors = FieldErrors::new();
    let medication_id = validate::require_int(body, "medication_id", &mut errors);
    let taken_at = validate::require_timestamp(body, "taken_at", &mut errors);
    // was_taken defaults to true when absent.
    let was_taken = validate::optional_bool(body, "was_taken", &mut errors).unwrap_or(true);

    match (medication_id, taken_at) {
        (Some(medication_id), Some(taken_at)) if errors.is_empty() => Ok(NewDoseLog {
            medication_id,
            taken_at,
            was_taken,
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

fn apply_dose_log_patch(current: &DoseLog, body: &Value) -> Result<NewDoseLog, ApiError> {
    let mut errors = FieldErrors::new();

    let medication_id = if body.get("medication_id").is_some() {
        validate::require_int(body, "medication_id", &mut errors)
    } else {
        Some(current.medication_id)
    };
    let taken_at = if body.get("taken_at").is_some() {
        validate::require_timestamp(body, "taken_at", &mut errors)
    } else {
        Some(current.taken_at)
    };
    let was_taken =
        validate::optional_bool(body, "was_taken", &mut errors).unwrap_or(current.was_taken);

    match (medication_id, taken_at) {
        (Some(medication_id), Some(taken_at)) if errors.is_empty() => Ok(NewDoseLog {
            medication_id,
            taken_at,
            was_taken,
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

async fn ensure_medication_exists(
    repo: &MedicationRepository,
    medication_id: i64,
) -> Result<(), ApiError> {
    if repo.get_medication(medication_id).await?.is_none() {
        return Err(ApiError::field("medication_id", "medication does not exist"));
    }
    Ok(())
}

// ---- Handlers ----

async fn list_dose_logs(State(repo): State<DoseLogsState>) -> Result<Json<Vec<DoseLog>>, ApiError> {
    Ok(Json(repo.list_dose_logs().await?))
}

async fn create_dose_log(
    State(repo): State<DoseLogsState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<DoseLog>), ApiError> {
    let new = parse_dose_log_body(&body)?;
    ensure_medication_exists(&repo, new.medication_id).await?;

    let id = repo.insert_dose_log(&new).await?;
    let log = repo
        .get_dose_log(id)
        .await?
        .ok_or(ApiError::NotFound("Dose log"))?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn get_dose_log(
    State(repo): State<DoseLogsState>,
    Path(id): Path<i64>,
) -> Result<Json<DoseLog>, ApiError> {
    repo.get_dose_log(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Dose log"))
}

async fn update_dose_log(
    State(repo): State<DoseLogsState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<DoseLog>, ApiError> {
    let new = parse_dose_log_body(&body)?;
    ensure_medication_exists(&repo, new.medication_id).await?;

    if !repo.update_dose_log(id, &new).await? {
        return Err(ApiError::NotFound("Dose log"));
    }
    repo.get_dose_log(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Dose log"))
}

async fn patch_dose_log(
    State(repo): State<DoseLogsState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<DoseLog>, ApiError> {
    let current = repo
        .get_dose_log(id)
        .await?
        .ok_or(ApiError::NotFound("Dose log"))?;
    let new = apply_dose_log_patch(&current, &body)?;
    ensure_medication_exists(&repo, new.medication_id).await?;

    repo.update_dose_log(id, &new).await?;
    repo.get_dose_log(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Dose log"))
}

async fn delete_dose_log(
    State(repo): State<DoseLogsState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo.delete_dose_log(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Dose log"))
    }
}

#[derive(Debug, Deserialize)]
struct DateRangeQuery {
    start: Option<String>,
    end: Option<String>,
}

/// `GET /dose-logs/filter-by-date?start=YYYY-MM-DD&end=YYYY-MM-DD`
async fn filter_by_date(
    State(repo): State<DoseLogsState>,
    Query(params): Query<DateRangeQuery>,
) -> Result<Json<Vec<DoseLog>>, ApiError> {
    let start = params
        .start
        .ok_or_else(|| ApiError::bad_request("start and end query parameters are required"))?;
    let end = params
        .end
        .ok_or_else(|| ApiError::bad_request("start and end query parameters are required"))?;

    let start = validate::parse_date(&start)?;
    let end = validate::parse_date(&end)?;

    Ok(Json(repo.filter_dose_logs_by_date(start, end).await?))
}
