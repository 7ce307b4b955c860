//! CRUD for clinical notes. Notes are immutable once created: there is
//! deliberately no update handler, and PUT/PATCH answer 405.
//!
//! Routes:
//! - `GET    /notes`      — list all, newest first
//! - `POST   /notes`      — create (`created_at` is server-assigned)
//! - `GET    /notes/:id`  — retrieve
//! - `PUT    /notes/:id`  — 405
//! - `PATCH  /notes/:id`  — 405
//! - `DELETE /notes/:id`  — delete

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::error::{ApiError, FieldErrors};
use crate::repository::{MedicationRepository, NewNote, Note};

use super::validate;

/// Shared state for the notes routes.
pub type NotesState = Arc<MedicationRepository>;

pub fn create_notes_router(repo: NotesState) -> Router {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/:id",
            get(get_note)
                .put(reject_note_update)
                .patch(reject_note_update)
                .delete(delete_note),
        )
        .with_state(repo)
}

fn parse_note_body(body: &Value) -> Result<NewNote, ApiError> {
    let mut errors = FieldErrors::new();
    let medication_id = validate::require_int(body, "medication_id", &mut errors);
    let text = validate::require_string(body, "text", &mut errors);

    match (medication_id, text) {
        (Some(medication_id), Some(text)) => Ok(NewNote {
            medication_id,
            text,
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

async fn list_notes(State(repo): State<NotesState>) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(repo.list_notes().await?))
}

async fn create_note(
    State(repo): State<NotesState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let new = parse_note_body(&body)?;
    if repo.get_medication(new.medication_id).await?.is_none() {
        return Err(ApiError::field("medication_id", "medication does not exist"));
    }

    let id = repo.insert_note(&new).await?;
    let note = repo.get_note(id).await?.ok_or(ApiError::NotFound("Note"))?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
    State(repo): State<NotesState>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
    repo.get_note(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Note"))
}

/// Notes have no update operation.
async fn reject_note_update() -> ApiError {
    ApiError::MethodNotSupported("notes are immutable once created")
}

async fn delete_note(
    State(repo): State<NotesState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if repo.delete_note(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Note"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::db::create_pool;
    use crate::repository::NewMedication;

    async fn make_app() -> (Router, Arc<MedicationRepository>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = Arc::new(MedicationRepository::new(pool));
        (create_notes_router(repo.clone()), repo)
    }

    async fn seed_medication(repo: &MedicationRepository) -> i64 {
        repo.insert_medication(&NewMedication {
            name: "Lisinopril".to_string(),
            dosage_mg: 10,
            prescribed_per_day: 1,
        })
        .await
        .unwrap()
    }

    async fn body_json(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn post_creates_note_with_server_timestamp() {
        let (app, repo) = make_app().await;
        let med_id = seed_medication(&repo).await;

        let resp = app
            .oneshot(json_request(
                Method::POST,
                "/notes",
                format!(r#"{{"medication_id":{},"text":"monitor blood pressure"}}"#, med_id),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp.into_body()).await;
        assert_eq!(json["text"], "monitor blood pressure");
        assert!(json["created_at"].is_string());
    }

    #[tokio::test]
    async fn post_nonexistent_medication_returns_400() {
        let (app, _repo) = make_app().await;
        let resp = app
            .oneshot(json_request(
                Method::POST,
                "/notes",
                r#"{"medication_id":99999,"text":"orphan"}"#.to_string(),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp.into_body()).await;
        assert!(json.get("medication_id").is_some());
    }

    #[tokio::test]
    async fn post_blank_text_returns_400() {
        let (app, repo) = make_app().await;
        let med_id = seed_medication(&repo).await;
        let resp = app
            .oneshot(json_request(
                Method::POST,
                "/notes",
                format!(r#"{{"medication_id":{},"text":"  "}}"#, med_id),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_and_patch_return_405() {
        let (app, repo) = make_app().await;
        let med_id = seed_medication(&repo).await;
        let id = repo
            .insert_note(&NewNote {
                medication_id: med_id,
                text: "original".to_string(),
            })
            .await
            .unwrap();

        for method in [Method::PUT, Method::PATCH] {
            let resp = app
                .clone()
                .oneshot(json_request(
                    method,
                    &format!("/notes/{}", id),
                    r#"{"text":"rewritten"}"#.to_string(),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        }

        // The note itself is untouched.
        let note = repo.get_note(id).await.unwrap().unwrap();
        assert_eq!(note.text, "original");
    }

    #[tokio::test]
    async fn get_and_delete_note() {
        let (app, repo) = make_app().await;
        let med_id = seed_medication(&repo).await;
        let id = repo
            .insert_note(&NewNote {
                medication_id: med_id,
                text: "taken with breakfast".to_string(),
            })
            .await
            .unwrap();

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/notes/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(format!("/notes/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/notes/{}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
