//! Note CRUD handlers.
//!
//! These are the downstream consumers of the resolved principal: a missing
//! principal is 401 (the extractor rejects), a present-but-mismatched owner
//! is 403. Create and update publish the changed note to the broadcast hub;
//! delete does not.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use crate::api::AppState;
use crate::auth::Principal;
use crate::model::{Note, NoteDraft, NoteUpdate};

pub async fn list_notes(principal: Principal, State(state): State<AppState>) -> Json<Vec<Note>> {
    Json(state.store.list_for_author(principal.subject()).await)
}

pub async fn create_note(
    principal: Principal,
    State(state): State<AppState>,
    Json(draft): Json<NoteDraft>,
) -> (StatusCode, Json<Note>) {
    let note = state
        .store
        .create(principal.subject().clone(), draft)
        .await;

    state.hub.publish(&note).await;

    (StatusCode::CREATED, Json(note))
}

pub async fn get_note(
    principal: Principal,
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Note>, StatusCode> {
    let note = state.store.get(id).await.ok_or(StatusCode::NOT_FOUND)?;

    if &note.author != principal.subject() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(Json(note))
}

pub async fn update_note(
    principal: Principal,
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(update): Json<NoteUpdate>,
) -> Result<Json<Note>, StatusCode> {
    let existing = state.store.get(id).await.ok_or(StatusCode::NOT_FOUND)?;
    if &existing.author != principal.subject() {
        return Err(StatusCode::FORBIDDEN);
    }

    let note = state
        .store
        .update(id, update)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    state.hub.publish(&note).await;

    Ok(Json(note))
}

pub async fn delete_note(
    principal: Principal,
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    let existing = state.store.get(id).await.ok_or(StatusCode::NOT_FOUND)?;
    if &existing.author != principal.subject() {
        return Err(StatusCode::FORBIDDEN);
    }

    state.store.delete(id).await;

    Ok(StatusCode::NO_CONTENT)
}
