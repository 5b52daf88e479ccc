//! CRUD over stored coaching recommendations. Generation of the
//! recommendations themselves happens outside this service.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::OptionalExtension;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreateCoachNoteInput, UpdateCoachNoteInput, ValidateExt};
use crate::models::CoachNote;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notes).post(create_note))
        .route("/{id}", get(get_note).put(update_note).delete(delete_note))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListNotesQuery {
    user_id: Option<String>,
}

fn note_from_row(row: &rusqlite::Row) -> rusqlite::Result<CoachNote> {
    Ok(CoachNote {
        id: row.get(0)?,
        user_id: row.get(1)?,
        habit_id: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCoachNoteInput>,
) -> ApiResult<Json<CoachNote>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;

    if let Some(habit_id) = &input.habit_id {
        let found: Option<String> = conn
            .query_row("SELECT id FROM habits WHERE id = ?1", [habit_id], |row| {
                row.get(0)
            })
            .optional()?;
        if found.is_none() {
            return Err(ApiError::NotFound("habit"));
        }
    }

    let now = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO coach_notes (id, user_id, habit_id, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (&id, &input.user_id, &input.habit_id, &input.body, now),
    )?;

    Ok(Json(CoachNote {
        id,
        user_id: input.user_id,
        habit_id: input.habit_id,
        body: input.body,
        created_at: now,
    }))
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNotesQuery>,
) -> ApiResult<Json<Vec<CoachNote>>> {
    let conn = state.db.0.lock()?;

    let notes = match &query.user_id {
        Some(user_id) => {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, habit_id, body, created_at FROM coach_notes
                 WHERE user_id = ?1 ORDER BY created_at",
            )?;
            let notes = stmt
                .query_map([user_id], note_from_row)?
                .collect::<rusqlite::Result<Vec<CoachNote>>>()?;
            notes
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, habit_id, body, created_at FROM coach_notes ORDER BY created_at",
            )?;
            let notes = stmt
                .query_map([], note_from_row)?
                .collect::<rusqlite::Result<Vec<CoachNote>>>()?;
            notes
        }
    };

    Ok(Json(notes))
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CoachNote>> {
    let conn = state.db.0.lock()?;
    let note = conn
        .query_row(
            "SELECT id, user_id, habit_id, body, created_at FROM coach_notes WHERE id = ?1",
            [&id],
            note_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("coach note"))?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCoachNoteInput>,
) -> ApiResult<Json<CoachNote>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let changed = conn.execute(
        "UPDATE coach_notes SET body = ?1 WHERE id = ?2",
        (&input.body, &id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("coach note"));
    }

    let note = conn.query_row(
        "SELECT id, user_id, habit_id, body, created_at FROM coach_notes WHERE id = ?1",
        [&id],
        note_from_row,
    )?;
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let conn = state.db.0.lock()?;
    let changed = conn.execute("DELETE FROM coach_notes WHERE id = ?1", [&id])?;
    if changed == 0 {
        return Err(ApiError::NotFound("coach note"));
    }
    Ok(StatusCode::NO_CONTENT)
}
