use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::OptionalExtension;

use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreateChallengeInput, UpdateChallengeInput, ValidateExt};
use crate::models::Challenge;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_challenges).post(create_challenge))
        .route(
            "/{id}",
            get(get_challenge)
                .put(update_challenge)
                .delete(delete_challenge),
        )
}

fn challenge_from_row(row: &rusqlite::Row) -> rusqlite::Result<Challenge> {
    Ok(Challenge {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        starts_at: row.get(4)?,
        ends_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const CHALLENGE_COLUMNS: &str =
    "id, title, description, created_by, starts_at, ends_at, created_at";

async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateChallengeInput>,
) -> ApiResult<Json<Challenge>> {
    input.validate_input()?;
    if input.ends_at < input.starts_at {
        return Err(ApiError::BadRequest(
            "Challenge cannot end before it starts".to_string(),
        ));
    }

    let conn = state.db.0.lock()?;
    let now = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO challenges (id, title, description, created_by, starts_at, ends_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &id,
            &input.title,
            &input.description,
            &input.created_by,
            input.starts_at,
            input.ends_at,
            now,
        ),
    )?;

    Ok(Json(Challenge {
        id,
        title: input.title,
        description: input.description,
        created_by: input.created_by,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        created_at: now,
    }))
}

async fn list_challenges(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Challenge>>> {
    let conn = state.db.0.lock()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM challenges ORDER BY starts_at",
        CHALLENGE_COLUMNS
    ))?;
    let challenges = stmt
        .query_map([], challenge_from_row)?
        .collect::<rusqlite::Result<Vec<Challenge>>>()?;
    Ok(Json(challenges))
}

async fn get_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Challenge>> {
    let conn = state.db.0.lock()?;
    let challenge = conn
        .query_row(
            &format!("SELECT {} FROM challenges WHERE id = ?1", CHALLENGE_COLUMNS),
            [&id],
            challenge_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("challenge"))?;
    Ok(Json(challenge))
}

async fn update_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateChallengeInput>,
) -> ApiResult<Json<Challenge>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let changed = conn.execute(
        "UPDATE challenges SET title = ?1, description = ?2, starts_at = ?3, ends_at = ?4
         WHERE id = ?5",
        (
            &input.title,
            &input.description,
            input.starts_at,
            input.ends_at,
            &id,
        ),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("challenge"));
    }

    let challenge = conn.query_row(
        &format!("SELECT {} FROM challenges WHERE id = ?1", CHALLENGE_COLUMNS),
        [&id],
        challenge_from_row,
    )?;
    Ok(Json(challenge))
}

async fn delete_challenge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let conn = state.db.0.lock()?;
    let changed = conn.execute("DELETE FROM challenges WHERE id = ?1", [&id])?;
    if changed == 0 {
        return Err(ApiError::NotFound("challenge"));
    }
    Ok(StatusCode::NO_CONTENT)
}
