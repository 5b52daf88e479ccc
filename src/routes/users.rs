use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::OptionalExtension;

use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreateUserInput, UpdateUserInput, ValidateExt};
use crate::models::User;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateUserInput>,
) -> ApiResult<Json<User>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let now = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        (&id, &input.name, &input.email, now),
    )?;

    Ok(Json(User {
        id,
        name: input.name,
        email: input.email,
        created_at: now,
    }))
}

async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<User>>> {
    let conn = state.db.0.lock()?;
    let mut stmt =
        conn.prepare("SELECT id, name, email, created_at FROM users ORDER BY created_at")?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<User>>>()?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let conn = state.db.0.lock()?;
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE id = ?1",
            [&id],
            user_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateUserInput>,
) -> ApiResult<Json<User>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let changed = conn.execute(
        "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3",
        (&input.name, &input.email, &id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("user"));
    }

    let user = conn.query_row(
        "SELECT id, name, email, created_at FROM users WHERE id = ?1",
        [&id],
        user_from_row,
    )?;
    Ok(Json(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let conn = state.db.0.lock()?;
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [&id])?;
    if changed == 0 {
        return Err(ApiError::NotFound("user"));
    }
    Ok(StatusCode::NO_CONTENT)
}
