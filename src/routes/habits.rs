use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::OptionalExtension;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreateHabitInput, UpdateHabitInput, ValidateExt};
use crate::models::Habit;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_habits).post(create_habit))
        .route("/{id}", get(get_habit).put(update_habit).delete(delete_habit))
        .route("/{id}/remind", post(remind_habit))
        .route("/{id}/missed", post(missed_habit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListHabitsQuery {
    user_id: Option<String>,
}

fn habit_from_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        frequency: row.get(4)?,
        reminder_time: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const HABIT_COLUMNS: &str =
    "id, user_id, name, description, frequency, reminder_time, created_at, updated_at";

async fn create_habit(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateHabitInput>,
) -> ApiResult<Json<Habit>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;

    let owner: Option<String> = conn
        .query_row("SELECT id FROM users WHERE id = ?1", [&input.user_id], |row| {
            row.get(0)
        })
        .optional()?;
    if owner.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    let now = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO habits (id, user_id, name, description, frequency, reminder_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            &id,
            &input.user_id,
            &input.name,
            &input.description,
            &input.frequency,
            &input.reminder_time,
            now,
            now,
        ),
    )?;

    Ok(Json(Habit {
        id,
        user_id: input.user_id,
        name: input.name,
        description: input.description,
        frequency: input.frequency,
        reminder_time: input.reminder_time,
        created_at: now,
        updated_at: now,
    }))
}

async fn list_habits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListHabitsQuery>,
) -> ApiResult<Json<Vec<Habit>>> {
    let conn = state.db.0.lock()?;

    let habits = match &query.user_id {
        Some(user_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM habits WHERE user_id = ?1 ORDER BY created_at",
                HABIT_COLUMNS
            ))?;
            let habits = stmt
                .query_map([user_id], habit_from_row)?
                .collect::<rusqlite::Result<Vec<Habit>>>()?;
            habits
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM habits ORDER BY created_at",
                HABIT_COLUMNS
            ))?;
            let habits = stmt
                .query_map([], habit_from_row)?
                .collect::<rusqlite::Result<Vec<Habit>>>()?;
            habits
        }
    };

    Ok(Json(habits))
}

async fn get_habit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Habit>> {
    let conn = state.db.0.lock()?;
    let habit = conn
        .query_row(
            &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
            [&id],
            habit_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("habit"))?;
    Ok(Json(habit))
}

async fn update_habit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateHabitInput>,
) -> ApiResult<Json<Habit>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let now = chrono::Utc::now().timestamp_millis();
    let changed = conn.execute(
        "UPDATE habits SET name = ?1, description = ?2, frequency = ?3, reminder_time = ?4, updated_at = ?5
         WHERE id = ?6",
        (
            &input.name,
            &input.description,
            &input.frequency,
            &input.reminder_time,
            now,
            &id,
        ),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("habit"));
    }

    let habit = conn.query_row(
        &format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS),
        [&id],
        habit_from_row,
    )?;
    Ok(Json(habit))
}

async fn delete_habit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let conn = state.db.0.lock()?;
    let changed = conn.execute("DELETE FROM habits WHERE id = ?1", [&id])?;
    if changed == 0 {
        return Err(ApiError::NotFound("habit"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Owner's address plus what the notifier needs, fetched in one query.
fn habit_recipient(
    conn: &rusqlite::Connection,
    habit_id: &str,
) -> ApiResult<(String, String, Option<String>)> {
    conn.query_row(
        "SELECT u.email, h.name, h.reminder_time
         FROM habits h JOIN users u ON h.user_id = u.id
         WHERE h.id = ?1",
        [habit_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?
    .ok_or(ApiError::NotFound("habit"))
}

async fn remind_habit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let (email, habit_name, reminder_time) = {
        let conn = state.db.0.lock()?;
        habit_recipient(&conn, &id)?
    };

    let time = reminder_time.unwrap_or_else(|| "now".to_string());
    let sent = state
        .mailer
        .send_reminder_email(&email, &habit_name, &time)
        .await;
    Ok(Json(json!({ "sent": sent })))
}

async fn missed_habit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let (email, habit_name, _) = {
        let conn = state.db.0.lock()?;
        habit_recipient(&conn, &id)?
    };

    let sent = state.mailer.send_missed_habit_email(&email, &habit_name).await;
    Ok(Json(json!({ "sent": sent })))
}
