use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::OptionalExtension;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::input::{CreatePartnerInput, UpdatePartnerInput, ValidateExt};
use crate::models::Partnership;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_partners).post(create_partner))
        .route("/{id}", axum::routing::put(update_partner).delete(delete_partner))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPartnersQuery {
    user_id: Option<String>,
}

fn partnership_from_row(row: &rusqlite::Row) -> rusqlite::Result<Partnership> {
    Ok(Partnership {
        id: row.get(0)?,
        user_id: row.get(1)?,
        partner_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

async fn create_partner(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreatePartnerInput>,
) -> ApiResult<Json<Partnership>> {
    input.validate_input()?;
    if input.user_id == input.partner_id {
        return Err(ApiError::BadRequest(
            "Cannot partner with yourself".to_string(),
        ));
    }

    let conn = state.db.0.lock()?;
    for user in [&input.user_id, &input.partner_id] {
        let found: Option<String> = conn
            .query_row("SELECT id FROM users WHERE id = ?1", [user], |row| {
                row.get(0)
            })
            .optional()?;
        if found.is_none() {
            return Err(ApiError::NotFound("user"));
        }
    }

    let now = chrono::Utc::now().timestamp_millis();
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO partners (id, user_id, partner_id, status, created_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        (&id, &input.user_id, &input.partner_id, now),
    )?;

    Ok(Json(Partnership {
        id,
        user_id: input.user_id,
        partner_id: input.partner_id,
        status: "pending".to_string(),
        created_at: now,
    }))
}

async fn list_partners(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListPartnersQuery>,
) -> ApiResult<Json<Vec<Partnership>>> {
    let conn = state.db.0.lock()?;

    let partnerships = match &query.user_id {
        Some(user_id) => {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, partner_id, status, created_at FROM partners
                 WHERE user_id = ?1 OR partner_id = ?1 ORDER BY created_at",
            )?;
            let partnerships = stmt
                .query_map([user_id], partnership_from_row)?
                .collect::<rusqlite::Result<Vec<Partnership>>>()?;
            partnerships
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, partner_id, status, created_at FROM partners ORDER BY created_at",
            )?;
            let partnerships = stmt
                .query_map([], partnership_from_row)?
                .collect::<rusqlite::Result<Vec<Partnership>>>()?;
            partnerships
        }
    };

    Ok(Json(partnerships))
}

async fn update_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePartnerInput>,
) -> ApiResult<Json<Partnership>> {
    input.validate_input()?;

    let conn = state.db.0.lock()?;
    let changed = conn.execute(
        "UPDATE partners SET status = ?1 WHERE id = ?2",
        (&input.status, &id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound("partnership"));
    }

    let partnership = conn.query_row(
        "SELECT id, user_id, partner_id, status, created_at FROM partners WHERE id = ?1",
        [&id],
        partnership_from_row,
    )?;
    Ok(Json(partnership))
}

async fn delete_partner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let conn = state.db.0.lock()?;
    let changed = conn.execute("DELETE FROM partners WHERE id = ?1", [&id])?;
    if changed == 0 {
        return Err(ApiError::NotFound("partnership"));
    }
    Ok(StatusCode::NO_CONTENT)
}
