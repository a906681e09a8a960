// src/routes/locations.rs
//
// Location tags: the logical site grouping employees and accommodation
// sites are filtered by. Admin-only management; renames cascade to the
// employee rows carrying the old name.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::{query, query_as, query_scalar};

use crate::auth::AuthContext;
use crate::models::LocationTag;
use crate::AppState;

use super::{forbidden, internal_error};

/// GET /api/v1/locations
pub async fn list_locations(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<Vec<LocationTag>>, (StatusCode, String)> {
    let rows = query_as::<_, LocationTag>(
        r#"SELECT location_tag_id, name FROM public.location_tags ORDER BY name"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct LocationBody {
    pub name: String,
}

/// POST /api/v1/locations
pub async fn create_location(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<LocationBody>,
) -> Result<Json<LocationTag>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage locations"));
    }
    let name = body.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "location name cannot be empty".into()));
    }

    let existing: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.location_tags WHERE lower(name)=lower($1)"#)
            .bind(name)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if existing > 0 {
        return Err((
            StatusCode::CONFLICT,
            format!("location '{name}' already exists"),
        ));
    }

    let row = query_as::<_, LocationTag>(
        r#"INSERT INTO public.location_tags(name) VALUES ($1)
           RETURNING location_tag_id, name"#,
    )
    .bind(name)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(row))
}

/// PATCH /api/v1/locations/:id: rename, cascading onto employee rows so
/// permission scopes stay consistent.
pub async fn rename_location(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(body): Json<LocationBody>,
) -> Result<Json<LocationTag>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage locations"));
    }
    let new_name = body.name.trim();
    if new_name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "location name cannot be empty".into()));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let old_name: Option<String> =
        query_scalar(r#"SELECT name FROM public.location_tags WHERE location_tag_id=$1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(internal_error)?;
    let Some(old_name) = old_name else {
        return Err((StatusCode::NOT_FOUND, "location not found".into()));
    };

    let clash: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.location_tags
           WHERE lower(name)=lower($1) AND location_tag_id <> $2"#,
    )
    .bind(new_name)
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;
    if clash > 0 {
        return Err((
            StatusCode::CONFLICT,
            format!("location '{new_name}' already exists"),
        ));
    }

    query(r#"UPDATE public.employees SET location=$2 WHERE location=$1"#)
        .bind(&old_name)
        .bind(new_name)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    let row = query_as::<_, LocationTag>(
        r#"UPDATE public.location_tags SET name=$2 WHERE location_tag_id=$1
           RETURNING location_tag_id, name"#,
    )
    .bind(id)
    .bind(new_name)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

/// DELETE /api/v1/locations/:id: refused while employees are assigned.
pub async fn delete_location(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage locations"));
    }

    let name: Option<String> =
        query_scalar(r#"SELECT name FROM public.location_tags WHERE location_tag_id=$1"#)
            .bind(id)
            .fetch_optional(&state.pool)
            .await
            .map_err(internal_error)?;
    let Some(name) = name else {
        return Err((StatusCode::NOT_FOUND, "location not found".into()));
    };

    let assigned: i64 = query_scalar(r#"SELECT COUNT(*) FROM public.employees WHERE location=$1"#)
        .bind(&name)
        .fetch_one(&state.pool)
        .await
        .map_err(internal_error)?;
    if assigned > 0 {
        return Err((
            StatusCode::CONFLICT,
            format!("cannot delete '{name}': still assigned to {assigned} employee(s)"),
        ));
    }

    let res = query(r#"DELETE FROM public.location_tags WHERE location_tag_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}
