// src/routes/sites.rs
//
// Accommodation sites: the named housing locations that rooms belong to.
// Location tags are a separate entity (see locations.rs); a site may point
// at one.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar, FromRow};

use crate::auth::AuthContext;
use crate::models::{AccommodationSite, Room};
use crate::AppState;

use super::{forbidden, internal_error};

#[derive(Serialize, FromRow)]
pub struct SiteWithLocation {
    pub accommodation_site_id: i64,
    pub name: String,
    pub location: Option<String>,
}

/// GET /api/v1/sites
pub async fn list_sites(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<Vec<SiteWithLocation>>, (StatusCode, String)> {
    let rows = query_as::<_, SiteWithLocation>(
        r#"
        SELECT s.accommodation_site_id, s.name, t.name AS location
        FROM public.accommodation_sites s
        LEFT JOIN public.location_tags t ON t.location_tag_id = s.location_tag_id
        ORDER BY s.name
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct CreateSiteBody {
    pub name: String,
    pub location: Option<String>,
}

/// POST /api/v1/sites
pub async fn create_site(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateSiteBody>,
) -> Result<Json<SiteWithLocation>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage accommodation sites"));
    }
    let name = body.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "site name cannot be empty".into()));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let existing: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.accommodation_sites WHERE lower(name) = lower($1)"#,
    )
    .bind(name)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;
    if existing > 0 {
        return Err((StatusCode::CONFLICT, format!("site '{name}' already exists")));
    }

    let tag_id: Option<i64> = match body.location.as_deref().map(str::trim) {
        Some(loc) if !loc.is_empty() => Some(
            query_scalar(
                r#"
                INSERT INTO public.location_tags(name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING location_tag_id
                "#,
            )
            .bind(loc)
            .fetch_one(&mut *tx)
            .await
            .map_err(internal_error)?,
        ),
        _ => None,
    };

    let row = query_as::<_, SiteWithLocation>(
        r#"
        WITH inserted AS (
            INSERT INTO public.accommodation_sites(name, location_tag_id)
            VALUES ($1,$2)
            RETURNING accommodation_site_id, name, location_tag_id
        )
        SELECT i.accommodation_site_id, i.name, t.name AS location
        FROM inserted i
        LEFT JOIN public.location_tags t ON t.location_tag_id = i.location_tag_id
        "#,
    )
    .bind(name)
    .bind(tag_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

/// DELETE /api/v1/sites/:id: refused while slot rows still reference the
/// accommodation.
pub async fn delete_site(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can manage accommodation sites"));
    }

    let site = query_as::<_, AccommodationSite>(
        r#"SELECT * FROM public.accommodation_sites WHERE accommodation_site_id=$1"#,
    )
    .bind(id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;
    let Some(site) = site else {
        return Err((StatusCode::NOT_FOUND, "site not found".into()));
    };

    let in_use: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.employees WHERE accommodation_name=$1"#)
            .bind(&site.name)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if in_use > 0 {
        return Err((
            StatusCode::CONFLICT,
            format!(
                "cannot delete '{}': {in_use} slot row(s) still reference it",
                site.name
            ),
        ));
    }

    let res = query(r#"DELETE FROM public.accommodation_sites WHERE accommodation_site_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}

/// GET /api/v1/accommodations/:name/rooms: capacity records for one
/// accommodation, for the slot-management screens.
pub async fn list_site_rooms(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(name): Path<String>,
) -> Result<Json<Vec<Room>>, (StatusCode, String)> {
    let rows = query_as::<_, Room>(
        r#"SELECT * FROM public.rooms WHERE accommodation_name=$1 ORDER BY room"#,
    )
    .bind(&name)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}
