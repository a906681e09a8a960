// src/routes/occupancy.rs
//
// HTTP surface of the occupancy manager. Handlers authorize the caller,
// parse a typed body, and hand off to one core operation; the core never
// sees request data or the auth context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::query_as;

use crate::auth::AuthContext;
use crate::models::Employee;
use crate::occupancy::import::{bulk_import, ImportOutcome, ImportRow};
use crate::occupancy::slots::{
    add_vacant_slots, list_vacant_slots, remove_vacant_slots, RemovalOutcome,
};
use crate::occupancy::summary::{room_summary, RoomSummary};
use crate::occupancy::transitions::{
    self, BedShiftOutcome, DepartureOutcome,
};
use crate::occupancy::OccupantInput;
use crate::AppState;

use super::{forbidden, internal_error, occupancy_error};

/// Location-scoped edit check for an existing employee row, mirroring the
/// dashboard rule: location first, accommodation as fallback.
async fn authorize_for_employee(
    state: &AppState,
    ctx: &AuthContext,
    emp_id: &str,
) -> Result<Employee, (StatusCode, String)> {
    let employee = query_as::<_, Employee>(r#"SELECT * FROM public.employees WHERE emp_id=$1"#)
        .bind(emp_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, format!("employee '{emp_id}' not found")))?;

    let scope = employee
        .location
        .clone()
        .or_else(|| employee.accommodation_name.clone())
        .unwrap_or_else(|| "-".to_string());
    if !ctx.can_edit_location(&scope) {
        return Err(forbidden(format!(
            "you cannot edit staff in location '{scope}'"
        )));
    }
    Ok(employee)
}

// ── manual entry ─────────────────────────────────────────────

/// POST /api/v1/occupancy/check-in: new employee, no room yet.
pub async fn check_in(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<OccupantInput>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    if let Some(loc) = body.location.as_deref() {
        if !ctx.can_edit_location(loc) {
            return Err(forbidden(format!("you cannot add staff in location '{loc}'")));
        }
    }
    let row = transitions::check_in(&state.pool, body)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct AddActiveBody {
    pub accommodation_name: String,
    pub room: String,
    #[serde(flatten)]
    pub occupant: OccupantInput,
}

/// POST /api/v1/occupancy/active: new employee placed straight into a room;
/// the room grows by one bed.
pub async fn add_active(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<AddActiveBody>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    let scope = body
        .occupant
        .location
        .clone()
        .unwrap_or_else(|| body.accommodation_name.clone());
    if !ctx.can_edit_location(&scope) {
        return Err(forbidden(format!("you cannot add staff in location '{scope}'")));
    }
    let row = transitions::add_active(&state.pool, body.occupant, &body.accommodation_name, &body.room)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct AssignBody {
    pub vacant_bed_id: i64,
    #[serde(flatten)]
    pub occupant: OccupantInput,
}

/// POST /api/v1/occupancy/assign: new employee takes a listed vacant bed.
pub async fn assign(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<AssignBody>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    let bed = query_as::<_, Employee>(
        r#"SELECT * FROM public.employees WHERE employee_id=$1"#,
    )
    .bind(body.vacant_bed_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((
        StatusCode::NOT_FOUND,
        format!("vacant bed #{} not found", body.vacant_bed_id),
    ))?;
    let scope = bed
        .location
        .clone()
        .or_else(|| bed.accommodation_name.clone())
        .unwrap_or_else(|| "-".to_string());
    if !ctx.can_edit_location(&scope) {
        return Err(forbidden(format!(
            "you cannot assign beds in location '{scope}'"
        )));
    }
    let row = transitions::assign(&state.pool, body.vacant_bed_id, body.occupant)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct AssignWaitingBody {
    pub emp_id: String,
    pub vacant_bed_id: i64,
}

/// POST /api/v1/occupancy/assign-waiting: an awaiting-room employee takes a
/// vacant bed.
pub async fn assign_waiting(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<AssignWaitingBody>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    authorize_for_employee(&state, &ctx, &body.emp_id).await?;
    let row = transitions::assign_waiting(&state.pool, &body.emp_id, body.vacant_bed_id)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(row))
}

// ── departures and moves ─────────────────────────────────────

/// POST /api/v1/occupancy/check-out/:emp_id
pub async fn check_out(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(emp_id): Path<String>,
) -> Result<Json<DepartureOutcome>, (StatusCode, String)> {
    authorize_for_employee(&state, &ctx, &emp_id).await?;
    let out = transitions::check_out(&state.pool, &emp_id)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(out))
}

/// POST /api/v1/occupancy/shift-out/:emp_id
pub async fn shift_out(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(emp_id): Path<String>,
) -> Result<Json<DepartureOutcome>, (StatusCode, String)> {
    authorize_for_employee(&state, &ctx, &emp_id).await?;
    let out = transitions::shift_out(&state.pool, &emp_id)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(out))
}

#[derive(Deserialize)]
pub struct BedShiftBody {
    pub vacant_bed_id: i64,
}

/// POST /api/v1/occupancy/bed-shift/:emp_id
pub async fn bed_shift(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(emp_id): Path<String>,
    Json(body): Json<BedShiftBody>,
) -> Result<Json<BedShiftOutcome>, (StatusCode, String)> {
    authorize_for_employee(&state, &ctx, &emp_id).await?;
    let out = transitions::bed_shift(&state.pool, &emp_id, body.vacant_bed_id)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(out))
}

/// POST /api/v1/occupancy/re-check-in/:emp_id
pub async fn re_check_in(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(emp_id): Path<String>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    authorize_for_employee(&state, &ctx, &emp_id).await?;
    let row = transitions::re_check_in(&state.pool, &emp_id)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(row))
}

// ── slots and summaries ──────────────────────────────────────

#[derive(Deserialize)]
pub struct VacantBedsQ {
    pub accommodation: Option<String>,
    pub room: Option<String>,
}

/// GET /api/v1/occupancy/vacant-beds
pub async fn vacant_beds(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(q): Query<VacantBedsQ>,
) -> Result<Json<Vec<Employee>>, (StatusCode, String)> {
    let rows = list_vacant_slots(&state.pool, q.accommodation.as_deref(), q.room.as_deref())
        .await
        .map_err(occupancy_error)?;
    Ok(Json(rows))
}

/// GET /api/v1/occupancy/rooms/:accommodation
pub async fn room_summary_handler(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(accommodation): Path<String>,
) -> Result<Json<Vec<RoomSummary>>, (StatusCode, String)> {
    let rows = room_summary(&state.pool, &accommodation)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct SlotCountBody {
    pub accommodation_name: String,
    pub room: String,
    pub count: u32,
}

/// POST /api/v1/occupancy/slots/add: grow a room by `count` bedspaces.
pub async fn add_slots(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<SlotCountBody>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can change room capacity"));
    }
    let created = add_vacant_slots(&state.pool, &body.accommodation_name, &body.room, body.count)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(created))
}

/// POST /api/v1/occupancy/slots/remove: shrink a room. Removing more than
/// exist deletes what is there and flags the shortfall.
pub async fn remove_slots(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<SlotCountBody>,
) -> Result<Json<RemovalOutcome>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can change room capacity"));
    }
    let outcome =
        remove_vacant_slots(&state.pool, &body.accommodation_name, &body.room, body.count)
            .await
            .map_err(occupancy_error)?;
    Ok(Json(outcome))
}

/// POST /api/v1/occupancy/import: rebuild the accommodations named in the
/// uploaded rows; everything else is left alone.
pub async fn import(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ImportOutcome>, (StatusCode, String)> {
    if !ctx.is_admin() {
        return Err(forbidden("only administrators can import accommodation data"));
    }
    let outcome = bulk_import(&state.pool, rows)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(outcome))
}
