// src/routes/employees.rs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::{query_as, FromRow};

use crate::auth::AuthContext;
use crate::models::Employee;
use crate::occupancy::summary::sort_for_dashboard;
use crate::occupancy::transitions::{guard_departed_edit, guard_generic_status};
use crate::occupancy::BedStatus;
use crate::AppState;

use super::{forbidden, internal_error, occupancy_error};

#[derive(Deserialize)]
pub struct ListEmployeesQ {
    pub status: Option<String>,
    pub location: Option<String>,
    pub query: Option<String>,
    pub accommodation: Option<String>,
    pub nationality: Option<String>,
    #[serde(default)]
    pub include_departed: bool,
}

async fn fetch_filtered(
    state: &AppState,
    q: &ListEmployeesQ,
) -> Result<Vec<Employee>, (StatusCode, String)> {
    // "Resigned_Or_Terminated" is a combined filter value the dashboard uses.
    let (status, resigned_or_terminated) = match q.status.as_deref() {
        Some("Resigned_Or_Terminated") => (None, true),
        other => (other.map(str::to_string), false),
    };

    let rows = query_as::<_, Employee>(
        r#"
        SELECT * FROM public.employees
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::BOOL IS FALSE OR status IN ('Resigned','Terminated'))
          AND ($3::TEXT IS NULL OR location = $3)
          AND ($4::TEXT IS NULL OR accommodation_name = $4)
          AND ($5::TEXT IS NULL OR nationality = $5)
          AND ($6::TEXT IS NULL OR emp_id ILIKE '%'||$6||'%' OR name ILIKE '%'||$6||'%')
          AND ($7::BOOL IS TRUE OR status NOT IN ('Ex-Employee','Shifted-out'))
        "#,
    )
    .bind(status)
    .bind(resigned_or_terminated)
    .bind(&q.location)
    .bind(&q.accommodation)
    .bind(&q.nationality)
    .bind(q.query.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .bind(q.include_departed)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(rows)
}

/// GET /api/v1/employees: dashboard listing, vacant beds first.
pub async fn list_employees(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(q): Query<ListEmployeesQ>,
) -> Result<Json<Vec<Employee>>, (StatusCode, String)> {
    let mut rows = fetch_filtered(&state, &q).await?;
    sort_for_dashboard(&mut rows);
    Ok(Json(rows))
}

/// GET /api/v1/employees/export: full filtered dataset for the spreadsheet
/// collaborator, departed rows included.
pub async fn export_employees(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(mut q): Query<ListEmployeesQ>,
) -> Result<Json<Vec<Employee>>, (StatusCode, String)> {
    q.include_departed = true;
    let rows = fetch_filtered(&state, &q).await?;
    Ok(Json(rows))
}

/// GET /api/v1/employees/awaiting-room
pub async fn awaiting_room(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<Vec<Employee>>, (StatusCode, String)> {
    let rows = query_as::<_, Employee>(
        r#"SELECT * FROM public.employees
           WHERE status='Check-in' AND room IS NULL
           ORDER BY name"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

/// GET /api/v1/employees/:emp_id
pub async fn get_employee(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(emp_id): Path<String>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    let row = query_as::<_, Employee>(r#"SELECT * FROM public.employees WHERE emp_id=$1"#)
        .bind(&emp_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, format!("employee '{emp_id}' not found")))?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct PatchEmployeeBody {
    pub name: Option<String>,
    pub designation: Option<String>,
    pub nationality: Option<String>,
    pub mobile_number: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub food_variety: Option<String>,
    pub meal_time: Option<String>,
    pub remarks: Option<String>,
}

/// PATCH /api/v1/employees/:emp_id: descriptive-field edit. Statuses that
/// create or destroy a bed claim are rejected here; they flow through the
/// dedicated transition endpoints so capacity bookkeeping cannot be skipped.
pub async fn patch_employee(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(emp_id): Path<String>,
    Json(b): Json<PatchEmployeeBody>,
) -> Result<Json<Employee>, (StatusCode, String)> {
    let current = query_as::<_, Employee>(r#"SELECT * FROM public.employees WHERE emp_id=$1"#)
        .bind(&emp_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, format!("employee '{emp_id}' not found")))?;

    let scope = current
        .location
        .clone()
        .or_else(|| current.accommodation_name.clone())
        .unwrap_or_else(|| "-".to_string());
    if !ctx.can_edit_location(&scope) {
        return Err(forbidden(format!(
            "you cannot edit staff in location '{scope}'"
        )));
    }

    if let Some(new_status) = &b.status {
        guard_generic_status(&BedStatus::parse(new_status)).map_err(occupancy_error)?;
        let current_status = BedStatus::parse(&current.status);
        guard_departed_edit(&current_status).map_err(occupancy_error)?;
        if current_status == BedStatus::Vacant {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "vacant bedspaces are managed through the slot operations".to_string(),
            ));
        }
    }

    let row = query_as::<_, Employee>(
        r#"
        UPDATE public.employees SET
          name = COALESCE($2, name),
          designation = COALESCE($3, designation),
          nationality = COALESCE($4, nationality),
          mobile_number = COALESCE($5, mobile_number),
          status = COALESCE($6, status),
          location = COALESCE($7, location),
          food_variety = COALESCE($8, food_variety),
          meal_time = COALESCE($9, meal_time),
          remarks = COALESCE($10, remarks)
        WHERE emp_id = $1
        RETURNING *
        "#,
    )
    .bind(&emp_id)
    .bind(b.name)
    .bind(b.designation)
    .bind(b.nationality)
    .bind(b.mobile_number)
    .bind(b.status)
    .bind(b.location)
    .bind(b.food_variety)
    .bind(b.meal_time)
    .bind(b.remarks)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(row))
}

#[derive(Debug, serde::Serialize, FromRow)]
pub struct GroupCount {
    pub label: Option<String>,
    pub headcount: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct StaffSummaries {
    pub by_designation: Vec<GroupCount>,
    pub by_nationality: Vec<GroupCount>,
}

/// GET /api/v1/employees/summaries: headcount on the books (departed and
/// vacant rows excluded), grouped for the data-management page.
pub async fn summaries(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<StaffSummaries>, (StatusCode, String)> {
    let by_designation = query_as::<_, GroupCount>(
        r#"
        SELECT designation AS label, COUNT(*) AS headcount
        FROM public.employees
        WHERE status IN ('Active','Vacation','On Leave','Resigned','Terminated')
        GROUP BY designation ORDER BY headcount DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let by_nationality = query_as::<_, GroupCount>(
        r#"
        SELECT nationality AS label, COUNT(*) AS headcount
        FROM public.employees
        WHERE status IN ('Active','Vacation','On Leave','Resigned','Terminated')
        GROUP BY nationality ORDER BY headcount DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(StaffSummaries {
        by_designation,
        by_nationality,
    }))
}
