// src/routes/maintenance.rs
//
// Maintenance reports for the housing blocks. Open reports stay on the
// dashboard until someone closes them; closing stamps the date, reopening
// clears it again.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar};

use crate::auth::{AuthContext, MAINT_EDIT};
use crate::models::MaintenanceReport;
use crate::AppState;

use super::{forbidden, internal_error};

#[derive(Serialize)]
pub struct MaintenanceDashboard {
    pub total_reports: i64,
    pub open_reports: i64,
    pub closed_reports: i64,
    pub reports: Vec<MaintenanceReport>,
}

/// GET /api/v1/maintenance
pub async fn maintenance_dashboard(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<MaintenanceDashboard>, (StatusCode, String)> {
    let (total, open): (i64, i64) = query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'Open')
        FROM public.maintenance_reports
        "#,
    )
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    let reports = query_as::<_, MaintenanceReport>(
        r#"SELECT * FROM public.maintenance_reports ORDER BY report_date DESC, report_id DESC"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(MaintenanceDashboard {
        total_reports: total,
        open_reports: open,
        closed_reports: total - open,
        reports,
    }))
}

/// GET /api/v1/maintenance/reports/list/:status: open | closed | all
pub async fn list_reports(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(status): Path<String>,
) -> Result<Json<Vec<MaintenanceReport>>, (StatusCode, String)> {
    let wanted = match status.to_lowercase().as_str() {
        "open" => Some("Open"),
        "closed" => Some("Closed"),
        "all" => None,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown report status '{other}'"),
            ))
        }
    };
    let rows = query_as::<_, MaintenanceReport>(
        r#"
        SELECT * FROM public.maintenance_reports
        WHERE ($1::TEXT IS NULL OR status = $1)
        ORDER BY report_date DESC, report_id DESC
        "#,
    )
    .bind(wanted)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct CreateReportBody {
    pub block: String,
    pub section: String,
    pub details: String,
    pub report_date: Option<chrono::NaiveDate>,
    pub concern: Option<String>,
    pub risk: Option<String>,
    pub remarks: Option<String>,
    pub attached_file: Option<String>,
}

/// POST /api/v1/maintenance/reports
pub async fn create_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<CreateReportBody>,
) -> Result<Json<MaintenanceReport>, (StatusCode, String)> {
    if !ctx.can_access_feature(MAINT_EDIT) {
        return Err(forbidden("you cannot file maintenance reports"));
    }
    if b.block.trim().is_empty() || b.details.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "block and details are required".into(),
        ));
    }

    let row = query_as::<_, MaintenanceReport>(
        r#"
        INSERT INTO public.maintenance_reports
            (block, section, report_date, details, status, concern, risk, remarks, attached_file)
        VALUES ($1,$2,$3,$4,'Open',$5,$6,$7,$8)
        RETURNING *
        "#,
    )
    .bind(b.block.trim())
    .bind(b.section.trim())
    .bind(b.report_date.unwrap_or_else(|| Local::now().date_naive()))
    .bind(b.details.trim())
    .bind(&b.concern)
    .bind(&b.risk)
    .bind(&b.remarks)
    .bind(&b.attached_file)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct PatchReportBody {
    pub block: Option<String>,
    pub section: Option<String>,
    pub details: Option<String>,
    pub status: Option<String>,
    pub concern: Option<String>,
    pub risk: Option<String>,
    pub remarks: Option<String>,
    pub attached_file: Option<String>,
}

/// PATCH /api/v1/maintenance/reports/:id: a move to Closed stamps today's
/// date; a move back to Open clears it.
pub async fn patch_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<PatchReportBody>,
) -> Result<Json<MaintenanceReport>, (StatusCode, String)> {
    if !ctx.can_access_feature(MAINT_EDIT) {
        return Err(forbidden("you cannot edit maintenance reports"));
    }
    if let Some(s) = &b.status {
        if s != "Open" && s != "Closed" {
            return Err((StatusCode::BAD_REQUEST, format!("unknown status '{s}'")));
        }
    }

    let closed_date = match b.status.as_deref() {
        Some("Closed") => Some(Local::now().date_naive()),
        _ => None,
    };
    let reopening = b.status.as_deref() == Some("Open");

    let row = query_as::<_, MaintenanceReport>(
        r#"
        UPDATE public.maintenance_reports SET
          block = COALESCE($2, block),
          section = COALESCE($3, section),
          details = COALESCE($4, details),
          status = COALESCE($5, status),
          closed_date = CASE WHEN $6 THEN NULL ELSE COALESCE($7, closed_date) END,
          concern = COALESCE($8, concern),
          risk = COALESCE($9, risk),
          remarks = COALESCE($10, remarks),
          attached_file = COALESCE($11, attached_file)
        WHERE report_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.block)
    .bind(b.section)
    .bind(b.details)
    .bind(b.status)
    .bind(reopening)
    .bind(closed_date)
    .bind(b.concern)
    .bind(b.risk)
    .bind(b.remarks)
    .bind(b.attached_file)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "report not found".to_string()))?;
    Ok(Json(row))
}

/// DELETE /api/v1/maintenance/reports/:id
pub async fn delete_report(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.can_access_feature(MAINT_EDIT) {
        return Err(forbidden("you cannot delete maintenance reports"));
    }
    let exists: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.maintenance_reports WHERE report_id=$1"#)
            .bind(id)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if exists == 0 {
        return Err((StatusCode::NOT_FOUND, "report not found".into()));
    }
    let res = query(r#"DELETE FROM public.maintenance_reports WHERE report_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}
