// src/routes/dashboard.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::AuthContext;
use crate::occupancy::summary::{dashboard_totals, DashboardTotals};
use crate::AppState;

use super::occupancy_error;

/// GET /api/v1/dashboard: headline occupancy numbers plus the per-location
/// headcount table.
pub async fn dashboard(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<DashboardTotals>, (StatusCode, String)> {
    let totals = dashboard_totals(&state.pool)
        .await
        .map_err(occupancy_error)?;
    Ok(Json(totals))
}
