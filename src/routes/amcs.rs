// src/routes/amcs.rs
//
// Annual maintenance contracts. Duration is derived from the contract dates
// at write time; remaining days are recomputed against the current date on
// every read so the stored value never goes stale.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use sqlx::{query, query_as};

use crate::auth::{AuthContext, AMCS_EDIT};
use crate::models::AmcService;
use crate::AppState;

use super::{forbidden, internal_error};

fn duration_days(start: NaiveDate, end: NaiveDate) -> i32 {
    (end - start).num_days() as i32
}

fn remaining_days(end: NaiveDate, today: NaiveDate) -> i32 {
    (end - today).num_days().max(0) as i32
}

fn check_dates(start: NaiveDate, end: NaiveDate) -> Result<(), (StatusCode, String)> {
    if end < start {
        return Err((
            StatusCode::BAD_REQUEST,
            "contract end date cannot be before its start date".into(),
        ));
    }
    Ok(())
}

/// GET /api/v1/amcs
pub async fn list_amcs(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<Vec<AmcService>>, (StatusCode, String)> {
    let rows = query_as::<_, AmcService>(
        r#"
        SELECT amc_id, service_id, recorded_on, description, supplier_name,
               start_date, end_date, cost, kind, remarks, duration_days,
               GREATEST(0, (end_date - CURRENT_DATE))::INT AS remaining_days,
               attached_file
        FROM public.amc_services
        ORDER BY end_date, amc_id
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct CreateAmcBody {
    pub service_id: String,
    pub description: Option<String>,
    pub supplier_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost: Option<f64>,
    pub kind: Option<String>,
    pub remarks: Option<String>,
    pub attached_file: Option<String>,
}

async fn insert_amc<'e, E>(db: E, b: &CreateAmcBody) -> Result<AmcService, (StatusCode, String)>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    check_dates(b.start_date, b.end_date)?;
    let today = Local::now().date_naive();
    let row = query_as::<_, AmcService>(
        r#"
        INSERT INTO public.amc_services
            (service_id, recorded_on, description, supplier_name, start_date, end_date,
             cost, kind, remarks, duration_days, remaining_days, attached_file)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
        RETURNING *
        "#,
    )
    .bind(b.service_id.trim())
    .bind(today)
    .bind(&b.description)
    .bind(&b.supplier_name)
    .bind(b.start_date)
    .bind(b.end_date)
    .bind(b.cost)
    .bind(&b.kind)
    .bind(&b.remarks)
    .bind(duration_days(b.start_date, b.end_date))
    .bind(remaining_days(b.end_date, today))
    .bind(&b.attached_file)
    .fetch_one(db)
    .await
    .map_err(internal_error)?;
    Ok(row)
}

/// POST /api/v1/amcs
pub async fn create_amc(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<CreateAmcBody>,
) -> Result<Json<AmcService>, (StatusCode, String)> {
    if !ctx.can_access_feature(AMCS_EDIT) {
        return Err(forbidden("you cannot manage AMC services"));
    }
    if b.service_id.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "service id is required".into()));
    }
    let row = insert_amc(&state.pool, &b).await?;
    Ok(Json(row))
}

/// POST /api/v1/amcs/import: bulk load; rejects the whole batch if any row
/// has reversed dates or a blank service id. All rows land in one
/// transaction, so a mid-batch failure leaves nothing behind.
pub async fn import_amcs(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(rows): Json<Vec<CreateAmcBody>>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.can_access_feature(AMCS_EDIT) {
        return Err(forbidden("you cannot manage AMC services"));
    }
    check_import_rows(&rows)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let mut inserted = 0usize;
    for b in &rows {
        insert_amc(&mut *tx, b).await?;
        inserted += 1;
    }
    tx.commit().await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "inserted": inserted })))
}

/// Pre-checks the whole batch before anything is written, with row numbers
/// in the error so the offending line is easy to find.
fn check_import_rows(rows: &[CreateAmcBody]) -> Result<(), (StatusCode, String)> {
    for (i, b) in rows.iter().enumerate() {
        if b.service_id.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("row {}: service id is required", i + 1),
            ));
        }
        check_dates(b.start_date, b.end_date)
            .map_err(|(s, m)| (s, format!("row {}: {m}", i + 1)))?;
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct PatchAmcBody {
    pub service_id: Option<String>,
    pub description: Option<String>,
    pub supplier_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub kind: Option<String>,
    pub remarks: Option<String>,
    pub attached_file: Option<String>,
}

/// PATCH /api/v1/amcs/:id: a date change recomputes the derived day counts.
pub async fn patch_amc(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<PatchAmcBody>,
) -> Result<Json<AmcService>, (StatusCode, String)> {
    if !ctx.can_access_feature(AMCS_EDIT) {
        return Err(forbidden("you cannot manage AMC services"));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let current = query_as::<_, AmcService>(
        r#"SELECT * FROM public.amc_services WHERE amc_id=$1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "AMC service not found".to_string()))?;

    let start = b.start_date.unwrap_or(current.start_date);
    let end = b.end_date.unwrap_or(current.end_date);
    check_dates(start, end)?;
    let today = Local::now().date_naive();

    let row = query_as::<_, AmcService>(
        r#"
        UPDATE public.amc_services SET
          service_id = COALESCE($2, service_id),
          description = COALESCE($3, description),
          supplier_name = COALESCE($4, supplier_name),
          start_date = $5,
          end_date = $6,
          cost = COALESCE($7, cost),
          kind = COALESCE($8, kind),
          remarks = COALESCE($9, remarks),
          duration_days = $10,
          remaining_days = $11,
          attached_file = COALESCE($12, attached_file)
        WHERE amc_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.service_id)
    .bind(b.description)
    .bind(b.supplier_name)
    .bind(start)
    .bind(end)
    .bind(b.cost)
    .bind(b.kind)
    .bind(b.remarks)
    .bind(duration_days(start, end))
    .bind(remaining_days(end, today))
    .bind(b.attached_file)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

/// DELETE /api/v1/amcs/:id
pub async fn delete_amc(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.can_access_feature(AMCS_EDIT) {
        return Err(forbidden("you cannot manage AMC services"));
    }
    let res = query(r#"DELETE FROM public.amc_services WHERE amc_id=$1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    if res.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "AMC service not found".into()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn duration_counts_whole_days() {
        assert_eq!(duration_days(d(2025, 1, 1), d(2026, 1, 1)), 365);
        assert_eq!(duration_days(d(2025, 3, 10), d(2025, 3, 10)), 0);
    }

    #[test]
    fn remaining_never_negative() {
        assert_eq!(remaining_days(d(2025, 6, 1), d(2025, 5, 1)), 31);
        assert_eq!(remaining_days(d(2025, 6, 1), d(2025, 6, 1)), 0);
        assert_eq!(remaining_days(d(2025, 6, 1), d(2025, 7, 1)), 0);
    }

    #[test]
    fn reversed_dates_rejected() {
        assert!(check_dates(d(2025, 6, 1), d(2025, 5, 1)).is_err());
        assert!(check_dates(d(2025, 6, 1), d(2025, 6, 1)).is_ok());
    }

    fn body(service_id: &str, start: NaiveDate, end: NaiveDate) -> CreateAmcBody {
        CreateAmcBody {
            service_id: service_id.into(),
            description: None,
            supplier_name: None,
            start_date: start,
            end_date: end,
            cost: None,
            kind: None,
            remarks: None,
            attached_file: None,
        }
    }

    #[test]
    fn import_batch_checked_before_any_write() {
        let rows = vec![
            body("AMC-1", d(2025, 1, 1), d(2025, 12, 31)),
            body("  ", d(2025, 1, 1), d(2025, 12, 31)),
        ];
        let (_, msg) = check_import_rows(&rows).unwrap_err();
        assert!(msg.starts_with("row 2"));

        let reversed = vec![body("AMC-1", d(2025, 6, 1), d(2025, 5, 1))];
        assert!(check_import_rows(&reversed).is_err());

        let ok = vec![body("AMC-1", d(2025, 1, 1), d(2025, 12, 31))];
        assert!(check_import_rows(&ok).is_ok());
    }
}
