// src/routes/inventory.rs
//
// Stock items and their incoming/outgoing movement history. Mutations need
// INV_EDIT; history views need INV_VIEW (implied by INV_EDIT).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, query_scalar};

use crate::auth::{AuthContext, INV_EDIT, INV_VIEW};
use crate::models::{Employee, InventoryItem, InventoryTransaction};
use crate::AppState;

use super::{forbidden, internal_error};

#[derive(Serialize)]
pub struct InventoryDashboard {
    pub items: Vec<InventoryItem>,
    pub total_received: i64,
    pub total_distributed: i64,
    pub current_stock: i64,
}

/// GET /api/v1/inventory
pub async fn inventory_dashboard(
    State(state): State<AppState>,
    _ctx: AuthContext,
) -> Result<Json<InventoryDashboard>, (StatusCode, String)> {
    let items = query_as::<_, InventoryItem>(
        r#"SELECT * FROM public.inventory_items ORDER BY name"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let total_received: i64 = query_scalar(
        r#"SELECT COALESCE(SUM(quantity),0) FROM public.inventory_transactions WHERE kind='Incoming'"#,
    )
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    let total_distributed: i64 = query_scalar(
        r#"SELECT COALESCE(SUM(quantity),0) FROM public.inventory_transactions WHERE kind='Outgoing'"#,
    )
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    let current_stock: i64 =
        query_scalar(r#"SELECT COALESCE(SUM(quantity),0) FROM public.inventory_items"#)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;

    Ok(Json(InventoryDashboard {
        items,
        total_received,
        total_distributed,
        current_stock,
    }))
}

#[derive(Deserialize)]
pub struct CreateItemBody {
    pub name: String,
}

/// POST /api/v1/inventory/items
pub async fn create_item(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<CreateItemBody>,
) -> Result<Json<InventoryItem>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_EDIT) {
        return Err(forbidden("you cannot modify inventory"));
    }
    let name = b.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "item name cannot be empty".into()));
    }

    let clash: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.inventory_items WHERE lower(name)=lower($1)"#)
            .bind(name)
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;
    if clash > 0 {
        return Err((
            StatusCode::CONFLICT,
            format!("an item named '{name}' already exists"),
        ));
    }

    let row = query_as::<_, InventoryItem>(
        r#"INSERT INTO public.inventory_items(name, quantity) VALUES ($1, 0) RETURNING *"#,
    )
    .bind(name)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct IncomingBody {
    pub item_id: i64,
    pub quantity: i32,
    pub supplier_name: Option<String>,
    pub lpo_number: Option<String>,
    pub attached_file: Option<String>,
}

/// POST /api/v1/inventory/incoming: stock received from a supplier.
pub async fn incoming(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<IncomingBody>,
) -> Result<Json<InventoryTransaction>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_EDIT) {
        return Err(forbidden("you cannot record incoming stock"));
    }
    if b.quantity <= 0 {
        return Err((StatusCode::BAD_REQUEST, "quantity must be positive".into()));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let item = query_as::<_, InventoryItem>(
        r#"UPDATE public.inventory_items SET quantity = quantity + $2 WHERE item_id=$1 RETURNING *"#,
    )
    .bind(b.item_id)
    .bind(b.quantity)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "item not found".to_string()))?;

    let row = query_as::<_, InventoryTransaction>(
        r#"
        INSERT INTO public.inventory_transactions
            (item_id, item_name, kind, quantity, day, lpo_number, supplier_name, attached_file)
        VALUES ($1,$2,'Incoming',$3,$4,$5,$6,$7)
        RETURNING *
        "#,
    )
    .bind(item.item_id)
    .bind(&item.name)
    .bind(b.quantity)
    .bind(Local::now().date_naive())
    .bind(&b.lpo_number)
    .bind(&b.supplier_name)
    .bind(&b.attached_file)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct OutgoingBody {
    pub item_id: i64,
    pub emp_id: String,
    pub quantity: i32,
    pub attached_file: Option<String>,
}

/// POST /api/v1/inventory/outgoing: stock handed to an employee; their room
/// is recorded on the transaction.
pub async fn outgoing(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(b): Json<OutgoingBody>,
) -> Result<Json<InventoryTransaction>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_EDIT) {
        return Err(forbidden("you cannot record outgoing stock"));
    }
    if b.quantity <= 0 {
        return Err((StatusCode::BAD_REQUEST, "quantity must be positive".into()));
    }

    let employee = query_as::<_, Employee>(r#"SELECT * FROM public.employees WHERE emp_id=$1"#)
        .bind(&b.emp_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "employee not found".to_string()))?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    // Guarded decrement: fails the request instead of going negative.
    let item = query_as::<_, InventoryItem>(
        r#"
        UPDATE public.inventory_items SET quantity = quantity - $2
        WHERE item_id=$1 AND quantity >= $2
        RETURNING *
        "#,
    )
    .bind(b.item_id)
    .bind(b.quantity)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        "item not found or not enough stock".to_string(),
    ))?;

    let row = query_as::<_, InventoryTransaction>(
        r#"
        INSERT INTO public.inventory_transactions
            (item_id, item_name, kind, quantity, day, emp_id, room_number, attached_file)
        VALUES ($1,$2,'Outgoing',$3,$4,$5,$6,$7)
        RETURNING *
        "#,
    )
    .bind(item.item_id)
    .bind(&item.name)
    .bind(b.quantity)
    .bind(Local::now().date_naive())
    .bind(&employee.emp_id)
    .bind(&employee.room)
    .bind(&b.attached_file)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

/// GET /api/v1/inventory/transactions/list/:kind
pub async fn list_transactions(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(kind): Path<String>,
) -> Result<Json<Vec<InventoryTransaction>>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_VIEW) {
        return Err(forbidden("you cannot view stock records"));
    }
    let kind = match kind.to_lowercase().as_str() {
        "incoming" => "Incoming",
        "outgoing" => "Outgoing",
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown transaction kind '{other}'"),
            ))
        }
    };
    let rows = query_as::<_, InventoryTransaction>(
        r#"SELECT * FROM public.inventory_transactions WHERE kind=$1 ORDER BY day DESC, transaction_id DESC"#,
    )
    .bind(kind)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    Ok(Json(rows))
}

#[derive(Deserialize)]
pub struct PatchTransactionBody {
    pub quantity: Option<i32>,
    pub day: Option<chrono::NaiveDate>,
}

/// PATCH /api/v1/inventory/transactions/:id: only outgoing movements can be
/// corrected; the stock level is adjusted by the quantity difference.
pub async fn patch_transaction(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
    Json(b): Json<PatchTransactionBody>,
) -> Result<Json<InventoryTransaction>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_EDIT) {
        return Err(forbidden("you cannot edit stock transactions"));
    }
    if let Some(q) = b.quantity {
        if q <= 0 {
            return Err((StatusCode::BAD_REQUEST, "quantity must be positive".into()));
        }
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let current = query_as::<_, InventoryTransaction>(
        r#"SELECT * FROM public.inventory_transactions WHERE transaction_id=$1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "transaction not found".to_string()))?;
    if current.kind != "Outgoing" {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "only outgoing transactions can be edited".to_string(),
        ));
    }

    if let Some(new_quantity) = b.quantity {
        let difference = new_quantity - current.quantity;
        let adjusted = query(
            r#"UPDATE public.inventory_items SET quantity = quantity - $2
               WHERE item_id=$1 AND quantity >= $2"#,
        )
        .bind(current.item_id)
        .bind(difference)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;
        if adjusted.rows_affected() == 0 {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "not enough stock to cover the corrected quantity".to_string(),
            ));
        }
    }

    let row = query_as::<_, InventoryTransaction>(
        r#"
        UPDATE public.inventory_transactions SET
          quantity = COALESCE($2, quantity),
          day = COALESCE($3, day)
        WHERE transaction_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(b.quantity)
    .bind(b.day)
    .fetch_one(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(row))
}

/// DELETE /api/v1/inventory/transactions/:id: deleting an outgoing movement
/// restores the stock it took.
pub async fn delete_transaction(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if !ctx.can_access_feature(INV_EDIT) {
        return Err(forbidden("you cannot delete stock transactions"));
    }

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let current = query_as::<_, InventoryTransaction>(
        r#"SELECT * FROM public.inventory_transactions WHERE transaction_id=$1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::NOT_FOUND, "transaction not found".to_string()))?;
    if current.kind != "Outgoing" {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "only outgoing transactions can be deleted".to_string(),
        ));
    }

    query(r#"UPDATE public.inventory_items SET quantity = quantity + $2 WHERE item_id=$1"#)
        .bind(current.item_id)
        .bind(current.quantity)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    query(r#"DELETE FROM public.inventory_transactions WHERE transaction_id=$1"#)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({"deleted": true, "stock_restored": current.quantity})))
}
