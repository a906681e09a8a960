// src/main.rs

use std::env;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::{Pool, Postgres};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod auth;
mod db;
mod models;
mod occupancy;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize DB pool
    let pool = db::connect().await?;
    let state = AppState { pool };

    // Very permissive CORS for local dev (tighten for prod)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // health
        .route("/health", get(routes::health::health))
        // auth & users
        .route("/api/v1/login", post(routes::users::login))
        .route(
            "/api/v1/users",
            post(routes::users::create_user).get(routes::users::list_users),
        )
        .route(
            "/api/v1/users/:id",
            patch(routes::users::patch_user).delete(routes::users::delete_user),
        )
        .route(
            "/api/v1/users/:id/permissions",
            put(routes::users::set_permissions),
        )
        .route(
            "/api/v1/users/:id/appearance",
            put(routes::users::set_appearance),
        )
        // locations & accommodation sites
        .route(
            "/api/v1/locations",
            post(routes::locations::create_location).get(routes::locations::list_locations),
        )
        .route(
            "/api/v1/locations/:id",
            patch(routes::locations::rename_location).delete(routes::locations::delete_location),
        )
        .route(
            "/api/v1/sites",
            post(routes::sites::create_site).get(routes::sites::list_sites),
        )
        .route("/api/v1/sites/:id", delete(routes::sites::delete_site))
        .route(
            "/api/v1/accommodations/:name/rooms",
            get(routes::sites::list_site_rooms),
        )
        // dashboard
        .route("/api/v1/dashboard", get(routes::dashboard::dashboard))
        // employees
        .route("/api/v1/employees", get(routes::employees::list_employees))
        .route(
            "/api/v1/employees/export",
            get(routes::employees::export_employees),
        )
        .route(
            "/api/v1/employees/awaiting-room",
            get(routes::employees::awaiting_room),
        )
        .route(
            "/api/v1/employees/summaries",
            get(routes::employees::summaries),
        )
        .route(
            "/api/v1/employees/:emp_id",
            get(routes::employees::get_employee).patch(routes::employees::patch_employee),
        )
        // bed lifecycle
        .route("/api/v1/occupancy/check-in", post(routes::occupancy::check_in))
        .route("/api/v1/occupancy/active", post(routes::occupancy::add_active))
        .route("/api/v1/occupancy/assign", post(routes::occupancy::assign))
        .route(
            "/api/v1/occupancy/assign-waiting",
            post(routes::occupancy::assign_waiting),
        )
        .route(
            "/api/v1/occupancy/check-out/:emp_id",
            post(routes::occupancy::check_out),
        )
        .route(
            "/api/v1/occupancy/shift-out/:emp_id",
            post(routes::occupancy::shift_out),
        )
        .route(
            "/api/v1/occupancy/bed-shift/:emp_id",
            post(routes::occupancy::bed_shift),
        )
        .route(
            "/api/v1/occupancy/re-check-in/:emp_id",
            post(routes::occupancy::re_check_in),
        )
        .route("/api/v1/occupancy/vacant-beds", get(routes::occupancy::vacant_beds))
        .route(
            "/api/v1/occupancy/rooms/:accommodation",
            get(routes::occupancy::room_summary_handler),
        )
        .route("/api/v1/occupancy/slots/add", post(routes::occupancy::add_slots))
        .route(
            "/api/v1/occupancy/slots/remove",
            post(routes::occupancy::remove_slots),
        )
        .route("/api/v1/occupancy/import", post(routes::occupancy::import))
        // inventory
        .route("/api/v1/inventory", get(routes::inventory::inventory_dashboard))
        .route("/api/v1/inventory/items", post(routes::inventory::create_item))
        .route("/api/v1/inventory/incoming", post(routes::inventory::incoming))
        .route("/api/v1/inventory/outgoing", post(routes::inventory::outgoing))
        .route(
            "/api/v1/inventory/transactions/list/:kind",
            get(routes::inventory::list_transactions),
        )
        .route(
            "/api/v1/inventory/transactions/:id",
            patch(routes::inventory::patch_transaction)
                .delete(routes::inventory::delete_transaction),
        )
        // maintenance
        .route(
            "/api/v1/maintenance",
            get(routes::maintenance::maintenance_dashboard),
        )
        .route(
            "/api/v1/maintenance/reports",
            post(routes::maintenance::create_report),
        )
        .route(
            "/api/v1/maintenance/reports/list/:status",
            get(routes::maintenance::list_reports),
        )
        .route(
            "/api/v1/maintenance/reports/:id",
            patch(routes::maintenance::patch_report).delete(routes::maintenance::delete_report),
        )
        // AMC services
        .route(
            "/api/v1/amcs",
            post(routes::amcs::create_amc).get(routes::amcs::list_amcs),
        )
        .route("/api/v1/amcs/import", post(routes::amcs::import_amcs))
        .route(
            "/api/v1/amcs/:id",
            patch(routes::amcs::patch_amc).delete(routes::amcs::delete_amc),
        )
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("API listening on {addr}");

    axum::serve(listener, api.into_make_service()).await?;
    Ok(())
}
