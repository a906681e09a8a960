// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ───────────────────────────────────────
// Users (role string + location/feature permissions)
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppUser {
    pub user_id: i64,
    pub username: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub role: String,
    pub allowed_locations: Vec<String>, // text[]
    pub permissions: Vec<String>,       // text[]
    pub theme: String,
    pub font_style: String,
    pub font_size: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Housing reference data
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct LocationTag {
    pub location_tag_id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AccommodationSite {
    pub accommodation_site_id: i64,
    pub name: String,
    pub location_tag_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub room_id: i64,
    pub accommodation_name: String,
    pub room: String,
    pub capacity: i32,
}

// ───────────────────────────────────────
// Employee / bed slot (dual-role row; status 'Vacant' means empty bed)
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub employee_id: i64,
    pub emp_id: String,
    pub accommodation_name: Option<String>,
    pub room: Option<String>,
    pub name: String,
    pub designation: String,
    pub nationality: String,
    pub mobile_number: String,
    pub status: String,
    pub food_variety: String,
    pub meal_time: String,
    pub location: Option<String>,
    pub remarks: String,
    pub check_out_date: Option<NaiveDate>,
    pub shift_out_date: Option<NaiveDate>,
}

// ───────────────────────────────────────
// Inventory
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub item_id: i64,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct InventoryTransaction {
    pub transaction_id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub kind: String, // Incoming | Outgoing
    pub quantity: i32,
    pub day: NaiveDate,
    pub emp_id: Option<String>,
    pub room_number: Option<String>,
    pub lpo_number: Option<String>,
    pub supplier_name: Option<String>,
    pub attached_file: Option<String>,
}

// ───────────────────────────────────────
// Maintenance & AMC services
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MaintenanceReport {
    pub report_id: i64,
    pub block: String,
    pub section: String,
    pub report_date: NaiveDate,
    pub details: String,
    pub status: String, // Open | Closed
    pub closed_date: Option<NaiveDate>,
    pub concern: Option<String>,
    pub risk: Option<String>,
    pub remarks: Option<String>,
    pub attached_file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AmcService {
    pub amc_id: i64,
    pub service_id: String,
    pub recorded_on: NaiveDate,
    pub description: Option<String>,
    pub supplier_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cost: Option<f64>,
    pub kind: Option<String>,
    pub remarks: Option<String>,
    pub duration_days: i32,
    pub remaining_days: i32,
    pub attached_file: Option<String>,
}
