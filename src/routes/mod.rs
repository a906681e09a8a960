use axum::http::StatusCode;

use crate::occupancy::OccupancyError;

pub mod amcs;
pub mod dashboard;
pub mod employees;
pub mod health;
pub mod inventory;
pub mod locations;
pub mod maintenance;
pub mod occupancy;
pub mod sites;
pub mod users;

// Common error mapper
pub fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error: {e}"))
}

pub fn forbidden(msg: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::FORBIDDEN, msg.into())
}

/// Maps the occupancy core's typed failures to HTTP statuses. Races on a
/// vacant bed and duplicate ids are conflicts the user can retry; invariant
/// rejections are unprocessable requests (the transaction rolled back).
pub fn occupancy_error(e: OccupancyError) -> (StatusCode, String) {
    let status = match &e {
        OccupancyError::NotFound(_) => StatusCode::NOT_FOUND,
        OccupancyError::SlotAlreadyTaken | OccupancyError::DuplicateIdentifier(_) => {
            StatusCode::CONFLICT
        }
        OccupancyError::InvariantViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OccupancyError::ImportValidation(_) => StatusCode::BAD_REQUEST,
        OccupancyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}
