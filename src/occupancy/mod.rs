// src/occupancy/mod.rs
//
// The occupancy manager: rooms are collections of bed-slot rows in the
// employees table, and every check-in / assignment / check-out / bed-shift
// flows through the transition operations here so that per-room capacity
// stays reconciled with the slot rows.

pub mod error;
pub mod import;
pub mod model;
pub mod slots;
pub mod summary;
pub mod transitions;

pub use error::OccupancyError;
pub use model::{BedStatus, OccupantInput, BEDSPACE_REMARK, PLACEHOLDER};
