// src/occupancy/model.rs

use serde::Deserialize;
use std::fmt;

/// Occupant fields on a vacant bed row carry this placeholder.
pub const PLACEHOLDER: &str = "-";
/// Remarks value marking a row as a bare bedspace.
pub const BEDSPACE_REMARK: &str = "Bedspace";

/// Lifecycle state of an employee / bed-slot row. Stored as its exact display
/// string in the database; anything unrecognized round-trips as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BedStatus {
    Active,
    Vacant,
    Vacation,
    OnLeave,
    Resigned,
    Terminated,
    CheckIn,
    ShiftedOut,
    ExEmployee,
    Other(String),
}

impl BedStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "Active" => Self::Active,
            "Vacant" => Self::Vacant,
            "Vacation" => Self::Vacation,
            "On Leave" => Self::OnLeave,
            "Resigned" => Self::Resigned,
            "Terminated" => Self::Terminated,
            "Check-in" => Self::CheckIn,
            "Shifted-out" => Self::ShiftedOut,
            "Ex-Employee" => Self::ExEmployee,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Vacant => "Vacant",
            Self::Vacation => "Vacation",
            Self::OnLeave => "On Leave",
            Self::Resigned => "Resigned",
            Self::Terminated => "Terminated",
            Self::CheckIn => "Check-in",
            Self::ShiftedOut => "Shifted-out",
            Self::ExEmployee => "Ex-Employee",
            Self::Other(s) => s,
        }
    }

    /// Whether this status holds a bed for headcount purposes. One rule
    /// everywhere: people on leave or vacation keep their bed.
    pub fn occupies_bed(&self) -> bool {
        matches!(self, Self::Active | Self::Vacation | Self::OnLeave)
    }

    /// Display rank for dashboard listings: vacant beds first, departed last.
    pub fn sort_rank(&self) -> i32 {
        match self {
            Self::Vacant => -1,
            Self::Active => 0,
            Self::OnLeave => 1,
            Self::Vacation => 2,
            Self::CheckIn => 3,
            Self::Resigned => 4,
            Self::Terminated => 5,
            Self::ShiftedOut => 98,
            Self::ExEmployee => 99,
            Self::Other(_) => 100,
        }
    }
}

impl fmt::Display for BedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated occupant details for check-in and bed-assignment operations.
/// Parsed once at the HTTP boundary; the core never sees raw form data.
#[derive(Debug, Clone, Deserialize)]
pub struct OccupantInput {
    pub emp_id: String,
    pub name: String,
    #[serde(default = "dash")]
    pub designation: String,
    #[serde(default = "dash")]
    pub nationality: String,
    #[serde(default = "dash")]
    pub mobile_number: String,
    #[serde(default = "dash")]
    pub food_variety: String,
    #[serde(default = "dash")]
    pub meal_time: String,
    pub location: Option<String>,
    #[serde(default)]
    pub remarks: String,
}

pub(crate) fn dash() -> String {
    PLACEHOLDER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_exact_strings() {
        for s in [
            "Active",
            "Vacant",
            "Vacation",
            "On Leave",
            "Resigned",
            "Terminated",
            "Check-in",
            "Shifted-out",
            "Ex-Employee",
        ] {
            assert_eq!(BedStatus::parse(s).as_str(), s);
        }
        assert_eq!(BedStatus::parse("Probation").as_str(), "Probation");
    }

    #[test]
    fn occupying_rule_is_active_leave_vacation() {
        assert!(BedStatus::Active.occupies_bed());
        assert!(BedStatus::OnLeave.occupies_bed());
        assert!(BedStatus::Vacation.occupies_bed());
        assert!(!BedStatus::Vacant.occupies_bed());
        assert!(!BedStatus::CheckIn.occupies_bed());
        assert!(!BedStatus::Resigned.occupies_bed());
        assert!(!BedStatus::ExEmployee.occupies_bed());
    }

    #[test]
    fn vacant_sorts_first_departed_last() {
        assert!(BedStatus::Vacant.sort_rank() < BedStatus::Active.sort_rank());
        assert!(BedStatus::ShiftedOut.sort_rank() > BedStatus::Terminated.sort_rank());
        assert!(BedStatus::ExEmployee.sort_rank() > BedStatus::ShiftedOut.sort_rank());
    }
}
