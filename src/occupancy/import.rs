// src/occupancy/import.rs
//
// Bulk spreadsheet reconciliation. The upload collaborator parses the file
// into `ImportRow`s; this module plans the replacement (pure) and applies it
// in a single transaction: accommodations named in the file are rebuilt from
// scratch, everything else is untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::{query, PgPool};

use crate::occupancy::error::{map_unique, OccupancyError};
use crate::occupancy::model::{dash, BEDSPACE_REMARK, PLACEHOLDER};
use crate::occupancy::slots::{ensure_site, vacant_emp_id};

/// Hard bound on one import, so a single transaction never holds thousands
/// of row inserts open. Larger files must be split by the caller.
pub const MAX_IMPORT_ROWS: usize = 5000;

/// One parsed spreadsheet row. Required columns are non-optional fields:
/// a file missing any of them fails to deserialize and nothing is applied.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    pub accommodation_name: String,
    pub room: String,
    pub emp_id: String,
    pub status: String,
    pub name: String,
    pub location: String,
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
    #[serde(default)]
    pub remarks: String,
}

fn missing(field: &str) -> bool {
    let t = field.trim();
    t.is_empty() || t.eq_ignore_ascii_case("n/a")
}

#[derive(Debug, Clone)]
pub(crate) struct PlannedRow {
    pub emp_id: String,
    pub accommodation_name: String,
    pub room: String,
    pub status: String,
    pub name: String,
    pub designation: String,
    pub nationality: String,
    pub mobile_number: String,
    pub food_variety: String,
    pub meal_time: String,
    pub location: Option<String>,
    pub remarks: String,
}

#[derive(Debug)]
pub struct ImportPlan {
    pub accommodations: BTreeSet<String>,
    pub skipped_duplicates: Vec<String>,
    pub(crate) rows: Vec<PlannedRow>,
    /// Bed count per (accommodation, room); becomes the room's capacity.
    pub(crate) room_capacity: BTreeMap<(String, String), i32>,
    /// Location seen first for each accommodation, for site auto-creation.
    pub(crate) site_locations: BTreeMap<String, Option<String>>,
}

/// Pure planning pass: validates rows, drops duplicate employee ids (first
/// occurrence wins), numbers vacant beds with per-room counters starting at 1.
pub fn plan_import(rows: &[ImportRow]) -> Result<ImportPlan, OccupancyError> {
    if rows.len() > MAX_IMPORT_ROWS {
        return Err(OccupancyError::ImportValidation(format!(
            "{} rows exceeds the {MAX_IMPORT_ROWS}-row import limit",
            rows.len()
        )));
    }

    let mut plan = ImportPlan {
        accommodations: BTreeSet::new(),
        skipped_duplicates: Vec::new(),
        rows: Vec::new(),
        room_capacity: BTreeMap::new(),
        site_locations: BTreeMap::new(),
    };
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut reported: HashSet<String> = HashSet::new();
    // Counters keyed by room name alone: synthesized ids embed only the room,
    // so sharing the counter across accommodations keeps them unique.
    let mut vacant_counters: HashMap<String, u32> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        if missing(&row.accommodation_name) || missing(&row.room) {
            continue;
        }
        let accommodation = row.accommodation_name.trim().to_string();
        let room = row.room.trim().to_string();
        let location = if missing(&row.location) {
            None
        } else {
            Some(row.location.trim().to_string())
        };

        plan.accommodations.insert(accommodation.clone());
        plan.site_locations
            .entry(accommodation.clone())
            .or_insert_with(|| location.clone());

        let is_vacant = row.status.trim().eq_ignore_ascii_case("vacant");
        let (emp_id, status, name, remarks) = if is_vacant {
            let counter = vacant_counters.entry(room.clone()).or_insert(0);
            let mut id;
            loop {
                *counter += 1;
                id = vacant_emp_id(&room, *counter);
                if !seen_ids.contains(&id) {
                    break;
                }
            }
            (
                id,
                "Vacant".to_string(),
                PLACEHOLDER.to_string(),
                BEDSPACE_REMARK.to_string(),
            )
        } else {
            let emp_id = row.emp_id.trim().to_string();
            if missing(&emp_id) {
                return Err(OccupancyError::ImportValidation(format!(
                    "row {}: non-vacant row has no employee id",
                    idx + 1
                )));
            }
            if seen_ids.contains(&emp_id) {
                if reported.insert(emp_id.clone()) {
                    plan.skipped_duplicates.push(emp_id);
                }
                continue;
            }
            (
                emp_id,
                row.status.trim().to_string(),
                row.name.trim().to_string(),
                row.remarks.clone(),
            )
        };
        seen_ids.insert(emp_id.clone());

        let (designation, nationality, mobile_number, food_variety, meal_time) = if is_vacant {
            (dash(), dash(), dash(), dash(), dash())
        } else {
            (
                row.designation.clone(),
                row.nationality.clone(),
                row.mobile_number.clone(),
                row.food_variety.clone(),
                row.meal_time.clone(),
            )
        };

        *plan
            .room_capacity
            .entry((accommodation.clone(), room.clone()))
            .or_insert(0) += 1;
        plan.rows.push(PlannedRow {
            emp_id,
            accommodation_name: accommodation,
            room,
            status,
            name,
            designation,
            nationality,
            mobile_number,
            food_variety,
            meal_time,
            location,
            remarks,
        });
    }

    Ok(plan)
}

#[derive(Debug, Serialize)]
pub struct ImportOutcome {
    pub accommodations: Vec<String>,
    pub inserted: usize,
    pub skipped_duplicates: Vec<String>,
}

/// Applies a planned import atomically: delete every row (occupied and
/// vacant) for the accommodations in the file, then rebuild rooms and slot
/// rows from the plan. Any failure rolls the whole thing back.
pub async fn bulk_import(
    pool: &PgPool,
    rows: Vec<ImportRow>,
) -> Result<ImportOutcome, OccupancyError> {
    let plan = plan_import(&rows)?;
    let accommodations: Vec<String> = plan.accommodations.iter().cloned().collect();
    if accommodations.is_empty() {
        return Ok(ImportOutcome {
            accommodations,
            inserted: 0,
            skipped_duplicates: plan.skipped_duplicates,
        });
    }

    let mut tx = pool.begin().await?;

    query(r#"DELETE FROM public.employees WHERE accommodation_name = ANY($1)"#)
        .bind(&accommodations)
        .execute(&mut *tx)
        .await?;
    query(r#"DELETE FROM public.rooms WHERE accommodation_name = ANY($1)"#)
        .bind(&accommodations)
        .execute(&mut *tx)
        .await?;

    for (acc, location) in &plan.site_locations {
        ensure_site(&mut tx, acc, location.as_deref()).await?;
    }

    for ((acc, room), capacity) in &plan.room_capacity {
        query(r#"INSERT INTO public.rooms(accommodation_name, room, capacity) VALUES ($1,$2,$3)"#)
            .bind(acc)
            .bind(room)
            .bind(capacity)
            .execute(&mut *tx)
            .await?;
    }

    for row in &plan.rows {
        query(
            r#"
            INSERT INTO public.employees
                (emp_id, accommodation_name, room, name, designation, nationality,
                 mobile_number, status, food_variety, meal_time, location, remarks)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            "#,
        )
        .bind(&row.emp_id)
        .bind(&row.accommodation_name)
        .bind(&row.room)
        .bind(&row.name)
        .bind(&row.designation)
        .bind(&row.nationality)
        .bind(&row.mobile_number)
        .bind(&row.status)
        .bind(&row.food_variety)
        .bind(&row.meal_time)
        .bind(&row.location)
        .bind(&row.remarks)
        .execute(&mut *tx)
        .await
        // A collision with an accommodation the file does not replace still
        // aborts the import as a whole.
        .map_err(|e| map_unique(e, &row.emp_id))?;
    }

    tx.commit().await?;
    Ok(ImportOutcome {
        accommodations,
        inserted: plan.rows.len(),
        skipped_duplicates: plan.skipped_duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(acc: &str, room: &str, emp_id: &str, status: &str, name: &str) -> ImportRow {
        ImportRow {
            accommodation_name: acc.into(),
            room: room.into(),
            emp_id: emp_id.into(),
            status: status.into(),
            name: name.into(),
            location: "Site-West".into(),
            designation: "-".into(),
            nationality: "-".into(),
            mobile_number: "-".into(),
            food_variety: "-".into(),
            meal_time: "-".into(),
            remarks: String::new(),
        }
    }

    #[test]
    fn duplicate_emp_ids_first_occurrence_wins() {
        let rows = vec![
            row("Camp North", "101", "E1", "Active", "First"),
            row("Camp North", "102", "E1", "Active", "Second"),
            row("Camp North", "103", "E2", "Active", "Third"),
        ];
        let plan = plan_import(&rows).unwrap();
        assert_eq!(plan.rows.len(), 2);
        assert_eq!(plan.rows[0].name, "First");
        assert_eq!(plan.skipped_duplicates, vec!["E1".to_string()]);
    }

    #[test]
    fn rows_without_placement_are_skipped() {
        let rows = vec![
            row("", "101", "E1", "Active", "A"),
            row("Camp North", "N/A", "E2", "Active", "B"),
            row("Camp North", "101", "E3", "Active", "C"),
        ];
        let plan = plan_import(&rows).unwrap();
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.rows[0].emp_id, "E3");
        assert_eq!(plan.accommodations.len(), 1);
    }

    #[test]
    fn vacant_counters_start_at_one_per_room() {
        let rows = vec![
            row("Camp North", "101", "", "vacant", ""),
            row("Camp North", "101", "", "VACANT", ""),
            row("Camp North", "102", "", "Vacant", ""),
        ];
        let plan = plan_import(&rows).unwrap();
        let ids: Vec<&str> = plan.rows.iter().map(|r| r.emp_id.as_str()).collect();
        assert_eq!(ids, vec!["101-Vacant-1", "101-Vacant-2", "102-Vacant-1"]);
    }

    #[test]
    fn shared_room_name_across_accommodations_stays_unique() {
        let rows = vec![
            row("Camp North", "101", "", "Vacant", ""),
            row("Camp South", "101", "", "Vacant", ""),
        ];
        let plan = plan_import(&rows).unwrap();
        let ids: Vec<&str> = plan.rows.iter().map(|r| r.emp_id.as_str()).collect();
        assert_eq!(ids, vec!["101-Vacant-1", "101-Vacant-2"]);
    }

    #[test]
    fn vacant_rows_get_placeholder_occupant_fields() {
        let mut r = row("Camp North", "101", "E9", "vacant", "Leftover Name");
        r.designation = "Welder".into();
        let plan = plan_import(&[r]).unwrap();
        let planned = &plan.rows[0];
        assert_eq!(planned.status, "Vacant");
        assert_eq!(planned.name, PLACEHOLDER);
        assert_eq!(planned.designation, PLACEHOLDER);
        assert_eq!(planned.remarks, BEDSPACE_REMARK);
    }

    #[test]
    fn synthesized_id_skips_real_id_collision() {
        let rows = vec![
            row("Camp North", "101", "101-Vacant-1", "Active", "Oddly Named"),
            row("Camp North", "101", "", "Vacant", ""),
        ];
        let plan = plan_import(&rows).unwrap();
        let ids: Vec<&str> = plan.rows.iter().map(|r| r.emp_id.as_str()).collect();
        assert_eq!(ids, vec!["101-Vacant-1", "101-Vacant-2"]);
    }

    #[test]
    fn capacity_counts_every_slot_row() {
        let rows = vec![
            row("Camp North", "101", "E1", "Active", "A"),
            row("Camp North", "101", "", "Vacant", ""),
            row("Camp North", "101", "E2", "On Leave", "B"),
            row("Camp North", "102", "E3", "Active", "C"),
        ];
        let plan = plan_import(&rows).unwrap();
        assert_eq!(
            plan.room_capacity
                .get(&("Camp North".to_string(), "101".to_string())),
            Some(&3)
        );
        assert_eq!(
            plan.room_capacity
                .get(&("Camp North".to_string(), "102".to_string())),
            Some(&1)
        );
    }

    #[test]
    fn non_vacant_row_without_emp_id_is_rejected() {
        let rows = vec![row("Camp North", "101", "N/A", "Active", "A")];
        let err = plan_import(&rows).unwrap_err();
        assert!(matches!(err, OccupancyError::ImportValidation(_)));
    }

    #[test]
    fn oversized_import_fails_fast() {
        let rows: Vec<ImportRow> = (0..=MAX_IMPORT_ROWS)
            .map(|i| row("Camp North", "101", &format!("E{i}"), "Active", "x"))
            .collect();
        assert!(matches!(
            plan_import(&rows),
            Err(OccupancyError::ImportValidation(_))
        ));
    }
}
