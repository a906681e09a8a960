// src/occupancy/summary.rs

use serde::Serialize;
use sqlx::{query_as, query_scalar, FromRow, PgPool};

use crate::models::Employee;
use crate::occupancy::error::OccupancyError;
use crate::occupancy::model::BedStatus;

#[derive(Debug, Serialize, FromRow)]
pub struct RoomSummary {
    pub room: String,
    pub total_slots: i64,
    pub occupied_slots: i64,
    pub vacant_slots: i64,
}

/// Per-room aggregate for one accommodation. `total_slots` is the explicit
/// capacity; `occupied_slots` counts the occupying statuses (Active, On
/// Leave, Vacation) under the one rule used everywhere.
pub async fn room_summary(
    pool: &PgPool,
    accommodation: &str,
) -> Result<Vec<RoomSummary>, OccupancyError> {
    let rows = query_as::<_, RoomSummary>(
        r#"
        SELECT r.room,
               r.capacity::BIGINT AS total_slots,
               COUNT(e.employee_id) FILTER (WHERE e.status IN ('Active','On Leave','Vacation')) AS occupied_slots,
               COUNT(e.employee_id) FILTER (WHERE e.status = 'Vacant') AS vacant_slots
        FROM public.rooms r
        LEFT JOIN public.employees e
          ON e.accommodation_name = r.accommodation_name AND e.room = r.room
        WHERE r.accommodation_name = $1
        GROUP BY r.room, r.capacity
        ORDER BY r.room
        "#,
    )
    .bind(accommodation)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        // Distinguish "no such accommodation" from "accommodation with no rooms".
        let known: i64 = query_scalar(
            r#"SELECT COUNT(*) FROM public.accommodation_sites WHERE name = $1"#,
        )
        .bind(accommodation)
        .fetch_one(pool)
        .await?;
        if known == 0 {
            return Err(OccupancyError::NotFound(format!(
                "accommodation '{accommodation}'"
            )));
        }
    }
    Ok(rows)
}

#[derive(Debug, Serialize, FromRow)]
pub struct LocationHeadcount {
    pub location: Option<String>,
    pub headcount: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardTotals {
    pub total_employees: i64,
    pub total_vacant_beds: i64,
    pub total_on_vacation: i64,
    pub total_resigned_terminated: i64,
    pub awaiting_room: i64,
    pub location_summary: Vec<LocationHeadcount>,
}

pub async fn dashboard_totals(pool: &PgPool) -> Result<DashboardTotals, OccupancyError> {
    let total_employees: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.employees
           WHERE status IN ('Active','On Leave','Vacation') AND room IS NOT NULL"#,
    )
    .fetch_one(pool)
    .await?;

    let total_vacant_beds: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.employees WHERE status='Vacant'"#)
            .fetch_one(pool)
            .await?;

    let total_on_vacation: i64 =
        query_scalar(r#"SELECT COUNT(*) FROM public.employees WHERE status='Vacation'"#)
            .fetch_one(pool)
            .await?;

    let total_resigned_terminated: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.employees WHERE status IN ('Resigned','Terminated')"#,
    )
    .fetch_one(pool)
    .await?;

    let awaiting_room: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.employees WHERE status='Check-in' AND room IS NULL"#,
    )
    .fetch_one(pool)
    .await?;

    let location_summary = query_as::<_, LocationHeadcount>(
        r#"
        SELECT location, COUNT(*) AS headcount
        FROM public.employees
        WHERE status IN ('Active','On Leave','Vacation') AND room IS NOT NULL
        GROUP BY location
        ORDER BY location
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(DashboardTotals {
        total_employees,
        total_vacant_beds,
        total_on_vacation,
        total_resigned_terminated,
        awaiting_room,
        location_summary,
    })
}

/// Dashboard listing order: vacant beds first, then active staff, departed
/// last; rooms and names break ties.
pub fn sort_for_dashboard(rows: &mut [Employee]) {
    rows.sort_by(|a, b| {
        let ra = BedStatus::parse(&a.status).sort_rank();
        let rb = BedStatus::parse(&b.status).sort_rank();
        ra.cmp(&rb)
            .then_with(|| a.room.cmp(&b.room))
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emp(emp_id: &str, status: &str, room: Option<&str>, name: &str) -> Employee {
        Employee {
            employee_id: 0,
            emp_id: emp_id.into(),
            accommodation_name: room.map(|_| "Camp North".into()),
            room: room.map(Into::into),
            name: name.into(),
            designation: "-".into(),
            nationality: "-".into(),
            mobile_number: "-".into(),
            status: status.into(),
            food_variety: "-".into(),
            meal_time: "-".into(),
            location: None,
            remarks: String::new(),
            check_out_date: None,
            shift_out_date: None,
        }
    }

    #[test]
    fn dashboard_sort_groups_by_status_then_room_then_name() {
        let mut rows = vec![
            emp("E2", "Active", Some("102"), "Zed"),
            emp("101-Vacant-1", "Vacant", Some("101"), "-"),
            emp("E1", "Active", Some("101"), "Ann"),
            emp("E3", "Resigned", Some("103"), "Bob"),
            emp("E4", "Active", Some("102"), "Amy"),
        ];
        sort_for_dashboard(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|e| e.emp_id.as_str()).collect();
        assert_eq!(ids, vec!["101-Vacant-1", "E1", "E4", "E2", "E3"]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        let mut rows = vec![
            emp("E2", "Active", Some("102"), "Zed"),
            emp("E1", "Check-in", None, "Ann"),
        ];
        sort_for_dashboard(&mut rows);
        let first: Vec<String> = rows.iter().map(|e| e.emp_id.clone()).collect();
        sort_for_dashboard(&mut rows);
        let second: Vec<String> = rows.iter().map(|e| e.emp_id.clone()).collect();
        assert_eq!(first, second);
    }
}
