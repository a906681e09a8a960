// src/occupancy/slots.rs
//
// Vacant-slot bookkeeping: synthesized bed ids, adding/removing bedspaces,
// and the capacity reconciliation check every mutating transaction runs.

use serde::Serialize;
use sqlx::{query, query_as, query_scalar, PgPool, Postgres, Transaction};

use crate::models::Employee;
use crate::occupancy::error::OccupancyError;
use crate::occupancy::model::{BEDSPACE_REMARK, PLACEHOLDER};

/// Synthesized id for the n-th vacant bed of a room: `{room}-Vacant-{n}`.
pub fn vacant_emp_id(room: &str, n: u32) -> String {
    format!("{room}-Vacant-{n}")
}

/// Extracts `n` from a `{room}-Vacant-{n}` id, if it belongs to this room.
pub fn vacant_suffix(emp_id: &str, room: &str) -> Option<u32> {
    emp_id
        .strip_prefix(room)?
        .strip_prefix("-Vacant-")?
        .parse()
        .ok()
}

/// Max-plus-one over the suffixes already present for a room. Suffixes are
/// never reused after deletions, which keeps synthesized ids unique.
pub fn next_vacant_suffix<'a>(room: &str, existing: impl IntoIterator<Item = &'a str>) -> u32 {
    existing
        .into_iter()
        .filter_map(|id| vacant_suffix(id, room))
        .max()
        .unwrap_or(0)
        + 1
}

fn like_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Allocates the next free `{room}-Vacant-{n}` id inside the caller's
/// transaction. Locks the matching rows so concurrent allocations for the
/// same room serialize instead of colliding.
pub(crate) async fn allocate_vacant_emp_id(
    tx: &mut Transaction<'_, Postgres>,
    room: &str,
) -> Result<String, OccupancyError> {
    let existing: Vec<String> = query_scalar(
        r#"SELECT emp_id FROM public.employees WHERE emp_id LIKE $1 FOR UPDATE"#,
    )
    .bind(format!("{}-Vacant-%", like_escape(room)))
    .fetch_all(&mut **tx)
    .await?;

    let n = next_vacant_suffix(room, existing.iter().map(String::as_str));
    Ok(vacant_emp_id(room, n))
}

/// Inserts one fresh vacant bed row for a room and returns its emp_id.
pub(crate) async fn insert_vacant_row(
    tx: &mut Transaction<'_, Postgres>,
    accommodation: &str,
    room: &str,
    location: Option<&str>,
) -> Result<String, OccupancyError> {
    let emp_id = allocate_vacant_emp_id(tx, room).await?;
    query(
        r#"
        INSERT INTO public.employees
            (emp_id, accommodation_name, room, name, designation, nationality,
             mobile_number, status, food_variety, meal_time, location, remarks)
        VALUES ($1,$2,$3,$4,$4,$4,$4,'Vacant',$4,$4,$5,$6)
        "#,
    )
    .bind(&emp_id)
    .bind(accommodation)
    .bind(room)
    .bind(PLACEHOLDER)
    .bind(location)
    .bind(BEDSPACE_REMARK)
    .execute(&mut **tx)
    .await?;
    Ok(emp_id)
}

/// The room's stored capacity must equal the number of slot rows placed in
/// it. Run before commit by every transition that touched a room.
pub(crate) async fn assert_room_capacity(
    tx: &mut Transaction<'_, Postgres>,
    accommodation: &str,
    room: &str,
) -> Result<(), OccupancyError> {
    let capacity: Option<i64> = query_scalar(
        r#"SELECT capacity::BIGINT FROM public.rooms WHERE accommodation_name=$1 AND room=$2"#,
    )
    .bind(accommodation)
    .bind(room)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(capacity) = capacity else {
        return Err(OccupancyError::InvariantViolation(format!(
            "room {accommodation}/{room} has no capacity record"
        )));
    };

    let rows: i64 = query_scalar(
        r#"SELECT COUNT(*) FROM public.employees WHERE accommodation_name=$1 AND room=$2"#,
    )
    .bind(accommodation)
    .bind(room)
    .fetch_one(&mut **tx)
    .await?;

    if rows != capacity {
        return Err(OccupancyError::InvariantViolation(format!(
            "room {accommodation}/{room} holds {rows} slot rows but capacity is {capacity}"
        )));
    }
    Ok(())
}

/// Makes sure the accommodation is known as a site, tagging it with the given
/// location when the site is new. Existing associations are left alone.
pub(crate) async fn ensure_site(
    tx: &mut Transaction<'_, Postgres>,
    accommodation: &str,
    location: Option<&str>,
) -> Result<(), OccupancyError> {
    let tag_id: Option<i64> = match location {
        Some(loc) if !loc.trim().is_empty() => {
            query_scalar(
                r#"
                INSERT INTO public.location_tags(name) VALUES ($1)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING location_tag_id
                "#,
            )
            .bind(loc)
            .fetch_optional(&mut **tx)
            .await?
        }
        _ => None,
    };

    query(
        r#"
        INSERT INTO public.accommodation_sites(name, location_tag_id)
        VALUES ($1,$2)
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(accommodation)
    .bind(tag_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list_vacant_slots(
    pool: &PgPool,
    accommodation: Option<&str>,
    room: Option<&str>,
) -> Result<Vec<Employee>, OccupancyError> {
    let rows = query_as::<_, Employee>(
        r#"
        SELECT * FROM public.employees
        WHERE status = 'Vacant'
          AND ($1::TEXT IS NULL OR accommodation_name = $1)
          AND ($2::TEXT IS NULL OR room = $2)
        ORDER BY accommodation_name, room, employee_id
        "#,
    )
    .bind(accommodation)
    .bind(room)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Creates `count` new bedspaces in a room and grows its capacity to match.
/// Returns the synthesized ids, in creation order.
pub async fn add_vacant_slots(
    pool: &PgPool,
    accommodation: &str,
    room: &str,
    count: u32,
) -> Result<Vec<String>, OccupancyError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let mut tx = pool.begin().await?;

    ensure_site(&mut tx, accommodation, None).await?;
    query(
        r#"
        INSERT INTO public.rooms(accommodation_name, room, capacity)
        VALUES ($1,$2,$3)
        ON CONFLICT (accommodation_name, room)
        DO UPDATE SET capacity = public.rooms.capacity + EXCLUDED.capacity
        "#,
    )
    .bind(accommodation)
    .bind(room)
    .bind(count as i32)
    .execute(&mut *tx)
    .await?;

    let mut created = Vec::with_capacity(count as usize);
    for _ in 0..count {
        created.push(insert_vacant_row(&mut tx, accommodation, room, None).await?);
    }

    assert_room_capacity(&mut tx, accommodation, room).await?;
    tx.commit().await?;
    Ok(created)
}

#[derive(Debug, Serialize)]
pub struct RemovalOutcome {
    pub requested: i64,
    pub removed: i64,
    /// Fewer vacant rows existed than requested; the deletes that did happen
    /// are kept (warning, not a rollback). A room with no vacant rows at all
    /// reports `removed: 0` the same way, it is not an error.
    pub insufficient: bool,
}

fn removal_outcome(requested: i64, removed: i64) -> RemovalOutcome {
    RemovalOutcome {
        requested,
        removed,
        insufficient: removed < requested,
    }
}

/// Deletes up to `count` vacant rows from a room, newest first, shrinking
/// capacity by however many actually went away. Finding fewer than requested
/// (zero included) is a flagged partial success, never a rollback.
pub async fn remove_vacant_slots(
    pool: &PgPool,
    accommodation: &str,
    room: &str,
    count: u32,
) -> Result<RemovalOutcome, OccupancyError> {
    let mut tx = pool.begin().await?;

    let victims: Vec<i64> = query_scalar(
        r#"
        SELECT employee_id FROM public.employees
        WHERE accommodation_name=$1 AND room=$2 AND status='Vacant'
        ORDER BY employee_id DESC
        LIMIT $3
        FOR UPDATE
        "#,
    )
    .bind(accommodation)
    .bind(room)
    .bind(count as i64)
    .fetch_all(&mut *tx)
    .await?;

    let removed = victims.len() as i64;
    if removed > 0 {
        query(r#"DELETE FROM public.employees WHERE employee_id = ANY($1)"#)
            .bind(&victims)
            .execute(&mut *tx)
            .await?;
        query(
            r#"UPDATE public.rooms SET capacity = capacity - $3
               WHERE accommodation_name=$1 AND room=$2"#,
        )
        .bind(accommodation)
        .bind(room)
        .bind(removed as i32)
        .execute(&mut *tx)
        .await?;
        assert_room_capacity(&mut tx, accommodation, room).await?;
    }

    tx.commit().await?;
    Ok(removal_outcome(count as i64, removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_parses_only_matching_room() {
        assert_eq!(vacant_suffix("A-101-Vacant-3", "A-101"), Some(3));
        assert_eq!(vacant_suffix("A-101-Vacant-3", "A-10"), None);
        assert_eq!(vacant_suffix("A-101-Vacant-x", "A-101"), None);
        assert_eq!(vacant_suffix("E5512", "A-101"), None);
    }

    #[test]
    fn next_suffix_is_max_plus_one() {
        let ids = ["A-101-Vacant-1", "A-101-Vacant-7", "B-2-Vacant-9", "E55"];
        assert_eq!(next_vacant_suffix("A-101", ids), 8);
    }

    #[test]
    fn next_suffix_starts_at_one_for_fresh_room() {
        assert_eq!(next_vacant_suffix("C-9", []), 1);
    }

    #[test]
    fn deleted_suffixes_are_not_reused() {
        // Slot 1 was deleted earlier; only slot 4 remains.
        let ids = ["A-101-Vacant-4"];
        let next = next_vacant_suffix("A-101", ids);
        assert_eq!(next, 5);
        assert_eq!(vacant_emp_id("A-101", next), "A-101-Vacant-5");
    }

    #[test]
    fn like_escape_covers_wildcards() {
        assert_eq!(like_escape("A_1%"), "A\\_1\\%");
    }

    #[test]
    fn shortfall_is_a_warning_even_at_zero() {
        let full = removal_outcome(3, 3);
        assert!(!full.insufficient);

        let partial = removal_outcome(5, 2);
        assert!(partial.insufficient);
        assert_eq!(partial.removed, 2);

        // A room with no vacant rows reports the same shape, not an error.
        let empty = removal_outcome(4, 0);
        assert!(empty.insufficient);
        assert_eq!(empty.removed, 0);
        assert_eq!(empty.requested, 4);
    }
}
