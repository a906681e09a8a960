// src/occupancy/transitions.rs
//
// State-transition operations on employee / bed-slot rows. Each operation is
// one transaction; transitions that consume a vacant bed lock the target row
// and re-verify it is still vacant before committing, so two racing callers
// cannot both take the same bed.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use sqlx::{query, query_as, query_scalar, PgPool, Postgres, Transaction};

use crate::models::Employee;
use crate::occupancy::error::{map_unique, OccupancyError};
use crate::occupancy::model::{BedStatus, OccupantInput};
use crate::occupancy::slots::{assert_room_capacity, ensure_site, insert_vacant_row};

#[derive(Debug, Serialize)]
pub struct DepartureOutcome {
    pub employee: Employee,
    /// emp_id of the vacant row left behind, when the person held a bed.
    pub vacated_bed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BedShiftOutcome {
    pub employee: Employee,
    pub vacated_bed: String,
    pub consumed_bed: String,
}

async fn lock_by_emp_id(
    tx: &mut Transaction<'_, Postgres>,
    emp_id: &str,
) -> Result<Employee, OccupancyError> {
    query_as::<_, Employee>(r#"SELECT * FROM public.employees WHERE emp_id=$1 FOR UPDATE"#)
        .bind(emp_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| OccupancyError::NotFound(format!("employee '{emp_id}'")))
}

async fn lock_vacant_target(
    tx: &mut Transaction<'_, Postgres>,
    vacant_bed_id: i64,
) -> Result<Employee, OccupancyError> {
    let bed = query_as::<_, Employee>(
        r#"SELECT * FROM public.employees WHERE employee_id=$1 FOR UPDATE"#,
    )
    .bind(vacant_bed_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| OccupancyError::NotFound(format!("vacant bed #{vacant_bed_id}")))?;

    // The optimistic check: someone may have taken this bed since it was listed.
    if BedStatus::parse(&bed.status) != BedStatus::Vacant {
        return Err(OccupancyError::SlotAlreadyTaken);
    }
    Ok(bed)
}

async fn ensure_emp_id_free(
    tx: &mut Transaction<'_, Postgres>,
    emp_id: &str,
    exclude_row: Option<i64>,
) -> Result<(), OccupancyError> {
    let holder: Option<i64> =
        query_scalar(r#"SELECT employee_id FROM public.employees WHERE emp_id=$1"#)
            .bind(emp_id)
            .fetch_optional(&mut **tx)
            .await?;
    match holder {
        Some(id) if Some(id) != exclude_row => {
            Err(OccupancyError::DuplicateIdentifier(emp_id.to_string()))
        }
        _ => Ok(()),
    }
}

/// Records a new employee who has no room yet (status `Check-in`).
pub async fn check_in(pool: &PgPool, input: OccupantInput) -> Result<Employee, OccupancyError> {
    let mut tx = pool.begin().await?;
    ensure_emp_id_free(&mut tx, &input.emp_id, None).await?;

    let row = query_as::<_, Employee>(
        r#"
        INSERT INTO public.employees
            (emp_id, accommodation_name, room, name, designation, nationality,
             mobile_number, status, food_variety, meal_time, location, remarks)
        VALUES ($1, NULL, NULL, $2, $3, $4, $5, 'Check-in', $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&input.emp_id)
    .bind(&input.name)
    .bind(&input.designation)
    .bind(&input.nationality)
    .bind(&input.mobile_number)
    .bind(&input.food_variety)
    .bind(&input.meal_time)
    .bind(&input.location)
    .bind(&input.remarks)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique(e, &input.emp_id))?;

    tx.commit().await?;
    Ok(row)
}

/// Adds a new active employee directly into a room. The room gains one bed:
/// capacity grows with the fresh row.
pub async fn add_active(
    pool: &PgPool,
    input: OccupantInput,
    accommodation: &str,
    room: &str,
) -> Result<Employee, OccupancyError> {
    let mut tx = pool.begin().await?;
    ensure_emp_id_free(&mut tx, &input.emp_id, None).await?;
    ensure_site(&mut tx, accommodation, input.location.as_deref()).await?;

    query(
        r#"
        INSERT INTO public.rooms(accommodation_name, room, capacity)
        VALUES ($1,$2,1)
        ON CONFLICT (accommodation_name, room)
        DO UPDATE SET capacity = public.rooms.capacity + 1
        "#,
    )
    .bind(accommodation)
    .bind(room)
    .execute(&mut *tx)
    .await?;

    let row = query_as::<_, Employee>(
        r#"
        INSERT INTO public.employees
            (emp_id, accommodation_name, room, name, designation, nationality,
             mobile_number, status, food_variety, meal_time, location, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'Active', $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&input.emp_id)
    .bind(accommodation)
    .bind(room)
    .bind(&input.name)
    .bind(&input.designation)
    .bind(&input.nationality)
    .bind(&input.mobile_number)
    .bind(&input.food_variety)
    .bind(&input.meal_time)
    .bind(&input.location)
    .bind(&input.remarks)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique(e, &input.emp_id))?;

    assert_room_capacity(&mut tx, accommodation, room).await?;
    tx.commit().await?;
    Ok(row)
}

/// Puts a new occupant into an existing vacant bed. The vacant row is
/// consumed in place: its placeholder fields are overwritten and it becomes
/// the employee's row.
pub async fn assign(
    pool: &PgPool,
    vacant_bed_id: i64,
    input: OccupantInput,
) -> Result<Employee, OccupancyError> {
    let mut tx = pool.begin().await?;
    let bed = lock_vacant_target(&mut tx, vacant_bed_id).await?;
    ensure_emp_id_free(&mut tx, &input.emp_id, Some(bed.employee_id)).await?;

    let row = query_as::<_, Employee>(
        r#"
        UPDATE public.employees SET
            emp_id = $2,
            name = $3,
            designation = $4,
            nationality = $5,
            mobile_number = $6,
            status = 'Active',
            food_variety = $7,
            meal_time = $8,
            location = COALESCE($9, location),
            remarks = $10
        WHERE employee_id = $1
        RETURNING *
        "#,
    )
    .bind(bed.employee_id)
    .bind(&input.emp_id)
    .bind(&input.name)
    .bind(&input.designation)
    .bind(&input.nationality)
    .bind(&input.mobile_number)
    .bind(&input.food_variety)
    .bind(&input.meal_time)
    .bind(&input.location)
    .bind(&input.remarks)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique(e, &input.emp_id))?;

    if let (Some(acc), Some(room)) = (bed.accommodation_name.as_deref(), bed.room.as_deref()) {
        assert_room_capacity(&mut tx, acc, room).await?;
    }
    tx.commit().await?;
    Ok(row)
}

/// Statuses allowed to take a vacant bed through `assign_waiting`: a row
/// awaiting its first room, or a reactivated room-less row. Departed rows
/// must pass through `re_check_in` first so their terminal dates are cleared
/// deliberately, not dropped as a side effect.
pub fn guard_waiting_status(status: &BedStatus) -> Result<(), OccupancyError> {
    match status {
        BedStatus::CheckIn | BedStatus::Active => Ok(()),
        other => Err(OccupancyError::InvariantViolation(format!(
            "a '{other}' row cannot take a bed; re-check-in first"
        ))),
    }
}

/// Moves a room-less employee (awaiting check-in) into a vacant bed. The
/// waiting row is deleted and its identity migrates onto the bed row.
pub async fn assign_waiting(
    pool: &PgPool,
    emp_id: &str,
    vacant_bed_id: i64,
) -> Result<Employee, OccupancyError> {
    let mut tx = pool.begin().await?;
    let waiting = lock_by_emp_id(&mut tx, emp_id).await?;

    if waiting.room.is_some() {
        return Err(OccupancyError::InvariantViolation(format!(
            "employee '{emp_id}' already holds a bed"
        )));
    }
    guard_waiting_status(&BedStatus::parse(&waiting.status))?;
    let bed = lock_vacant_target(&mut tx, vacant_bed_id).await?;

    // Delete first so the emp_id can move onto the bed row without tripping
    // the unique constraint.
    query(r#"DELETE FROM public.employees WHERE employee_id=$1"#)
        .bind(waiting.employee_id)
        .execute(&mut *tx)
        .await?;

    let row = query_as::<_, Employee>(
        r#"
        UPDATE public.employees SET
            emp_id = $2,
            name = $3,
            designation = $4,
            nationality = $5,
            mobile_number = $6,
            status = 'Active',
            food_variety = $7,
            meal_time = $8,
            location = COALESCE($9, location),
            remarks = $10
        WHERE employee_id = $1
        RETURNING *
        "#,
    )
    .bind(bed.employee_id)
    .bind(&waiting.emp_id)
    .bind(&waiting.name)
    .bind(&waiting.designation)
    .bind(&waiting.nationality)
    .bind(&waiting.mobile_number)
    .bind(&waiting.food_variety)
    .bind(&waiting.meal_time)
    .bind(&waiting.location)
    .bind(&waiting.remarks)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_unique(e, &waiting.emp_id))?;

    if let (Some(acc), Some(room)) = (bed.accommodation_name.as_deref(), bed.room.as_deref()) {
        assert_room_capacity(&mut tx, acc, room).await?;
    }
    tx.commit().await?;
    Ok(row)
}

enum Departure {
    CheckOut,
    ShiftOut,
}

/// Shared body of check-out and shift-out: stamp the terminal date, clear the
/// placement, and leave exactly one new vacant row behind for the bed held.
async fn depart(
    pool: &PgPool,
    emp_id: &str,
    kind: Departure,
) -> Result<DepartureOutcome, OccupancyError> {
    let mut tx = pool.begin().await?;
    let employee = lock_by_emp_id(&mut tx, emp_id).await?;

    if BedStatus::parse(&employee.status) == BedStatus::Vacant {
        return Err(OccupancyError::InvariantViolation(format!(
            "'{emp_id}' is a vacant bedspace, not an employee"
        )));
    }

    let today: NaiveDate = Local::now().date_naive();
    let held = employee
        .accommodation_name
        .as_deref()
        .zip(employee.room.as_deref())
        .map(|(a, r)| (a.to_string(), r.to_string()));

    let updated = match kind {
        Departure::CheckOut => {
            query_as::<_, Employee>(
                r#"
                UPDATE public.employees SET
                    status = 'Ex-Employee',
                    check_out_date = $2,
                    accommodation_name = NULL,
                    room = NULL,
                    location = NULL
                WHERE employee_id = $1
                RETURNING *
                "#,
            )
            .bind(employee.employee_id)
            .bind(today)
            .fetch_one(&mut *tx)
            .await?
        }
        Departure::ShiftOut => {
            query_as::<_, Employee>(
                r#"
                UPDATE public.employees SET
                    status = 'Check-in',
                    shift_out_date = $2,
                    accommodation_name = NULL,
                    room = NULL,
                    location = NULL
                WHERE employee_id = $1
                RETURNING *
                "#,
            )
            .bind(employee.employee_id)
            .bind(today)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    let mut vacated_bed = None;
    if let Some((acc, room)) = held {
        let id =
            insert_vacant_row(&mut tx, &acc, &room, employee.location.as_deref()).await?;
        assert_room_capacity(&mut tx, &acc, &room).await?;
        vacated_bed = Some(id);
    }

    tx.commit().await?;
    Ok(DepartureOutcome {
        employee: updated,
        vacated_bed,
    })
}

/// Terminal departure: the employee becomes `Ex-Employee` and their bed, if
/// any, reappears as a vacant row (capacity conserved).
pub async fn check_out(pool: &PgPool, emp_id: &str) -> Result<DepartureOutcome, OccupancyError> {
    depart(pool, emp_id, Departure::CheckOut).await
}

/// Temporary departure: the employee goes back to awaiting-room status while
/// their old bed reappears as a vacant row.
pub async fn shift_out(pool: &PgPool, emp_id: &str) -> Result<DepartureOutcome, OccupancyError> {
    depart(pool, emp_id, Departure::ShiftOut).await
}

/// Moves a bed-holding employee onto a different vacant bed: the old bed gets
/// a fresh vacant row, the target vacant row is consumed.
pub async fn bed_shift(
    pool: &PgPool,
    emp_id: &str,
    vacant_bed_id: i64,
) -> Result<BedShiftOutcome, OccupancyError> {
    let mut tx = pool.begin().await?;
    let employee = lock_by_emp_id(&mut tx, emp_id).await?;

    let (Some(old_acc), Some(old_room)) = (
        employee.accommodation_name.clone(),
        employee.room.clone(),
    ) else {
        return Err(OccupancyError::InvariantViolation(format!(
            "employee '{emp_id}' holds no bed to shift from"
        )));
    };

    let bed = lock_vacant_target(&mut tx, vacant_bed_id).await?;
    if bed.employee_id == employee.employee_id {
        return Err(OccupancyError::InvariantViolation(
            "cannot shift an employee onto their own row".into(),
        ));
    }

    let vacated_bed = insert_vacant_row(
        &mut tx,
        &old_acc,
        &old_room,
        employee.location.as_deref(),
    )
    .await?;

    let updated = query_as::<_, Employee>(
        r#"
        UPDATE public.employees SET
            accommodation_name = $2,
            room = $3,
            location = $4
        WHERE employee_id = $1
        RETURNING *
        "#,
    )
    .bind(employee.employee_id)
    .bind(&bed.accommodation_name)
    .bind(&bed.room)
    .bind(&bed.location)
    .fetch_one(&mut *tx)
    .await?;

    query(r#"DELETE FROM public.employees WHERE employee_id=$1"#)
        .bind(bed.employee_id)
        .execute(&mut *tx)
        .await?;

    assert_room_capacity(&mut tx, &old_acc, &old_room).await?;
    if let (Some(acc), Some(room)) = (bed.accommodation_name.as_deref(), bed.room.as_deref()) {
        assert_room_capacity(&mut tx, acc, room).await?;
    }

    tx.commit().await?;
    Ok(BedShiftOutcome {
        employee: updated,
        vacated_bed,
        consumed_bed: bed.emp_id,
    })
}

/// Reactivates a shifted-out or checked-out employee. Terminal dates are
/// cleared; the caller assigns a bed afterwards via `assign_waiting`.
pub async fn re_check_in(pool: &PgPool, emp_id: &str) -> Result<Employee, OccupancyError> {
    let mut tx = pool.begin().await?;
    let employee = lock_by_emp_id(&mut tx, emp_id).await?;

    match BedStatus::parse(&employee.status) {
        BedStatus::CheckIn | BedStatus::ExEmployee => {}
        other => {
            return Err(OccupancyError::InvariantViolation(format!(
                "re-check-in only applies to Check-in or Ex-Employee rows, not '{other}'"
            )))
        }
    }

    let row = query_as::<_, Employee>(
        r#"
        UPDATE public.employees SET
            status = 'Active',
            check_out_date = NULL,
            shift_out_date = NULL
        WHERE employee_id = $1
        RETURNING *
        "#,
    )
    .bind(employee.employee_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Statuses a generic field edit may set. Anything that creates or destroys
/// a bed claim (vacant, departed, awaiting-room) must go through the
/// dedicated transitions above, otherwise capacity bookkeeping is bypassed.
pub fn guard_generic_status(new: &BedStatus) -> Result<(), OccupancyError> {
    match new {
        BedStatus::Vacant | BedStatus::ExEmployee | BedStatus::ShiftedOut | BedStatus::CheckIn => {
            Err(OccupancyError::InvariantViolation(format!(
                "status '{new}' can only be set through its transition operation"
            )))
        }
        _ => Ok(()),
    }
}

/// Rows that already departed keep their terminal dates; a plain field edit
/// may not flip them back to an occupying status. `re_check_in` is the only
/// path that reactivates a departed row.
pub fn guard_departed_edit(current: &BedStatus) -> Result<(), OccupancyError> {
    match current {
        BedStatus::ExEmployee | BedStatus::ShiftedOut => {
            Err(OccupancyError::InvariantViolation(format!(
                "a '{current}' row cannot change status through an edit; use re-check-in"
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_edit_rejects_bookkeeping_statuses() {
        assert!(guard_generic_status(&BedStatus::Vacant).is_err());
        assert!(guard_generic_status(&BedStatus::ExEmployee).is_err());
        assert!(guard_generic_status(&BedStatus::ShiftedOut).is_err());
        assert!(guard_generic_status(&BedStatus::CheckIn).is_err());
    }

    #[test]
    fn generic_edit_allows_non_vacating_statuses() {
        assert!(guard_generic_status(&BedStatus::Active).is_ok());
        assert!(guard_generic_status(&BedStatus::OnLeave).is_ok());
        assert!(guard_generic_status(&BedStatus::Vacation).is_ok());
        assert!(guard_generic_status(&BedStatus::Resigned).is_ok());
        assert!(guard_generic_status(&BedStatus::Terminated).is_ok());
        assert!(guard_generic_status(&BedStatus::Other("Probation".into())).is_ok());
    }

    #[test]
    fn departed_rows_cannot_take_a_bed() {
        assert!(guard_waiting_status(&BedStatus::ExEmployee).is_err());
        assert!(guard_waiting_status(&BedStatus::Resigned).is_err());
        assert!(guard_waiting_status(&BedStatus::Terminated).is_err());
        assert!(guard_waiting_status(&BedStatus::ShiftedOut).is_err());
        assert!(guard_waiting_status(&BedStatus::Vacant).is_err());
        assert!(guard_waiting_status(&BedStatus::CheckIn).is_ok());
        assert!(guard_waiting_status(&BedStatus::Active).is_ok());
    }

    #[test]
    fn generic_edit_cannot_reactivate_departed_rows() {
        assert!(guard_departed_edit(&BedStatus::ExEmployee).is_err());
        assert!(guard_departed_edit(&BedStatus::ShiftedOut).is_err());
        assert!(guard_departed_edit(&BedStatus::Active).is_ok());
        assert!(guard_departed_edit(&BedStatus::CheckIn).is_ok());
        assert!(guard_departed_edit(&BedStatus::OnLeave).is_ok());
    }
}
