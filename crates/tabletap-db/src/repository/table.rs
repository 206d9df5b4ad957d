//! # Table Repository
//!
//! Tables and their units. The load-bearing query here is [`free_units`]:
//! a unit is free iff no active session references it - occupancy is never
//! a stored flag.

use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tabletap_core::{Table, TableUnit};

// =============================================================================
// Tables
// =============================================================================

/// Inserts a table row.
pub async fn insert_table(exec: impl SqliteExecutor<'_>, table: &Table) -> DbResult<()> {
    debug!(id = %table.id, name = %table.name, seats = table.seat_count, "Inserting table");

    sqlx::query(
        r#"
        INSERT INTO tables (
            id, restaurant_id, category, name, seat_count, available,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&table.id)
    .bind(&table.restaurant_id)
    .bind(&table.category)
    .bind(&table.name)
    .bind(table.seat_count)
    .bind(table.available)
    .bind(table.created_at)
    .bind(table.updated_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Gets a table by ID.
pub async fn get_table(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Option<Table>> {
    let table = sqlx::query_as::<_, Table>(
        r#"
        SELECT id, restaurant_id, category, name, seat_count, available,
               created_at, updated_at
        FROM tables
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(table)
}

/// Gets a table by ID, failing when absent.
pub async fn get_table_required(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Table> {
    get_table(exec, id)
        .await?
        .ok_or_else(|| DbError::not_found("Table", id))
}

/// Sets the staff-UI availability flag.
///
/// Purely cosmetic for staff dashboards; allocation never reads it.
pub async fn set_available(
    exec: impl SqliteExecutor<'_>,
    table_id: &str,
    available: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE tables SET available = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(table_id)
        .bind(available)
        .bind(now)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Table", table_id));
    }

    Ok(())
}

// =============================================================================
// Units
// =============================================================================

/// Inserts a table unit row.
pub async fn insert_unit(exec: impl SqliteExecutor<'_>, unit: &TableUnit) -> DbResult<()> {
    debug!(id = %unit.id, table_id = %unit.table_id, code = %unit.unit_code, "Inserting unit");

    sqlx::query(
        r#"
        INSERT INTO table_units (
            id, table_id, unit_code, display_name, qr_token,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&unit.id)
    .bind(&unit.table_id)
    .bind(&unit.unit_code)
    .bind(&unit.display_name)
    .bind(&unit.qr_token)
    .bind(unit.created_at)
    .bind(unit.updated_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Gets a unit by ID.
pub async fn get_unit(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Option<TableUnit>> {
    let unit = sqlx::query_as::<_, TableUnit>(
        r#"
        SELECT id, table_id, unit_code, display_name, qr_token,
               created_at, updated_at
        FROM table_units
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(unit)
}

/// Lists all units of a table, ordered by unit code.
pub async fn list_units(
    exec: impl SqliteExecutor<'_>,
    table_id: &str,
) -> DbResult<Vec<TableUnit>> {
    let units = sqlx::query_as::<_, TableUnit>(
        r#"
        SELECT id, table_id, unit_code, display_name, qr_token,
               created_at, updated_at
        FROM table_units
        WHERE table_id = ?1
        ORDER BY unit_code
        "#,
    )
    .bind(table_id)
    .fetch_all(exec)
    .await?;

    Ok(units)
}

/// Lists a table's free units, ordered by unit code.
///
/// A unit is free iff no active session references it. The ordering makes
/// unit selection deterministic: the allocator always takes the first row.
pub async fn free_units(
    exec: impl SqliteExecutor<'_>,
    table_id: &str,
) -> DbResult<Vec<TableUnit>> {
    let units = sqlx::query_as::<_, TableUnit>(
        r#"
        SELECT u.id, u.table_id, u.unit_code, u.display_name, u.qr_token,
               u.created_at, u.updated_at
        FROM table_units u
        WHERE u.table_id = ?1
          AND NOT EXISTS (
              SELECT 1 FROM table_sessions s
              WHERE s.unit_id = u.id AND s.ended_at IS NULL
          )
        ORDER BY u.unit_code
        "#,
    )
    .bind(table_id)
    .fetch_all(exec)
    .await?;

    Ok(units)
}

/// Finds the unit currently carrying a credential token (the scan flow).
pub async fn find_unit_by_token(
    exec: impl SqliteExecutor<'_>,
    token: &str,
) -> DbResult<Option<TableUnit>> {
    let unit = sqlx::query_as::<_, TableUnit>(
        r#"
        SELECT id, table_id, unit_code, display_name, qr_token,
               created_at, updated_at
        FROM table_units
        WHERE qr_token = ?1
        "#,
    )
    .bind(token)
    .fetch_optional(exec)
    .await?;

    Ok(unit)
}

/// Overwrites a unit's credential token.
///
/// Under the dynamic policy this runs inside the same transaction that
/// inserts the new session, so the previous diner's token dies the instant
/// the new session exists.
pub async fn set_unit_token(
    exec: impl SqliteExecutor<'_>,
    unit_id: &str,
    token: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> DbResult<()> {
    debug!(unit_id = %unit_id, "Rotating unit token");

    let result =
        sqlx::query("UPDATE table_units SET qr_token = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(unit_id)
            .bind(token)
            .bind(now)
            .execute(exec)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("TableUnit", unit_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{restaurant, session};
    use chrono::Utc;
    use tabletap_core::{Restaurant, TableSession};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        restaurant::insert(
            db.pool(),
            &Restaurant {
                id: "rest-1".to_string(),
                name: "Noodle Bar".to_string(),
                regenerate_qr_per_session: false,
                service_charge_bps: 0,
                pos_endpoint: None,
                pos_credential: None,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        db
    }

    fn table(id: &str, seat_count: i64) -> Table {
        let now = Utc::now();
        Table {
            id: id.to_string(),
            restaurant_id: "rest-1".to_string(),
            category: "main".to_string(),
            name: "T1".to_string(),
            seat_count,
            available: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn unit(id: &str, table_id: &str, code: &str) -> TableUnit {
        let now = Utc::now();
        TableUnit {
            id: id.to_string(),
            table_id: table_id.to_string(),
            unit_code: code.to_string(),
            display_name: format!("Seat {code}"),
            qr_token: Some(format!("token-{id}")),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_table_and_units_roundtrip() {
        let db = seeded_db().await;
        insert_table(db.pool(), &table("tbl-1", 4)).await.unwrap();
        insert_unit(db.pool(), &unit("u-1", "tbl-1", "A")).await.unwrap();
        insert_unit(db.pool(), &unit("u-2", "tbl-1", "B")).await.unwrap();

        let loaded = get_table(db.pool(), "tbl-1").await.unwrap().unwrap();
        assert_eq!(loaded.seat_count, 4);

        let units = list_units(db.pool(), "tbl-1").await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].unit_code, "A");
        assert_eq!(units[1].unit_code, "B");
    }

    #[tokio::test]
    async fn test_duplicate_unit_code_rejected() {
        let db = seeded_db().await;
        insert_table(db.pool(), &table("tbl-1", 4)).await.unwrap();
        insert_unit(db.pool(), &unit("u-1", "tbl-1", "A")).await.unwrap();

        let mut dup = unit("u-2", "tbl-1", "A");
        dup.qr_token = Some("other-token".to_string());
        let err = insert_unit(db.pool(), &dup).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_free_units_excludes_occupied() {
        let db = seeded_db().await;
        insert_table(db.pool(), &table("tbl-1", 4)).await.unwrap();
        insert_unit(db.pool(), &unit("u-1", "tbl-1", "A")).await.unwrap();
        insert_unit(db.pool(), &unit("u-2", "tbl-1", "B")).await.unwrap();

        // Occupy unit A with an active session
        session::insert(
            db.pool(),
            &TableSession {
                id: "sess-1".to_string(),
                restaurant_id: "rest-1".to_string(),
                table_id: "tbl-1".to_string(),
                unit_id: "u-1".to_string(),
                pax: 2,
                started_at: Utc::now(),
                ended_at: None,
                payment_method: None,
                amount_paid_cents: None,
                discount_cents: None,
                notes: None,
                closed_by_staff_id: None,
                pos_reference: None,
            },
        )
        .await
        .unwrap();

        let free = free_units(db.pool(), "tbl-1").await.unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].unit_code, "B");

        // End the session: the unit becomes free again (derived occupancy)
        session::end(db.pool(), "sess-1", "staff-1", Utc::now())
            .await
            .unwrap();
        let free = free_units(db.pool(), "tbl-1").await.unwrap();
        assert_eq!(free.len(), 2);
    }

    #[tokio::test]
    async fn test_token_lookup_and_rotation() {
        let db = seeded_db().await;
        insert_table(db.pool(), &table("tbl-1", 4)).await.unwrap();
        insert_unit(db.pool(), &unit("u-1", "tbl-1", "A")).await.unwrap();

        let found = find_unit_by_token(db.pool(), "token-u-1").await.unwrap();
        assert_eq!(found.unwrap().id, "u-1");

        set_unit_token(db.pool(), "u-1", "fresh-token", Utc::now())
            .await
            .unwrap();
        assert!(find_unit_by_token(db.pool(), "token-u-1")
            .await
            .unwrap()
            .is_none());
        let found = find_unit_by_token(db.pool(), "fresh-token").await.unwrap();
        assert_eq!(found.unwrap().id, "u-1");
    }

    #[tokio::test]
    async fn test_set_available_flag() {
        let db = seeded_db().await;
        insert_table(db.pool(), &table("tbl-1", 4)).await.unwrap();

        set_available(db.pool(), "tbl-1", false, Utc::now())
            .await
            .unwrap();
        let loaded = get_table(db.pool(), "tbl-1").await.unwrap().unwrap();
        assert!(!loaded.available);
    }
}
