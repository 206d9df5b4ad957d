//! # Bill Closure Repository
//!
//! Append-only audit rows, one per successful closure. Inserted inside the
//! closure transaction; the webhook outcome is filled in afterwards,
//! best-effort, and nothing else is ever updated.

use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tabletap_core::BillClosure;

/// Inserts a closure audit row.
pub async fn insert(exec: impl SqliteExecutor<'_>, closure: &BillClosure) -> DbResult<()> {
    debug!(
        id = %closure.id,
        session_id = %closure.session_id,
        total = closure.total_cents,
        "Inserting bill closure"
    );

    sqlx::query(
        r#"
        INSERT INTO bill_closures (
            id, session_id, closed_at, subtotal_cents, service_charge_cents,
            discount_cents, total_cents, payment_method, webhook_sent,
            webhook_error, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&closure.id)
    .bind(&closure.session_id)
    .bind(closure.closed_at)
    .bind(closure.subtotal_cents)
    .bind(closure.service_charge_cents)
    .bind(closure.discount_cents)
    .bind(closure.total_cents)
    .bind(closure.payment_method)
    .bind(closure.webhook_sent)
    .bind(&closure.webhook_error)
    .bind(closure.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Records the deferred webhook outcome on an existing closure row.
///
/// The only mutation ever applied to a closure row.
pub async fn record_webhook_result(
    exec: impl SqliteExecutor<'_>,
    closure_id: &str,
    sent: bool,
    error: Option<&str>,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE bill_closures SET webhook_sent = ?2, webhook_error = ?3 WHERE id = ?1")
            .bind(closure_id)
            .bind(sent)
            .bind(error)
            .execute(exec)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("BillClosure", closure_id));
    }

    Ok(())
}

/// All closure rows for a session, oldest first.
///
/// A correctly-behaving engine produces at most one; the listing exists so
/// tests and audits can prove it.
pub async fn list_for_session(
    exec: impl SqliteExecutor<'_>,
    session_id: &str,
) -> DbResult<Vec<BillClosure>> {
    let closures = sqlx::query_as::<_, BillClosure>(
        r#"
        SELECT id, session_id, closed_at, subtotal_cents, service_charge_cents,
               discount_cents, total_cents, payment_method, webhook_sent,
               webhook_error, created_at
        FROM bill_closures
        WHERE session_id = ?1
        ORDER BY created_at
        "#,
    )
    .bind(session_id)
    .fetch_all(exec)
    .await?;

    Ok(closures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::{restaurant, session, table};
    use chrono::Utc;
    use tabletap_core::{PaymentMethod, Restaurant, Table, TableSession, TableUnit};

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        restaurant::insert(
            db.pool(),
            &Restaurant {
                id: "rest-1".to_string(),
                name: "Noodle Bar".to_string(),
                regenerate_qr_per_session: false,
                service_charge_bps: 0,
                pos_endpoint: None,
                pos_credential: None,
                created_at: now,
            },
        )
        .await
        .unwrap();
        table::insert_table(
            db.pool(),
            &Table {
                id: "tbl-1".to_string(),
                restaurant_id: "rest-1".to_string(),
                category: "main".to_string(),
                name: "T1".to_string(),
                seat_count: 4,
                available: true,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        table::insert_unit(
            db.pool(),
            &TableUnit {
                id: "u-1".to_string(),
                table_id: "tbl-1".to_string(),
                unit_code: "A".to_string(),
                display_name: "Seat A".to_string(),
                qr_token: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        session::insert(
            db.pool(),
            &TableSession {
                id: "sess-1".to_string(),
                restaurant_id: "rest-1".to_string(),
                table_id: "tbl-1".to_string(),
                unit_id: "u-1".to_string(),
                pax: 2,
                started_at: now,
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
        db
    }

    fn closure(id: &str) -> BillClosure {
        let now = Utc::now();
        BillClosure {
            id: id.to_string(),
            session_id: "sess-1".to_string(),
            closed_at: now,
            subtotal_cents: 1200,
            service_charge_cents: 120,
            discount_cents: 0,
            total_cents: 1320,
            payment_method: PaymentMethod::Cash,
            webhook_sent: false,
            webhook_error: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = seeded_db().await;
        insert(db.pool(), &closure("cl-1")).await.unwrap();

        let closures = list_for_session(db.pool(), "sess-1").await.unwrap();
        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].total_cents, 1320);
        assert!(!closures[0].webhook_sent);
    }

    #[tokio::test]
    async fn test_record_webhook_result() {
        let db = seeded_db().await;
        insert(db.pool(), &closure("cl-1")).await.unwrap();

        record_webhook_result(db.pool(), "cl-1", false, Some("connection refused"))
            .await
            .unwrap();

        let closures = list_for_session(db.pool(), "sess-1").await.unwrap();
        assert!(!closures[0].webhook_sent);
        assert_eq!(
            closures[0].webhook_error.as_deref(),
            Some("connection refused")
        );

        record_webhook_result(db.pool(), "cl-1", true, None)
            .await
            .unwrap();
        let closures = list_for_session(db.pool(), "sess-1").await.unwrap();
        assert!(closures[0].webhook_sent);
        assert_eq!(closures[0].webhook_error, None);
    }
}
