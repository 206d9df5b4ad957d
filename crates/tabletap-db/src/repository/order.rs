//! # Order Repository
//!
//! Orders and order items belong to the out-of-scope ordering flow; they
//! live here because the bill aggregator and the closure transaction read
//! them. Prices are snapshots frozen at order time - the engine never goes
//! back to the menu.

use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tabletap_core::{Order, OrderItem};

/// Inserts an order row.
pub async fn insert_order(exec: impl SqliteExecutor<'_>, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, session_id = %order.session_id, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (id, session_id, cancelled, created_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&order.id)
    .bind(&order.session_id)
    .bind(order.cancelled)
    .bind(order.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Inserts an order item row (snapshot of the menu line at order time).
pub async fn insert_item(exec: impl SqliteExecutor<'_>, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, session_id, name_snapshot, unit_price_cents,
            quantity, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.session_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

/// Marks an order cancelled. Its items stop contributing to the bill.
pub async fn cancel_order(exec: impl SqliteExecutor<'_>, order_id: &str) -> DbResult<()> {
    debug!(id = %order_id, "Cancelling order");

    let result = sqlx::query("UPDATE orders SET cancelled = 1 WHERE id = ?1")
        .bind(order_id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", order_id));
    }

    Ok(())
}

/// All items of a session whose parent order is not cancelled, oldest first.
///
/// This is the single item feed for both the bill preview and the closure
/// recomputation.
pub async fn active_items(
    exec: impl SqliteExecutor<'_>,
    session_id: &str,
) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT i.id, i.order_id, i.session_id, i.name_snapshot,
               i.unit_price_cents, i.quantity, i.created_at
        FROM order_items i
        JOIN orders o ON o.id = i.order_id
        WHERE i.session_id = ?1 AND o.cancelled = 0
        ORDER BY i.created_at
        "#,
    )
    .bind(session_id)
    .fetch_all(exec)
    .await?;

    Ok(items)
}
