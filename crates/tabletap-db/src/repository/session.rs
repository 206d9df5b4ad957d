//! # Session Repository
//!
//! Table session rows: the one mutable state machine in the store.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                                  │
//! │                                                                         │
//! │  1. ALLOCATE                                                           │
//! │     └── insert() → TableSession { ended_at: None }                     │
//! │                                                                         │
//! │  2. (WHILE ACTIVE)                                                     │
//! │     └── update_pax() → re-validated party size                         │
//! │                                                                         │
//! │  3. TERMINATE - exactly one of:                                        │
//! │     ├── close() → billed closure (payment fields + pos_reference)      │
//! │     └── end()   → staff-forced end (no billing)                        │
//! │                                                                         │
//! │  Both guards carry `AND ended_at IS NULL`: a second termination        │
//! │  affects zero rows and is reported as such, never applied twice.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tabletap_core::{PaymentMethod, TableSession};

/// All columns of a session row, in the canonical select order.
const SESSION_COLUMNS: &str = r#"
    id, restaurant_id, table_id, unit_id, pax, started_at, ended_at,
    payment_method, amount_paid_cents, discount_cents, notes,
    closed_by_staff_id, pos_reference
"#;

/// Closure fields persisted on a session by the billed-closure path.
#[derive(Debug, Clone)]
pub struct CloseSessionParams<'a> {
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    pub discount_cents: i64,
    pub notes: Option<&'a str>,
    pub closed_by_staff_id: &'a str,
    pub pos_reference: &'a str,
    pub ended_at: DateTime<Utc>,
}

/// Inserts a new (active) session row.
pub async fn insert(exec: impl SqliteExecutor<'_>, session: &TableSession) -> DbResult<()> {
    debug!(
        id = %session.id,
        table_id = %session.table_id,
        unit_id = %session.unit_id,
        pax = session.pax,
        "Inserting session"
    );

    sqlx::query(
        r#"
        INSERT INTO table_sessions (
            id, restaurant_id, table_id, unit_id, pax, started_at, ended_at,
            payment_method, amount_paid_cents, discount_cents, notes,
            closed_by_staff_id, pos_reference
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&session.id)
    .bind(&session.restaurant_id)
    .bind(&session.table_id)
    .bind(&session.unit_id)
    .bind(session.pax)
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(session.payment_method)
    .bind(session.amount_paid_cents)
    .bind(session.discount_cents)
    .bind(&session.notes)
    .bind(&session.closed_by_staff_id)
    .bind(&session.pos_reference)
    .execute(exec)
    .await?;

    Ok(())
}

/// Gets a session by ID.
pub async fn get(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<Option<TableSession>> {
    let session = sqlx::query_as::<_, TableSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM table_sessions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(session)
}

/// Gets a session by ID, failing when absent.
pub async fn get_required(exec: impl SqliteExecutor<'_>, id: &str) -> DbResult<TableSession> {
    get(exec, id)
        .await?
        .ok_or_else(|| DbError::not_found("TableSession", id))
}

/// Sum of pax over a table's active sessions.
///
/// This is the "used seats" side of the capacity invariant. Inside a
/// `BEGIN IMMEDIATE` transaction the value is a serialized view.
pub async fn active_pax_sum(exec: impl SqliteExecutor<'_>, table_id: &str) -> DbResult<i64> {
    let sum: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(pax), 0)
        FROM table_sessions
        WHERE table_id = ?1 AND ended_at IS NULL
        "#,
    )
    .bind(table_id)
    .fetch_one(exec)
    .await?;

    Ok(sum)
}

/// Sum of pax over a table's active sessions, excluding one session.
///
/// Used by `modify_pax`, which must not count the session's own previous
/// contribution against itself.
pub async fn active_pax_sum_excluding(
    exec: impl SqliteExecutor<'_>,
    table_id: &str,
    excluded_session_id: &str,
) -> DbResult<i64> {
    let sum: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(pax), 0)
        FROM table_sessions
        WHERE table_id = ?1 AND ended_at IS NULL AND id != ?2
        "#,
    )
    .bind(table_id)
    .bind(excluded_session_id)
    .fetch_one(exec)
    .await?;

    Ok(sum)
}

/// Lists a table's active sessions, oldest first.
pub async fn active_sessions(
    exec: impl SqliteExecutor<'_>,
    table_id: &str,
) -> DbResult<Vec<TableSession>> {
    let sessions = sqlx::query_as::<_, TableSession>(&format!(
        r#"
        SELECT {SESSION_COLUMNS} FROM table_sessions
        WHERE table_id = ?1 AND ended_at IS NULL
        ORDER BY started_at
        "#
    ))
    .bind(table_id)
    .fetch_all(exec)
    .await?;

    Ok(sessions)
}

/// The active session holding a unit, if any (exclusivity means at most one).
pub async fn active_session_for_unit(
    exec: impl SqliteExecutor<'_>,
    unit_id: &str,
) -> DbResult<Option<TableSession>> {
    let session = sqlx::query_as::<_, TableSession>(&format!(
        r#"
        SELECT {SESSION_COLUMNS} FROM table_sessions
        WHERE unit_id = ?1 AND ended_at IS NULL
        "#
    ))
    .bind(unit_id)
    .fetch_optional(exec)
    .await?;

    Ok(session)
}

/// Number of active sessions on a table.
pub async fn count_active(exec: impl SqliteExecutor<'_>, table_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM table_sessions WHERE table_id = ?1 AND ended_at IS NULL",
    )
    .bind(table_id)
    .fetch_one(exec)
    .await?;

    Ok(count)
}

/// Updates the party size of an active session.
///
/// The `ended_at IS NULL` guard means a closed session is never modified;
/// zero affected rows surfaces as NotFound for the caller to interpret.
pub async fn update_pax(
    exec: impl SqliteExecutor<'_>,
    session_id: &str,
    new_pax: i64,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE table_sessions SET pax = ?2 WHERE id = ?1 AND ended_at IS NULL")
            .bind(session_id)
            .bind(new_pax)
            .execute(exec)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Active session", session_id));
    }

    Ok(())
}

/// Persists a billed closure on an active session.
///
/// Sets `ended_at` and all payment fields in one statement, guarded by
/// `ended_at IS NULL` so a session can only be terminated once.
pub async fn close(
    exec: impl SqliteExecutor<'_>,
    session_id: &str,
    params: &CloseSessionParams<'_>,
) -> DbResult<()> {
    debug!(id = %session_id, reference = %params.pos_reference, "Closing session");

    let result = sqlx::query(
        r#"
        UPDATE table_sessions SET
            ended_at = ?2,
            payment_method = ?3,
            amount_paid_cents = ?4,
            discount_cents = ?5,
            notes = ?6,
            closed_by_staff_id = ?7,
            pos_reference = ?8
        WHERE id = ?1 AND ended_at IS NULL
        "#,
    )
    .bind(session_id)
    .bind(params.ended_at)
    .bind(params.payment_method)
    .bind(params.amount_paid_cents)
    .bind(params.discount_cents)
    .bind(params.notes)
    .bind(params.closed_by_staff_id)
    .bind(params.pos_reference)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Active session", session_id));
    }

    Ok(())
}

/// Staff-forced end without billing (abandonment / no-show).
///
/// Sets `ended_at` and the acting staff id; payment fields stay NULL.
pub async fn end(
    exec: impl SqliteExecutor<'_>,
    session_id: &str,
    staff_id: &str,
    ended_at: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %session_id, staff_id = %staff_id, "Force-ending session");

    let result = sqlx::query(
        r#"
        UPDATE table_sessions SET
            ended_at = ?2,
            closed_by_staff_id = ?3
        WHERE id = ?1 AND ended_at IS NULL
        "#,
    )
    .bind(session_id)
    .bind(ended_at)
    .bind(staff_id)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Active session", session_id));
    }

    Ok(())
}
