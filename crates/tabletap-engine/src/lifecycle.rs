//! # Session Lifecycle Manager
//!
//! Owns the `Active → Closed` state machine of a session outside of billing:
//! party-size changes while active, and staff-forced ends for abandonment
//! and no-show flows. The billed closure path lives in
//! [`closure`](crate::closure); exactly one of the two may terminate a
//! session.

use chrono::Utc;
use tracing::info;

use tabletap_core::{validation, TableSession};
use tabletap_db::{repository, Database};

use crate::error::{EngineError, EngineResult};

/// Session state operations available to staff while a party sits.
#[derive(Debug, Clone)]
pub struct SessionLifecycle {
    db: Database,
}

impl SessionLifecycle {
    /// Creates a new SessionLifecycle.
    pub fn new(db: Database) -> Self {
        SessionLifecycle { db }
    }

    /// Changes the party size of an active session.
    ///
    /// Re-validates table capacity excluding the session's own previous
    /// contribution: a party of 4 growing to 5 needs one more free seat,
    /// not five.
    ///
    /// ## Errors
    /// - `InvalidInput` - non-positive or oversized pax
    /// - `NotFound` - unknown session
    /// - `AlreadyClosed` - session was already terminated
    /// - `CapacityExceeded` - the new size doesn't fit
    pub async fn modify_pax(&self, session_id: &str, new_pax: i64) -> EngineResult<TableSession> {
        validation::validate_pax(new_pax)?;

        let mut tx = self.db.begin_immediate().await?;

        let mut session = repository::session::get(&mut *tx, session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("TableSession", session_id))?;
        if !session.is_active() {
            return Err(EngineError::AlreadyClosed {
                session_id: session_id.to_string(),
            });
        }

        let table = repository::table::get_table_required(&mut *tx, &session.table_id).await?;
        let others_pax =
            repository::session::active_pax_sum_excluding(&mut *tx, &session.table_id, session_id)
                .await?;
        table.check_capacity(others_pax, new_pax)?;

        repository::session::update_pax(&mut *tx, session_id, new_pax).await?;

        tx.commit().await.map_err(tabletap_db::DbError::from)?;

        info!(
            session_id = %session_id,
            old_pax = session.pax,
            new_pax,
            "Session pax changed"
        );

        session.pax = new_pax;
        Ok(session)
    }

    /// Staff-forced end without billing (abandonment, no-show).
    ///
    /// Sets `ended_at`, records the acting staff member, frees the unit
    /// (derivationally) and flips the table's availability flag back on
    /// when no other active session remains. Persists no payment fields
    /// and creates no closure audit row.
    pub async fn end_session(&self, session_id: &str, staff_id: &str) -> EngineResult<()> {
        let mut tx = self.db.begin_immediate().await?;

        let session = repository::session::get(&mut *tx, session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("TableSession", session_id))?;
        if !session.is_active() {
            return Err(EngineError::AlreadyClosed {
                session_id: session_id.to_string(),
            });
        }

        let now = Utc::now();
        repository::session::end(&mut *tx, session_id, staff_id, now).await?;

        let remaining = repository::session::count_active(&mut *tx, &session.table_id).await?;
        if remaining == 0 {
            repository::table::set_available(&mut *tx, &session.table_id, true, now).await?;
        }

        tx.commit().await.map_err(tabletap_db::DbError::from)?;

        info!(
            session_id = %session_id,
            staff_id = %staff_id,
            "Session force-ended without billing"
        );

        Ok(())
    }

    /// Reads a session back (any state).
    pub async fn get_session(&self, session_id: &str) -> EngineResult<TableSession> {
        repository::session::get(self.db.pool(), session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("TableSession", session_id))
    }

    /// Lists a table's active sessions, oldest first (staff view).
    pub async fn active_sessions(&self, table_id: &str) -> EngineResult<Vec<TableSession>> {
        Ok(repository::session::active_sessions(self.db.pool(), table_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
