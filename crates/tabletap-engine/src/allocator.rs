//! # Unit Allocator
//!
//! Assigns an exclusive unit on a table to an arriving party.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      allocate(table_id, pax)                            │
//! │                                                                         │
//! │  validate pax                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              BEGIN IMMEDIATE (serialized writer)                │   │
//! │  │                                                                 │   │
//! │  │  1. Load table + restaurant (policy)                           │   │
//! │  │  2. used = Σ pax of active sessions     ─┐ serialized view     │   │
//! │  │  3. capacity check: pax ≤ seats − used  ─┘                     │   │
//! │  │  4. first free unit by unit_code, else NoFreeUnit              │   │
//! │  │  5. dynamic policy? rotate the unit's token                    │   │
//! │  │  6. INSERT session (this IS the occupation)                    │   │
//! │  │  7. available := false (staff-UI cosmetics)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │ COMMIT                                                         │
//! │       ▼                                                                 │
//! │  AllocatedUnit { session, unit (current token) }                       │
//! │                                                                         │
//! │  Two concurrent calls on one table cannot interleave inside the        │
//! │  box: the loser waits on the write lock (bounded by busy_timeout,     │
//! │  then Busy) and re-reads a world where the winner already committed.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use tabletap_core::{validation, QrTokenPolicy, Table, TableSession, TableUnit};
use tabletap_db::{repository, Database};

use crate::error::{EngineError, EngineResult};
use crate::token;

// =============================================================================
// Results
// =============================================================================

/// A successful allocation: the new session and the unit it occupies,
/// with the unit's current (possibly just-rotated) credential.
#[derive(Debug, Clone)]
pub struct AllocatedUnit {
    pub session: TableSession,
    pub unit: TableUnit,
}

/// What a scanned QR token points at.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub table: Table,
    pub unit: TableUnit,
    /// The session currently holding the unit, if any (exclusivity means
    /// at most one).
    pub active_session: Option<TableSession>,
}

// =============================================================================
// Allocator
// =============================================================================

/// Finds-or-rejects a free unit for an arriving party.
#[derive(Debug, Clone)]
pub struct UnitAllocator {
    db: Database,
}

impl UnitAllocator {
    /// Creates a new UnitAllocator.
    pub fn new(db: Database) -> Self {
        UnitAllocator { db }
    }

    /// Allocates a free unit on `table_id` to a party of `pax`.
    ///
    /// ## Errors
    /// - `InvalidInput` - non-positive or oversized pax
    /// - `NotFound` - unknown table
    /// - `CapacityExceeded` - party doesn't fit alongside active sessions
    /// - `NoFreeUnit` - seats remain but every unit is occupied
    /// - `Busy` - write lock contention past the busy timeout; retry is safe
    pub async fn allocate(&self, table_id: &str, pax: i64) -> EngineResult<AllocatedUnit> {
        validation::validate_pax(pax)?;

        let mut tx = self.db.begin_immediate().await?;

        let table = repository::table::get_table(&mut *tx, table_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Table", table_id))?;
        let restaurant =
            repository::restaurant::get_required(&mut *tx, &table.restaurant_id).await?;

        // Capacity and free-unit reads are serialized behind the write lock:
        // nothing can commit between here and our own commit.
        let used_pax = repository::session::active_pax_sum(&mut *tx, table_id).await?;
        table.check_capacity(used_pax, pax)?;

        let mut unit = repository::table::free_units(&mut *tx, table_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NoFreeUnit {
                table_id: table_id.to_string(),
            })?;

        let now = Utc::now();

        // Dynamic policy: the previous diner's token becomes invalid the
        // instant this transaction commits the new session.
        if restaurant.qr_policy() == QrTokenPolicy::Dynamic {
            let fresh = token::generate_token();
            repository::table::set_unit_token(&mut *tx, &unit.id, &fresh, now).await?;
            unit.qr_token = Some(fresh);
            unit.updated_at = now;
        }

        let session = TableSession {
            id: Uuid::new_v4().to_string(),
            restaurant_id: table.restaurant_id.clone(),
            table_id: table.id.clone(),
            unit_id: unit.id.clone(),
            pax,
            started_at: now,
            ended_at: None,
            payment_method: None,
            amount_paid_cents: None,
            discount_cents: None,
            notes: None,
            closed_by_staff_id: None,
            pos_reference: None,
        };
        repository::session::insert(&mut *tx, &session).await?;

        repository::table::set_available(&mut *tx, table_id, false, now).await?;

        tx.commit().await.map_err(tabletap_db::DbError::from)?;

        info!(
            session_id = %session.id,
            table_id = %table_id,
            unit_code = %unit.unit_code,
            pax,
            "Unit allocated"
        );

        Ok(AllocatedUnit { session, unit })
    }

    /// Resolves a scanned QR token to its unit and table.
    ///
    /// Read-only; an unknown or retired token is `NotFound`.
    pub async fn resolve_token(&self, token: &str) -> EngineResult<ScanTarget> {
        let unit = repository::table::find_unit_by_token(self.db.pool(), token)
            .await?
            .ok_or_else(|| EngineError::not_found("Unit credential", token))?;

        let table = repository::table::get_table_required(self.db.pool(), &unit.table_id).await?;
        let active_session =
            repository::session::active_session_for_unit(self.db.pool(), &unit.id).await?;

        debug!(unit_id = %unit.id, occupied = active_session.is_some(), "Token resolved");

        Ok(ScanTarget {
            table,
            unit,
            active_session,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
