//! # Bill Aggregator
//!
//! Read-only bill preview: what the party owes right now, before any
//! closure-time discount. Safe to call repeatedly and concurrently with
//! order placement - it reflects the items as of call time, with no
//! snapshot isolation against orders arriving mid-read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tabletap_core::billing::{build_lines, compute_totals, BillLine};
use tabletap_db::{repository, Database};

use crate::error::{EngineError, EngineResult};

/// A computed bill preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillPreview {
    pub session_id: String,
    pub lines: Vec<BillLine>,
    pub subtotal_cents: i64,
    pub service_charge_cents: i64,
    /// subtotal + service charge; closure-time discount not included.
    pub total_cents: i64,
    pub computed_at: DateTime<Utc>,
}

/// Computes bill previews from the order ledger.
#[derive(Debug, Clone)]
pub struct BillAggregator {
    db: Database,
}

impl BillAggregator {
    /// Creates a new BillAggregator.
    pub fn new(db: Database) -> Self {
        BillAggregator { db }
    }

    /// Computes the current bill for a session.
    ///
    /// The service charge rate is fetched fresh from the restaurant row -
    /// it may have changed between ordering and now, and the fresh value
    /// wins.
    pub async fn compute_bill(&self, session_id: &str) -> EngineResult<BillPreview> {
        let session = repository::session::get(self.db.pool(), session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("TableSession", session_id))?;

        let restaurant =
            repository::restaurant::get_required(self.db.pool(), &session.restaurant_id).await?;
        let items = repository::order::active_items(self.db.pool(), session_id).await?;

        let totals = compute_totals(&items, restaurant.service_charge_rate());
        let lines = build_lines(&items);

        debug!(
            session_id = %session_id,
            lines = lines.len(),
            subtotal = totals.subtotal_cents,
            "Bill computed"
        );

        Ok(BillPreview {
            session_id: session_id.to_string(),
            lines,
            subtotal_cents: totals.subtotal_cents,
            service_charge_cents: totals.service_charge_cents,
            total_cents: totals.total_cents,
            computed_at: Utc::now(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
