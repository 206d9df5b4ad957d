//! # Bill Arithmetic
//!
//! Pure computation of bill totals from order item snapshots.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bill Computation                                 │
//! │                                                                         │
//! │  order_items (non-cancelled, price snapshots)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_totals() ← THIS MODULE (pure, no I/O)                          │
//! │       │                                                                 │
//! │       ├──► read-only bill preview (engine::billing)                    │
//! │       │                                                                 │
//! │       └──► closure transaction (engine::closure, recomputed fresh      │
//! │            inside the transaction so the committed totals reflect      │
//! │            the items as of closure)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The discount is NOT applied here: the preview never shows one, and the
//! closure applies the caller-supplied flat amount itself.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{OrderItem, ServiceChargeRate};

// =============================================================================
// Bill Line
// =============================================================================

/// One line of a bill: an order item snapshot with its extended total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillLine {
    /// Menu item name frozen at order time.
    pub name: String,
    pub quantity: i64,
    /// Unit price frozen at order time.
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub line_total_cents: i64,
}

impl BillLine {
    /// Builds a bill line from an order item snapshot.
    pub fn from_item(item: &OrderItem) -> Self {
        BillLine {
            name: item.name_snapshot.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price_cents,
            line_total_cents: item.line_total().cents(),
        }
    }
}

// =============================================================================
// Bill Totals
// =============================================================================

/// Computed bill totals, before any closure-time discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal_cents: i64,
    pub service_charge_cents: i64,
    /// subtotal + service charge.
    pub total_cents: i64,
}

impl BillTotals {
    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Computes bill totals from the session's non-cancelled order items.
///
/// ## Contract
/// - `items` must already exclude items whose parent order is cancelled
///   (the order ledger query does that filtering)
/// - Subtotal = Σ quantity × snapshotted unit price
/// - Service charge = subtotal × rate, integer-rounded
/// - Total = subtotal + service charge (no discount here)
///
/// ## Example
/// ```rust
/// use tabletap_core::billing::compute_totals;
/// use tabletap_core::types::{OrderItem, ServiceChargeRate};
/// use chrono::Utc;
///
/// let items = vec![OrderItem {
///     id: "i1".into(), order_id: "o1".into(), session_id: "s1".into(),
///     name_snapshot: "Green Curry".into(), unit_price_cents: 600,
///     quantity: 2, created_at: Utc::now(),
/// }];
///
/// let totals = compute_totals(&items, ServiceChargeRate::from_bps(1000));
/// assert_eq!(totals.subtotal_cents, 1200);
/// assert_eq!(totals.service_charge_cents, 120);
/// assert_eq!(totals.total_cents, 1320);
/// ```
pub fn compute_totals(items: &[OrderItem], rate: ServiceChargeRate) -> BillTotals {
    let subtotal = items
        .iter()
        .fold(Money::zero(), |acc, item| acc + item.line_total());

    let service_charge = subtotal.service_charge(rate);
    let total = subtotal + service_charge;

    BillTotals {
        subtotal_cents: subtotal.cents(),
        service_charge_cents: service_charge.cents(),
        total_cents: total.cents(),
    }
}

/// Builds display lines for a bill from the same item set.
pub fn build_lines(items: &[OrderItem]) -> Vec<BillLine> {
    items.iter().map(BillLine::from_item).collect()
}

/// Computes the settled amount of a billed closure.
///
/// Settlement charges the item subtotal minus the caller-supplied flat
/// discount (staff decision; no coupon logic composes here). The preview's
/// service charge is advisory and recorded on the audit row, but it is not
/// part of what the party is charged at closure. Clamps at zero.
pub fn settlement_total(totals: &BillTotals, discount: Money) -> Money {
    totals.subtotal().apply_flat_discount(discount)
}

// =============================================================================
// Unit Tests
// =============================================================================
