//! # Domain Types
//!
//! Core domain types used throughout TableTap.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Restaurant    │   │     Table       │   │   TableUnit     │       │
//! │  │  ─────────────  │1─N│  ─────────────  │1─N│  ─────────────  │       │
//! │  │  qr policy      │   │  seat_count     │   │  unit_code      │       │
//! │  │  svc charge bps │   │  available      │   │  qr_token?      │       │
//! │  │  pos endpoint?  │   └─────────────────┘   └────────┬────────┘       │
//! │  └─────────────────┘                                  │ ≤1 active      │
//! │                                                       ▼                │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   BillClosure   │   │  Order/Item     │   │  TableSession   │       │
//! │  │  ─────────────  │1─1│  ─────────────  │N─1│  ─────────────  │       │
//! │  │  totals, hook   │   │  price snapshot │   │  pax, ended_at? │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (unit_code, pos_reference) - human-readable
//!
//! ## Occupancy Is Derived, Never Stored
//! A unit is "occupied" iff an active session (`ended_at IS NULL`) references
//! it. There is no occupied flag on the unit row; the `available` flag on the
//! table is a staff-UI convenience and never consulted for correctness.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Service Charge Rate
// =============================================================================

/// Service charge rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (a common table-service charge)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceChargeRate(u32);

impl ServiceChargeRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        ServiceChargeRate(bps)
    }

    /// Creates a rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        ServiceChargeRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        ServiceChargeRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for ServiceChargeRate {
    fn default() -> Self {
        ServiceChargeRate::zero()
    }
}

// =============================================================================
// QR Token Policy
// =============================================================================

/// Credential rotation policy for unit QR tokens.
///
/// ## The Two Policies
/// ```text
/// Static:  token fixed at table creation, reused by every party
///          (laminated QR card on the table)
/// Dynamic: token regenerated on every session start, printed/displayed
///          per party; the previous diner's code dies the instant a new
///          session exists
/// ```
///
/// This is a configuration-driven variant on the restaurant row, not a type
/// hierarchy: the allocator branches on it in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrTokenPolicy {
    /// Token persists across sessions.
    Static,
    /// Token is rotated on each new session.
    Dynamic,
}

impl QrTokenPolicy {
    /// Derives the policy from the restaurant's stored flag.
    #[inline]
    pub const fn from_regenerate_flag(regenerate_per_session: bool) -> Self {
        if regenerate_per_session {
            QrTokenPolicy::Dynamic
        } else {
            QrTokenPolicy::Static
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Mobile wallet payment (QR pay, NFC).
    Mobile,
}

// =============================================================================
// Restaurant
// =============================================================================

/// POS target configuration for a restaurant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosConfig {
    /// Webhook endpoint URL.
    pub endpoint: String,
    /// Stored credential sent as a bearer token, if any.
    pub credential: Option<String>,
}

/// Restaurant-level settings the engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Restaurant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// When true, a fresh QR token is generated on every session start
    /// ("dynamic" policy). When false, the token fixed at table creation is
    /// reused ("static" policy).
    pub regenerate_qr_per_session: bool,

    /// Service charge in basis points (1000 = 10%).
    /// Fetched fresh at bill computation time - it may change between
    /// ordering and closure.
    pub service_charge_bps: i64,

    /// Outbound POS webhook endpoint, if integrated.
    pub pos_endpoint: Option<String>,

    /// Credential for the POS webhook (bearer token).
    pub pos_credential: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Restaurant {
    /// Returns the token rotation policy.
    #[inline]
    pub fn qr_policy(&self) -> QrTokenPolicy {
        QrTokenPolicy::from_regenerate_flag(self.regenerate_qr_per_session)
    }

    /// Returns the service charge rate.
    #[inline]
    pub fn service_charge_rate(&self) -> ServiceChargeRate {
        ServiceChargeRate::from_bps(self.service_charge_bps.max(0) as u32)
    }

    /// Returns the POS webhook target, if one is configured.
    pub fn pos_config(&self) -> Option<PosConfig> {
        self.pos_endpoint.as_ref().map(|endpoint| PosConfig {
            endpoint: endpoint.clone(),
            credential: self.pos_credential.clone(),
        })
    }
}

// =============================================================================
// Table
// =============================================================================

/// A physical table: the furniture unit that owns seats and units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Table {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Restaurant this table belongs to.
    pub restaurant_id: String,

    /// Grouping category ("patio", "bar", "main floor").
    pub category: String,

    /// Display name shown to staff ("T1", "Bar left").
    pub name: String,

    /// Seat capacity: the hard upper bound on concurrently seated pax
    /// across all of this table's units' active sessions.
    pub seat_count: i64,

    /// Staff-UI convenience flag. Never consulted for allocation
    /// correctness, which is always derived from active sessions.
    pub available: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    /// Seats left once `used_pax` are accounted for.
    #[inline]
    pub fn remaining_seats(&self, used_pax: i64) -> i64 {
        self.seat_count - used_pax
    }

    /// Checks whether a party of `requested` pax fits alongside `used_pax`
    /// already-seated guests.
    ///
    /// ## Example
    /// ```rust
    /// # use tabletap_core::types::Table;
    /// # use chrono::Utc;
    /// # let table = Table {
    /// #     id: "t".into(), restaurant_id: "r".into(), category: "main".into(),
    /// #     name: "T1".into(), seat_count: 4, available: true,
    /// #     created_at: Utc::now(), updated_at: Utc::now(),
    /// # };
    /// assert!(table.check_capacity(0, 4).is_ok());
    /// assert!(table.check_capacity(4, 1).is_err());
    /// ```
    pub fn check_capacity(&self, used_pax: i64, requested: i64) -> CoreResult<()> {
        let available = self.remaining_seats(used_pax);
        if requested > available {
            return Err(CoreError::CapacityExceeded {
                requested,
                available: available.max(0),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Table Unit
// =============================================================================

/// An individually assignable occupancy slot on a table: one bar seat, or
/// the whole table as a single unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TableUnit {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning table.
    pub table_id: String,

    /// Stable identifier within the table ("A", "seat-3"). Also the
    /// deterministic ordering key for unit selection.
    pub unit_code: String,

    /// Name shown to diners and staff ("Seat 3").
    pub display_name: String,

    /// Current credential. NULL until first allocation under the dynamic
    /// policy; fixed at table creation under the static policy.
    pub qr_token: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Session Status
// =============================================================================

/// Derived lifecycle state of a session.
///
/// There are exactly two states and one transition:
/// `Active → Closed` (via billed closure or staff-forced end). A closed
/// session can never be reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// `ended_at` is NULL; the session holds its unit and counts toward
    /// the table's used seats.
    Active,
    /// Terminal. `ended_at` is set.
    Closed,
}

// =============================================================================
// Table Session
// =============================================================================

/// One party's timed occupancy of one unit.
///
/// Created by the unit allocator; terminated exactly once, by either the
/// closure coordinator (billed) or the lifecycle manager (forced end).
/// Never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TableSession {
    pub id: String,
    pub restaurant_id: String,
    pub table_id: String,
    pub unit_id: String,
    /// Party size. Counts toward the table's used seats while active.
    pub pax: i64,
    pub started_at: DateTime<Utc>,
    /// NULL while active. Setting this is the one and only state transition.
    pub ended_at: Option<DateTime<Utc>>,
    /// Closure fields - populated only by a billed closure.
    pub payment_method: Option<PaymentMethod>,
    pub amount_paid_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub notes: Option<String>,
    /// Staff member who terminated the session (billed or forced).
    pub closed_by_staff_id: Option<String>,
    /// Unique external correlation id handed to the POS system.
    pub pos_reference: Option<String>,
}

impl TableSession {
    /// Whether the session is still occupying its unit.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Derived lifecycle status.
    #[inline]
    pub fn status(&self) -> SessionStatus {
        if self.is_active() {
            SessionStatus::Active
        } else {
            SessionStatus::Closed
        }
    }
}

// =============================================================================
// Orders (collaborator rows)
// =============================================================================

/// An order placed against a session. Owned by the out-of-scope ordering
/// flow; the engine only reads these to aggregate bills.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub session_id: String,
    /// Cancelled orders contribute nothing to the bill.
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
}

/// A line item on an order.
/// Uses snapshot pattern to freeze menu data at order time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub session_id: String,
    /// Menu item name at order time (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at order time (frozen, never recomputed from
    /// the current menu price).
    pub unit_price_cents: i64,
    /// Quantity ordered.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns quantity × unit price as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Bill Closure (audit)
// =============================================================================

/// Append-only record of a closure event. Created exactly once per
/// successful closure; only the webhook fields may be filled in afterwards
/// (deferred webhook result).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillClosure {
    pub id: String,
    pub session_id: String,
    pub closed_at: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub service_charge_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Whether the POS webhook was delivered. Recorded after commit;
    /// a failed delivery never reverses the closure.
    pub webhook_sent: bool,
    pub webhook_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(seat_count: i64) -> Table {
        Table {
            id: "tbl-1".to_string(),
            restaurant_id: "rest-1".to_string(),
            category: "main".to_string(),
            name: "T1".to_string(),
            seat_count,
            available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_service_charge_rate_from_bps() {
        let rate = ServiceChargeRate::from_bps(1000);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_service_charge_rate_from_percentage() {
        let rate = ServiceChargeRate::from_percentage(12.5);
        assert_eq!(rate.bps(), 1250);
    }

    #[test]
    fn test_qr_policy_from_flag() {
        assert_eq!(
            QrTokenPolicy::from_regenerate_flag(true),
            QrTokenPolicy::Dynamic
        );
        assert_eq!(
            QrTokenPolicy::from_regenerate_flag(false),
            QrTokenPolicy::Static
        );
    }

    #[test]
    fn test_capacity_check() {
        let t = table(4);
        assert!(t.check_capacity(0, 4).is_ok());
        assert!(t.check_capacity(3, 1).is_ok());

        let err = t.check_capacity(4, 1).unwrap_err();
        match err {
            CoreError::CapacityExceeded {
                requested,
                available,
            } => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_capacity_available_never_negative_in_error() {
        // Over-seated table (pax was shrunk after seating elsewhere):
        // the reported availability clamps at zero.
        let t = table(4);
        let err = t.check_capacity(6, 1).unwrap_err();
        match err {
            CoreError::CapacityExceeded { available, .. } => assert_eq!(available, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_session_status_derivation() {
        let mut session = TableSession {
            id: "sess-1".to_string(),
            restaurant_id: "rest-1".to_string(),
            table_id: "tbl-1".to_string(),
            unit_id: "unit-1".to_string(),
            pax: 2,
            started_at: Utc::now(),
            ended_at: None,
            payment_method: None,
            amount_paid_cents: None,
            discount_cents: None,
            notes: None,
            closed_by_staff_id: None,
            pos_reference: None,
        };
        assert!(session.is_active());
        assert_eq!(session.status(), SessionStatus::Active);

        session.ended_at = Some(Utc::now());
        assert!(!session.is_active());
        assert_eq!(session.status(), SessionStatus::Closed);
    }

    #[test]
    fn test_order_item_line_total() {
        let item = OrderItem {
            id: "item-1".to_string(),
            order_id: "ord-1".to_string(),
            session_id: "sess-1".to_string(),
            name_snapshot: "Pad Thai".to_string(),
            unit_price_cents: 450,
            quantity: 3,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total().cents(), 1350);
    }

    #[test]
    fn test_pos_config_requires_endpoint() {
        let mut restaurant = Restaurant {
            id: "rest-1".to_string(),
            name: "Noodle Bar".to_string(),
            regenerate_qr_per_session: false,
            service_charge_bps: 1000,
            pos_endpoint: None,
            pos_credential: Some("secret".to_string()),
            created_at: Utc::now(),
        };
        // Credential without endpoint is not a usable POS target.
        assert!(restaurant.pos_config().is_none());

        restaurant.pos_endpoint = Some("https://pos.example/hook".to_string());
        let config = restaurant.pos_config().unwrap();
        assert_eq!(config.endpoint, "https://pos.example/hook");
        assert_eq!(config.credential.as_deref(), Some("secret"));
    }
}
