//! # tabletap-core: Pure Business Logic for TableTap
//!
//! This crate is the **heart** of TableTap. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TableTap Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Routing layer (out of scope)                       │   │
//! │  │    QR scan ──► start session ──► place orders ──► close bill   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tabletap-engine                              │   │
//! │  │    UnitAllocator, SessionLifecycle, ClosureCoordinator          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tabletap-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  billing  │  │ validation│  │   │
//! │  │   │  Table    │  │   Money   │  │ BillLine  │  │   rules   │  │   │
//! │  │   │  Session  │  │ SvcCharge │  │  totals   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   tabletap-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Table, TableUnit, TableSession, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`billing`] - Bill totals from order item snapshots
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tabletap_core::money::Money;
//! use tabletap_core::types::ServiceChargeRate;
//!
//! // Create money from cents (never from floats!)
//! let subtotal = Money::from_cents(1099); // $10.99
//!
//! // Calculate the service charge with integer rounding
//! let rate = ServiceChargeRate::from_bps(1000); // 10%
//! let charge = subtotal.service_charge(rate);
//!
//! // 10% of $10.99 = $1.10 (rounded)
//! assert_eq!(charge.cents(), 110);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tabletap_core::Money` instead of
// `use tabletap_core::money::Money`

pub use billing::{BillLine, BillTotals};
pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum party size accepted for a single session.
///
/// ## Business Reason
/// Prevents a typo (e.g. 400 instead of 4) from silently reserving a whole
/// table. Real parties larger than this book through staff, not a QR scan.
pub const MAX_PARTY_SIZE: i64 = 100;

/// Length of a generated unit credential (QR token), in characters.
///
/// ## Why 32?
/// 32 alphanumeric characters ≈ 190 bits of entropy; collisions across a
/// restaurant's lifetime are negligible and the token stays QR-friendly.
pub const QR_TOKEN_LEN: usize = 32;

/// Maximum length of free-form closure notes.
pub const MAX_NOTES_LEN: usize = 500;
