//! # Error Types
//!
//! Domain-specific error types for tabletap-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tabletap-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tabletap-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tabletap-engine errors (separate crate)                               │
//! │  └── EngineError      - What the routing layer sees                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (table id, pax, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested party does not fit on the table.
    ///
    /// ## When This Occurs
    /// - Allocating a new session would push the summed pax of all active
    ///   sessions above the table's seat count
    /// - Growing an existing party (`modify_pax`) past the remaining seats
    ///
    /// ## User Workflow
    /// ```text
    /// Scan QR (pax: 5)
    ///      │
    ///      ▼
    /// Table seats 8, active sessions already hold 6
    ///      │
    ///      ▼
    /// CapacityExceeded { requested: 5, available: 2 }
    ///      │
    ///      ▼
    /// UI shows: "Only 2 seats left at this table"
    /// ```
    #[error("Table capacity exceeded: requested {requested} pax, {available} seats available")]
    CapacityExceeded { requested: i64, available: i64 },

    /// Every unit on the table already has an active session.
    #[error("No free unit on table {table_id}")]
    NoFreeUnit { table_id: String },

    /// The session has already been terminated (forced end or billed closure).
    ///
    /// ## When This Occurs
    /// - Closing a bill twice
    /// - Forcing an end on a session that was already billed
    /// - Changing pax on a closed session
    #[error("Session {session_id} is already closed")]
    AlreadyClosed { session_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad unit code characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate unit code within a table).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
