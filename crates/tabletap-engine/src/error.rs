//! # Engine Error Types
//!
//! The unified error taxonomy the routing layer sees.
//!
//! Every variant except `Busy` is final: retrying without changing the
//! request will fail the same way. `Busy` means the store's write lock was
//! contended past the busy timeout, nothing happened, and a retry is safe.
//!
//! POS notification failure is deliberately NOT here: it happens after the
//! closure transaction commits, so it is reported inside the successful
//! [`ClosureResult`](crate::closure::ClosureResult), never as an error.

use thiserror::Error;

use tabletap_core::{CoreError, ValidationError};
use tabletap_db::DbError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller input failed validation (non-positive pax, oversize notes...).
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The requested party does not fit on the table.
    #[error("Table capacity exceeded: requested {requested} pax, {available} seats available")]
    CapacityExceeded { requested: i64, available: i64 },

    /// Every unit on the table already has an active session.
    #[error("No free unit on table {table_id}")]
    NoFreeUnit { table_id: String },

    /// Entity absent - or present but belonging to another restaurant.
    /// Cross-tenant mismatches read as absence so ids don't leak.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The session has already been terminated.
    #[error("Session {session_id} is already closed")]
    AlreadyClosed { session_id: String },

    /// The store's write lock was contended past the busy timeout.
    /// The operation had no effect; callers may retry.
    #[error("Store busy: try again")]
    Busy,

    /// Unexpected storage failure.
    #[error("Storage failure: {0}")]
    Storage(DbError),
}

impl EngineError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether a retry of the failed operation is safe and may succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Busy)
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Busy => EngineError::Busy,
            DbError::PoolExhausted => EngineError::Busy,
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Storage(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CapacityExceeded {
                requested,
                available,
            } => EngineError::CapacityExceeded {
                requested,
                available,
            },
            CoreError::NoFreeUnit { table_id } => EngineError::NoFreeUnit { table_id },
            CoreError::AlreadyClosed { session_id } => EngineError::AlreadyClosed { session_id },
            CoreError::Validation(v) => EngineError::InvalidInput(v),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
