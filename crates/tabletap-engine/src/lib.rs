//! # tabletap-engine: Table/Unit Session Allocation and Bill-Closure Engine
//!
//! The component the routing layer calls into when a diner scans a per-seat
//! QR code, when staff adjust a seated party, and when a bill is closed out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     TableTap Engine Components                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 tabletap-engine (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐ │   │
//! │  │  │ TableRegistry│  │  UnitAllocator   │  │ SessionLifecycle │ │   │
//! │  │  │ provisioning │  │  capacity check  │  │ modify_pax,      │ │   │
//! │  │  │ + static QR  │  │  unit selection  │  │ forced end       │ │   │
//! │  │  │   tokens     │  │  token rotation  │  │                  │ │   │
//! │  │  └──────────────┘  └──────────────────┘  └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌──────────────────────────────────────┐   │   │
//! │  │  │BillAggregator│  │       ClosureCoordinator             │   │   │
//! │  │  │ read-only    │  │  atomic close + audit row, then      │   │   │
//! │  │  │ preview      │  │  best-effort POS webhook             │   │   │
//! │  │  └──────────────┘  └──────────────┬───────────────────────┘   │   │
//! │  │                                   │ post-commit               │   │
//! │  │                          ┌────────▼────────┐                  │   │
//! │  │                          │   PosNotifier   │ → restaurant POS │   │
//! │  │                          └─────────────────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  All shared state lives in the store; every mutating operation is one  │
//! │  `BEGIN IMMEDIATE` transaction. No in-process locks, no background     │
//! │  tasks - everything is request-scoped.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tabletap_db::{Database, DbConfig};
//! use tabletap_engine::{Engine, HttpPosNotifier, NotifierConfig};
//!
//! let db = Database::new(DbConfig::new("tabletap.db")).await?;
//! let notifier = Arc::new(HttpPosNotifier::new(NotifierConfig::default())?);
//! let engine = Engine::new(db, notifier);
//!
//! // QR scan → session
//! let target = engine.allocator().resolve_token(&scanned).await?;
//! let allocated = engine.allocator().allocate(&target.table.id, 2).await?;
//!
//! // ... diners order (outside this crate) ...
//!
//! // Preview, then close out
//! let bill = engine.billing().compute_bill(&allocated.session.id).await?;
//! let result = engine.closure().close_bill(close_request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod billing;
pub mod closure;
pub mod error;
pub mod lifecycle;
pub mod notifier;
pub mod registry;
pub mod token;

#[cfg(test)]
mod testutil;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocator::{AllocatedUnit, ScanTarget, UnitAllocator};
pub use billing::{BillAggregator, BillPreview};
pub use closure::{CloseBillRequest, ClosureCoordinator, ClosureResult};
pub use error::{EngineError, EngineResult};
pub use lifecycle::SessionLifecycle;
pub use notifier::{
    ClosurePayload, HttpPosNotifier, NotifierConfig, NotifyError, PayloadItem, PosNotifier,
};
pub use registry::{NewRestaurant, NewTable, NewUnit, RegisteredTable, TableRegistry};

use std::sync::Arc;

use tabletap_db::Database;

// =============================================================================
// Engine Facade
// =============================================================================

/// Bundles the engine components over one database handle and one notifier.
///
/// Each accessor hands out a cheap clone; the routing layer can hold a
/// single `Engine` and call into it from every request handler.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    notifier: Arc<dyn PosNotifier>,
}

impl Engine {
    /// Creates an engine over the given database and POS notifier.
    pub fn new(db: Database, notifier: Arc<dyn PosNotifier>) -> Self {
        Engine { db, notifier }
    }

    /// Admin-side provisioning (restaurants, tables, units).
    pub fn registry(&self) -> TableRegistry {
        TableRegistry::new(self.db.clone())
    }

    /// Unit allocation and QR token resolution.
    pub fn allocator(&self) -> UnitAllocator {
        UnitAllocator::new(self.db.clone())
    }

    /// Session state operations (pax changes, forced ends).
    pub fn lifecycle(&self) -> SessionLifecycle {
        SessionLifecycle::new(self.db.clone())
    }

    /// Read-only bill previews.
    pub fn billing(&self) -> BillAggregator {
        BillAggregator::new(self.db.clone())
    }

    /// Atomic bill closure with post-commit POS notification.
    pub fn closure(&self) -> ClosureCoordinator {
        ClosureCoordinator::new(self.db.clone(), self.notifier.clone())
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

// =============================================================================
// Crate-Level Invariant Tests
// =============================================================================
