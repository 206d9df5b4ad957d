//! # tabletap-db: Database Layer for TableTap
//!
//! This crate provides database access for the TableTap engine.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        TableTap Data Flow                               │
//! │                                                                         │
//! │  Engine operation (allocate_unit, close_bill)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tabletap-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (session.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ query fns,    │    │ 001_init.sql │  │   │
//! │  │   │ BEGIN         │◄───│ executor-     │    │ ...          │  │   │
//! │  │   │ IMMEDIATE     │    │ generic       │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys, busy timeout)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration, transaction handles
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types (including the retryable `Busy`)
//! - [`repository`] - Query functions per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tabletap_db::{Database, DbConfig, repository};
//!
//! let db = Database::new(DbConfig::new("path/to/tabletap.db")).await?;
//!
//! // Standalone read against the pool
//! let table = repository::table::get_table(db.pool(), &table_id).await?;
//!
//! // Composed reads and writes inside one serialized write transaction
//! let mut tx = db.begin_immediate().await?;
//! let used = repository::session::active_pax_sum(&mut *tx, &table_id).await?;
//! repository::session::insert(&mut *tx, &session).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
