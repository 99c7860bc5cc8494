//! # kassa-db: Storage Layer for Kassa
//!
//! Persists sale, shift close and correction requests together with their
//! lines, results and sync errors in SQLite, and answers the filtered reads
//! the sync process runs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Store Data Flow                          │
//! │                                                                         │
//! │  Sync process: db.sales().not_completed()                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kassa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   mapping / records ──► registry ──► sql                        │   │
//! │  │   (field ↔ column)      (validated    (INSERT, UPDATE,          │   │
//! │  │                          once)         DELETE, join SELECT)     │   │
//! │  │                                            │                    │   │
//! │  │   specification ──► repository ◄──────────┘                    │   │
//! │  │   (closed filters)  (one tx per call) ──► reducer               │   │
//! │  │                                          (rows ► aggregates)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   schema: migrations/sqlite (embedded)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`mapping`] - Field ↔ column metadata and binding
//! - [`records`] - Mapping tables of the stored types
//! - [`aggregate`] - Root/children contract shared by the request kinds
//! - [`registry`] - Validated join schemas and precomputed statements
//! - [`sql`] - Statement text builders
//! - [`reducer`] - Joined rows back into aggregates
//! - [`specification`] - Filtered reads
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! db.sales().add(&request).await?;
//! let pending = db.sales().not_completed().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod error;
pub mod mapping;
pub mod migrations;
pub mod pool;
pub mod records;
pub mod reducer;
pub mod registry;
pub mod repository;
pub mod specification;
pub mod sql;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregate::{Aggregate, NoLines, OperationKind};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use specification::{Selection, Specification};

// Repository re-exports for convenience
pub use repository::{
    AggregateRepository, CloseRepository, CorrectionRepository, ErrorRepository, SaleRepository,
};
