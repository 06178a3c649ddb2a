// crates/bulk-ingest-core/src/core/mod.rs
// ============================================================================
// Module: Bulk Ingest Core Types
// Description: Canonical schema, row, batch, and query structures.
// Purpose: Provide stable, serializable types shared by every API surface.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types define table schemas, the tagged scalar value model, import
//! batches and results, and query requests and pages. These types are the
//! canonical source of truth for the HTTP surface and the CLI.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod batch;
pub mod identifiers;
pub mod query;
pub mod schema;
pub mod time;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use batch::FailureKind;
pub use batch::ImportRequest;
pub use batch::ImportResult;
pub use batch::RawRow;
pub use batch::RowFailure;
pub use batch::ValidationReport;
pub use batch::WriteMode;
pub use identifiers::RowId;
pub use identifiers::TableName;
pub use query::FilterOp;
pub use query::FilterPredicate;
pub use query::QueryPage;
pub use query::QueryRequest;
pub use query::Record;
pub use query::SortOrder;
pub use query::SortSpec;
pub use schema::ColumnDef;
pub use schema::ColumnType;
pub use schema::SchemaError;
pub use schema::TableSchema;
pub use schema::UniqueConstraint;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use value::Row;
pub use value::Value;
