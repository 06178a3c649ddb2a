// crates/bulk-ingest-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Table Store
// Description: Durable TableStore and SchemaRegistry backend using SQLite.
// Purpose: Persist imported rows and table schemas across restarts.
// Dependencies: bulk-ingest-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`SqliteTableStore`] implementing both
//! the row store and the schema registry. Every import runs inside one
//! `BEGIN IMMEDIATE` transaction, so a failed import leaves no trace.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_ROW_BYTES;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteTableStore;
