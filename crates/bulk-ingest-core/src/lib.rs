// crates/bulk-ingest-core/src/lib.rs
// ============================================================================
// Module: Bulk Ingest Core Library
// Description: Public API surface for the Bulk Ingest core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Bulk Ingest core validates tabular row batches against declared table
//! schemas, applies them under insert/update/upsert semantics, and serves
//! filtered, sorted, paginated views of the stored rows. It is
//! backend-agnostic and integrates through explicit interfaces; storage
//! engines and transports live in sibling crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::RegistryError;
pub use interfaces::SchemaRegistry;
pub use interfaces::StoreError;
pub use interfaces::StoredRow;
pub use interfaces::TableStore;
pub use interfaces::WriteTxn;
pub use runtime::InMemorySchemaRegistry;
pub use runtime::InMemoryTableStore;
pub use runtime::IngestError;
pub use runtime::IngestService;
pub use runtime::ServiceLimits;
