// crates/bulk-ingest-core/src/runtime/mod.rs
// ============================================================================
// Module: Bulk Ingest Runtime
// Description: Validator, importer, query engine, and service facade.
// Purpose: Apply row batches and answer queries against injected backends.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement batch validation, write-mode application, and
//! filter/sort/paginate queries. Every transport (HTTP, CLI) calls through
//! [`IngestService`] so the same rules apply regardless of entry point.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod coerce;
pub mod importer;
pub mod query;
pub mod service;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use service::IngestError;
pub use service::IngestService;
pub use service::ServiceLimits;
pub use store::InMemorySchemaRegistry;
pub use store::InMemoryTableStore;
