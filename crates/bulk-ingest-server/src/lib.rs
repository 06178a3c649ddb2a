// crates/bulk-ingest-server/src/lib.rs
// ============================================================================
// Module: Bulk Ingest Server Library
// Description: HTTP transport, audit logging, and bootstrap for bulk ingest.
// Purpose: Expose the ingest service under `/api/csv/*`.
// Dependencies: axum, bulk-ingest-config, bulk-ingest-core, tokio
// ============================================================================

//! ## Overview
//! The server wires configuration into an [`bulk_ingest_core::IngestService`]
//! and serves it over HTTP with axum. Request bodies are untrusted: they are
//! size-checked before parsing and every failure is answered with a
//! `{success: false, message}` envelope.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditCounts;
pub use audit::IngestAuditEvent;
pub use audit::IngestAuditSink;
pub use audit::IngestFileAuditSink;
pub use audit::IngestNoopAuditSink;
pub use audit::IngestStderrAuditSink;
pub use server::IngestServer;
pub use server::ServerError;
pub use server::build_service;
