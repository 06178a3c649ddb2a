// crates/bulk-ingest-config/src/lib.rs
// ============================================================================
// Module: Bulk Ingest Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for bulk-ingest.toml semantics.
// Dependencies: bulk-ingest-core, bulk-ingest-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `bulk-ingest-config` defines the configuration model for the ingest
//! service: HTTP server settings, request limits, the storage backend, and the
//! table schemas registered at startup. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
