// crates/bulk-ingest-cli/src/lib.rs
// ============================================================================
// Module: Bulk Ingest CLI Library
// Description: Shared helpers for the Bulk Ingest command-line interface.
// Purpose: Keep CSV decoding and filter parsing testable outside the binary.
// Dependencies: bulk-ingest-core, csv, thiserror
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) imports these helpers to turn CSV
//! files and `--filter` arguments into core requests. CLI inputs are untrusted:
//! files are read under a hard size limit and malformed arguments fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Bounded CSV file decoding into raw rows.
pub mod csv_input;
/// `--filter` argument parsing.
pub mod filter_arg;
