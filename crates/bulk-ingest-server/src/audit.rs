// crates/bulk-ingest-server/src/audit.rs
// ============================================================================
// Module: Ingest Audit Logging
// Description: Structured audit events for HTTP request handling.
// Purpose: Emit JSON-line audit logs without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every routed request produces one audit event: `import_completed`,
//! `validate_completed`, `query_completed`, or `request_failed`. Events carry
//! counts and outcomes only; row payloads are never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ingest audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route label, e.g. `import`.
    pub route: &'static str,
    /// Target table when known.
    pub table: Option<String>,
    /// HTTP status code returned.
    pub status: u16,
    /// Rows written (imports).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<usize>,
    /// Rows rejected (imports and validation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    /// Rows removed by same-day replacement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced: Option<usize>,
    /// Matching rows before pagination (queries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    /// Normalized error kind label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
}

/// Row counts attached to a successful event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditCounts {
    /// Rows written.
    pub imported: Option<usize>,
    /// Rows rejected.
    pub failed: Option<usize>,
    /// Rows removed by same-day replacement.
    pub replaced: Option<usize>,
    /// Matching rows before pagination.
    pub total: Option<usize>,
}

impl IngestAuditEvent {
    /// Builds a success event.
    #[must_use]
    pub fn completed(
        event: &'static str,
        route: &'static str,
        table: Option<String>,
        counts: AuditCounts,
        request_bytes: usize,
    ) -> Self {
        Self {
            event,
            timestamp_ms: now_millis(),
            route,
            table,
            status: 200,
            imported: counts.imported,
            failed: counts.failed,
            replaced: counts.replaced,
            total: counts.total,
            error_kind: None,
            request_bytes,
        }
    }

    /// Builds a `request_failed` event.
    #[must_use]
    pub fn failed(
        route: &'static str,
        table: Option<String>,
        status: u16,
        error_kind: &'static str,
        request_bytes: usize,
    ) -> Self {
        Self {
            event: "request_failed",
            timestamp_ms: now_millis(),
            route,
            table,
            status,
            imported: None,
            failed: None,
            replaced: None,
            total: None,
            error_kind: Some(error_kind),
            request_bytes,
        }
    }
}

/// Returns the current unix epoch in milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for ingest request events.
pub trait IngestAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &IngestAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct IngestStderrAuditSink;

impl IngestAuditSink for IngestStderrAuditSink {
    fn record(&self, event: &IngestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct IngestFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl IngestFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl IngestAuditSink for IngestFileAuditSink {
    fn record(&self, event: &IngestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct IngestNoopAuditSink;

impl IngestAuditSink for IngestNoopAuditSink {
    fn record(&self, _event: &IngestAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
