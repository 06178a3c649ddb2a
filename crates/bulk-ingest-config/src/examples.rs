// crates/bulk-ingest-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the `config example` command.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `bulk-ingest.toml`. The example is kept loadable; a test
//! parses it through [`crate::IngestConfig::from_toml_str`].

/// Returns a canonical example `bulk-ingest.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:8080"
max_body_bytes = 16777216

[server.audit]
enabled = true
# path = "bulk-ingest-audit.jsonl"

[limits]
max_batch_rows = 50000
max_page_size = 1000
default_page_size = 20

[store]
type = "sqlite"
path = "bulk-ingest.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[[tables]]
name = "stock_quotes"
key = ["code"]
columns = [
    { name = "code", type = "string", nullable = false },
    { name = "isin", type = "string", unique = true },
    { name = "name", type = "string" },
    { name = "price", type = "float" },
    { name = "volume", type = "integer" },
    { name = "suspended", type = "boolean" },
]

[[tables]]
name = "daily_close"
import_date_column = "import_date"
replace_same_day = true
columns = [
    { name = "code", type = "string", nullable = false },
    { name = "close", type = "float" },
    { name = "import_date", type = "date" },
]
"#,
    )
}
