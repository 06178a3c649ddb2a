// crates/bulk-ingest-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Runs the `bulk-ingest` binary against a temporary SQLite store.
// Purpose: Verify offline import, validate, query, and config commands.
// Dependencies: bulk-ingest-cli binary, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Each test writes a config pointing at a SQLite file in a temp directory so
//! state persists across separate invocations of the binary.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    missing_docs,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixture
// ============================================================================

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("bulk-ingest.toml");
        let db = dir.path().join("ingest.db");
        let toml = format!(
            r#"
[store]
type = "sqlite"
path = "{}"

[[tables]]
name = "quotes"
key = ["code"]
columns = [
    {{ name = "code", type = "string", nullable = false }},
    {{ name = "market", type = "string" }},
    {{ name = "price", type = "float" }},
]
"#,
            db.display()
        );
        std::fs::write(&config, toml).unwrap();
        Self {
            dir,
            config,
        }
    }

    fn csv(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_bulk-ingest"));
        command.args(args).arg("--config").arg(&self.config);
        command.output().unwrap()
    }
}

fn json_stdout(output: &Output) -> Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a CSV import persists and is visible to a later query.
#[test]
fn import_then_query_across_invocations() {
    let workspace = Workspace::new();
    let file = workspace.csv("quotes.csv", "code,market,price\nA,SH,3.5\nB,SZ,abc\nC,SH,1\n");

    let args = ["import", "--table", "quotes", "--file", path_arg(&file)];
    let body = json_stdout(&workspace.run(&args));
    assert_eq!(body["imported"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["row_index"], 1);

    let body = json_stdout(&workspace.run(&[
        "query",
        "--table",
        "quotes",
        "--filter",
        "market=SH",
        "--sort",
        "price",
        "--order",
        "ascending",
    ]));
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["code"], "C");
    assert_eq!(body["data"][1]["code"], "A");
}

/// Verifies upsert from a second file updates keyed rows.
#[test]
fn upsert_updates_existing_rows() {
    let workspace = Workspace::new();
    let first = workspace.csv("first.csv", "code,market,price\nA,SH,1\n");
    let second = workspace.csv("second.csv", "code,market,price\nA,SZ,2\nB,SH,3\n");
    json_stdout(&workspace.run(&["import", "--table", "quotes", "--file", path_arg(&first)]));
    let body = json_stdout(&workspace.run(&[
        "import",
        "--table",
        "quotes",
        "--mode",
        "upsert",
        "--file",
        path_arg(&second),
    ]));
    assert_eq!(body["imported"], 2);

    let body =
        json_stdout(&workspace.run(&["query", "--table", "quotes", "--filter", "code=A"]));
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["market"], "SZ");
}

/// Verifies validate reports failures without writing rows.
#[test]
fn validate_does_not_write() {
    let workspace = Workspace::new();
    let file = workspace.csv("rows.csv", "code,price\nA,x\n");
    let body = json_stdout(&workspace.run(&[
        "validate",
        "--table",
        "quotes",
        "--file",
        path_arg(&file),
    ]));
    assert_eq!(body["valid"], false);

    let body = json_stdout(&workspace.run(&["tables"]));
    assert_eq!(body["data"], serde_json::json!(["quotes"]));
    let body = json_stdout(&workspace.run(&["query", "--table", "quotes"]));
    assert_eq!(body["total"], 0);
}

/// Verifies request errors exit non-zero with a message on stderr.
#[test]
fn request_errors_exit_non_zero() {
    let workspace = Workspace::new();
    let file = workspace.csv("rows.csv", "code\nA\n");

    let args = ["import", "--table", "quotes", "--mode", "merge", "--file", path_arg(&file)];
    let output = workspace.run(&args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid import mode"));

    let output = workspace.run(&["query", "--table", "missing"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let output = workspace.run(&["query", "--table", "quotes", "--filter", "price"]);
    assert!(!output.status.success());
}

/// Verifies config validation and the example output.
#[test]
fn config_commands() {
    let workspace = Workspace::new();
    let output = workspace.run(&["config", "validate"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "config ok");

    let output = Command::new(env!("CARGO_BIN_EXE_bulk-ingest"))
        .args(["config", "example"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let example = workspace.csv("example.toml", &String::from_utf8_lossy(&output.stdout));
    let output = Command::new(env!("CARGO_BIN_EXE_bulk-ingest"))
        .args(["config", "validate", "--config", path_arg(&example)])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
