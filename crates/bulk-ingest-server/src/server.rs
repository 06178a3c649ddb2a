// crates/bulk-ingest-server/src/server.rs
// ============================================================================
// Module: Ingest HTTP Server
// Description: Bootstrap and axum routes for the ingest service.
// Purpose: Serve import, validate, filter, and table listing over HTTP.
// Dependencies: axum, bulk-ingest-config, bulk-ingest-core, tokio
// ============================================================================

//! ## Overview
//! [`IngestServer`] builds the configured backend, registers the configured
//! tables, and serves the `/api/csv/*` routes. Handlers size-check the body,
//! parse it, and run the synchronous service on the blocking pool. Every
//! request yields one audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path as RoutePath;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use bulk_ingest_config::IngestConfig;
use bulk_ingest_config::ServerAuditConfig;
use bulk_ingest_core::ImportResult;
use bulk_ingest_core::InMemorySchemaRegistry;
use bulk_ingest_core::InMemoryTableStore;
use bulk_ingest_core::IngestError;
use bulk_ingest_core::IngestService;
use bulk_ingest_core::QueryPage;
use bulk_ingest_core::SchemaRegistry;
use bulk_ingest_core::TableName;
use bulk_ingest_core::TableStore;
use bulk_ingest_core::ValidationReport;
use bulk_ingest_store_sqlite::SqliteTableStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;

use crate::api::FilterBody;
use crate::api::FilterResponse;
use crate::api::ImportBody;
use crate::api::ImportResponse;
use crate::api::MessageResponse;
use crate::api::SchemaResponse;
use crate::api::TablesResponse;
use crate::api::ValidateBody;
use crate::api::ValidateResponse;
use crate::audit::AuditCounts;
use crate::audit::IngestAuditEvent;
use crate::audit::IngestAuditSink;
use crate::audit::IngestFileAuditSink;
use crate::audit::IngestNoopAuditSink;
use crate::audit::IngestStderrAuditSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Route label for imports.
const ROUTE_IMPORT: &str = "import";
/// Route label for validation.
const ROUTE_VALIDATE: &str = "validate";
/// Route label for filtered queries.
const ROUTE_FILTER: &str = "filter";
/// Route label for table listing.
const ROUTE_TABLES: &str = "tables";
/// Route label for schema lookup.
const ROUTE_SCHEMA: &str = "schema";

// ============================================================================
// SECTION: Server
// ============================================================================

/// Ingest HTTP server instance.
pub struct IngestServer {
    /// Server configuration.
    config: IngestConfig,
    /// Shared handler state.
    state: Arc<ServerState>,
}

impl IngestServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration or backend setup fails.
    pub fn from_config(config: IngestConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let service = build_service(&config)?;
        let audit = build_audit_sink(&config.server.audit)?;
        Ok(Self::with_parts(config, service, audit))
    }

    /// Builds a server around an existing service and audit sink.
    #[must_use]
    pub fn with_parts(
        config: IngestConfig,
        service: IngestService,
        audit: Arc<dyn IngestAuditSink>,
    ) -> Self {
        let state = Arc::new(ServerState {
            service,
            audit,
            max_body_bytes: config.server.max_body_bytes,
            default_page_size: config.limits.default_page_size,
        });
        Self {
            config,
            state,
        }
    }

    /// Returns the axum router for this server.
    #[must_use]
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .server
            .bind_addr()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        self.serve_listener(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the server fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the ingest service from configuration and registers its tables.
///
/// # Errors
///
/// Returns [`ServerError`] when the store cannot be opened or a configured
/// table cannot be registered.
pub fn build_service(config: &IngestConfig) -> Result<IngestService, ServerError> {
    let sqlite =
        config.store.sqlite_config().map_err(|err| ServerError::Config(err.to_string()))?;
    let (registry, store): (Arc<dyn SchemaRegistry>, Arc<dyn TableStore>) = match sqlite {
        None => (Arc::new(InMemorySchemaRegistry::new()), Arc::new(InMemoryTableStore::new())),
        Some(sqlite_config) => {
            let store = Arc::new(
                SqliteTableStore::new(sqlite_config)
                    .map_err(|err| ServerError::Init(err.to_string()))?,
            );
            let registry: Arc<dyn SchemaRegistry> = store.clone();
            (registry, store)
        }
    };
    let service = IngestService::new(registry, store, config.limits.service_limits());
    for table in &config.tables {
        service
            .register_schema(table.clone())
            .map_err(|err| ServerError::Init(format!("table `{}`: {err}", table.name)))?;
    }
    Ok(service)
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn IngestAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(IngestNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = IngestFileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| ServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(IngestStderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Routing
// ============================================================================

/// Shared state for HTTP handlers.
struct ServerState {
    /// Ingest service facade.
    service: IngestService,
    /// Audit sink.
    audit: Arc<dyn IngestAuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Page size applied when a filter request omits one.
    default_page_size: usize,
}

/// Builds the route table.
fn build_router(state: Arc<ServerState>) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/api/csv/import", post(handle_import))
        .route("/api/csv/validate", post(handle_validate))
        .route("/api/csv/filter", post(handle_filter))
        .route("/api/csv/tables", get(handle_tables))
        .route("/api/csv/tables/{table}/schema", get(handle_schema))
        .route("/readyz", get(handle_readyz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Handles `POST /api/csv/import`.
async fn handle_import(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match state.read_body(body) {
        Ok(bytes) => bytes,
        Err(failure) => return state.reject(ROUTE_IMPORT, None, &failure, 0),
    };
    let mut table = None;
    match import(&state, &bytes, &mut table) {
        Ok(result) => {
            let counts = AuditCounts {
                imported: Some(result.imported),
                failed: Some(result.failed),
                replaced: Some(result.replaced),
                total: None,
            };
            state.completed("import_completed", ROUTE_IMPORT, table, counts, bytes.len());
            json_response(StatusCode::OK, &ImportResponse::from(result))
        }
        Err(failure) => state.reject(ROUTE_IMPORT, table, &failure, bytes.len()),
    }
}

/// Handles `POST /api/csv/validate`.
async fn handle_validate(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match state.read_body(body) {
        Ok(bytes) => bytes,
        Err(failure) => return state.reject(ROUTE_VALIDATE, None, &failure, 0),
    };
    let mut table = None;
    match validate(&state, &bytes, &mut table) {
        Ok(report) => {
            let counts = AuditCounts {
                failed: Some(report.failures.len()),
                ..AuditCounts::default()
            };
            state.completed("validate_completed", ROUTE_VALIDATE, table, counts, bytes.len());
            json_response(StatusCode::OK, &ValidateResponse::from(report))
        }
        Err(failure) => state.reject(ROUTE_VALIDATE, table, &failure, bytes.len()),
    }
}

/// Handles `POST /api/csv/filter`.
async fn handle_filter(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match state.read_body(body) {
        Ok(bytes) => bytes,
        Err(failure) => return state.reject(ROUTE_FILTER, None, &failure, 0),
    };
    let mut table = None;
    match filter(&state, &bytes, &mut table) {
        Ok(page) => {
            let counts = AuditCounts {
                total: Some(page.total),
                ..AuditCounts::default()
            };
            state.completed("query_completed", ROUTE_FILTER, table, counts, bytes.len());
            json_response(StatusCode::OK, &FilterResponse::from(page))
        }
        Err(failure) => state.reject(ROUTE_FILTER, table, &failure, bytes.len()),
    }
}

/// Handles `GET /api/csv/tables`.
async fn handle_tables(State(state): State<Arc<ServerState>>) -> Response {
    match run_blocking(|| state.service.list_tables()) {
        Ok(tables) => {
            let counts = AuditCounts {
                total: Some(tables.len()),
                ..AuditCounts::default()
            };
            state.completed("tables_listed", ROUTE_TABLES, None, counts, 0);
            json_response(StatusCode::OK, &TablesResponse::new(tables))
        }
        Err(err) => state.reject(ROUTE_TABLES, None, &Failure::from(err), 0),
    }
}

/// Handles `GET /api/csv/tables/{table}/schema`.
async fn handle_schema(
    State(state): State<Arc<ServerState>>,
    RoutePath(table): RoutePath<String>,
) -> Response {
    let name = TableName::new(table.clone());
    match run_blocking(|| state.service.get_schema(&name)) {
        Ok(schema) => {
            state.completed("schema_read", ROUTE_SCHEMA, Some(table), AuditCounts::default(), 0);
            json_response(StatusCode::OK, &SchemaResponse::from(schema))
        }
        Err(err) => state.reject(ROUTE_SCHEMA, Some(table), &Failure::from(err), 0),
    }
}

/// Handles `GET /readyz`.
async fn handle_readyz(State(state): State<Arc<ServerState>>) -> Response {
    match run_blocking(|| state.service.readiness()) {
        Ok(()) => json_response(
            StatusCode::OK,
            &MessageResponse {
                success: true,
                message: "ready".to_string(),
            },
        ),
        Err(err) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &MessageResponse::failure(err.to_string()),
        ),
    }
}

// ============================================================================
// SECTION: Request Processing
// ============================================================================

/// Parses and applies an import body.
fn import(
    state: &ServerState,
    bytes: &Bytes,
    table: &mut Option<String>,
) -> Result<ImportResult, Failure> {
    let body: ImportBody = state.parse_body(bytes)?;
    let request = body.into_request().map_err(Failure::invalid)?;
    *table = Some(request.table.to_string());
    Ok(run_blocking(|| state.service.import(request))?)
}

/// Parses and runs a validation body.
fn validate(
    state: &ServerState,
    bytes: &Bytes,
    table: &mut Option<String>,
) -> Result<ValidationReport, Failure> {
    let body: ValidateBody = state.parse_body(bytes)?;
    let target = body.table();
    *table = target.as_ref().map(ToString::to_string);
    Ok(run_blocking(|| state.service.validate(target.as_ref(), &body.data, &body.columns))?)
}

/// Parses and runs a filter body.
fn filter(
    state: &ServerState,
    bytes: &Bytes,
    table: &mut Option<String>,
) -> Result<QueryPage, Failure> {
    let body: FilterBody = state.parse_body(bytes)?;
    let request = body.into_request(state.default_page_size).map_err(Failure::invalid)?;
    *table = Some(request.table.to_string());
    Ok(run_blocking(|| state.service.query(&request))?)
}

impl ServerState {
    /// Unwraps the buffered body, mapping extractor rejections to failures.
    fn read_body(&self, body: Result<Bytes, BytesRejection>) -> Result<Bytes, Failure> {
        body.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                self.too_large()
            } else {
                Failure::invalid(format!("invalid request body: {}", rejection.body_text()))
            }
        })
    }

    /// Builds the 413 failure for bodies over the configured limit.
    fn too_large(&self) -> Failure {
        Failure {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            kind: "payload_too_large",
            message: format!("request body exceeds {} bytes", self.max_body_bytes),
        }
    }

    /// Size-checks and parses a JSON request body.
    fn parse_body<T: DeserializeOwned>(&self, bytes: &Bytes) -> Result<T, Failure> {
        if bytes.len() > self.max_body_bytes {
            return Err(self.too_large());
        }
        serde_json::from_slice(bytes.as_ref())
            .map_err(|err| Failure::invalid(format!("invalid request body: {err}")))
    }

    /// Records a success event.
    fn completed(
        &self,
        event: &'static str,
        route: &'static str,
        table: Option<String>,
        counts: AuditCounts,
        request_bytes: usize,
    ) {
        self.audit.record(&IngestAuditEvent::completed(event, route, table, counts, request_bytes));
    }

    /// Records a failure event and renders the failure envelope.
    fn reject(
        &self,
        route: &'static str,
        table: Option<String>,
        failure: &Failure,
        request_bytes: usize,
    ) -> Response {
        self.audit.record(&IngestAuditEvent::failed(
            route,
            table,
            failure.status.as_u16(),
            failure.kind,
            request_bytes,
        ));
        json_response(failure.status, &MessageResponse::failure(failure.message.clone()))
    }
}

/// Runs synchronous service work, shifting to a blocking context when available.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Serializes a JSON response.
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (status, Json(body)).into_response()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request failure rendered as a non-200 response.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Failure {
    /// HTTP status.
    status: StatusCode,
    /// Normalized error kind label for audit.
    kind: &'static str,
    /// Client-facing message.
    message: String,
}

impl Failure {
    /// Builds a 400 for a malformed request.
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }
}

impl From<IngestError> for Failure {
    fn from(err: IngestError) -> Self {
        let (status, kind) = match &err {
            IngestError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            IngestError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            IngestError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            IngestError::Infrastructure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure"),
        };
        Self {
            status,
            kind,
            message: err.to_string(),
        }
    }
}

/// Ingest server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
