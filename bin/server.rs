// Dompet - Web Server
// JSON API over the transaction store with Axum

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use dompet::config::{config_path, init_logging, load_config};
use dompet::export::export_file_name;
use dompet::filter::empty_as_none;
use dompet::schema::{describe_errors, validate_patch};
use dompet::{
    category_breakdown, expense_trend, export_csv, financial_health, monthly_summary, parse_bytes,
    resolve_type, statistics, validate_transaction, with_percentages, AliasTable, ExportError,
    ExportLayout, NewTransaction, ParseError, RowError, RowValidator, SourceFormat, StoreError,
    TransactionFilter, TransactionPatch, TransactionStore, TransactionType,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Box<dyn TransactionStore>>>,
    aliases: Arc<AliasTable>,
}

impl AppState {
    fn new(store: Box<dyn TransactionStore>, aliases: AliasTable) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            aliases: Arc::new(aliases),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Box<dyn TransactionStore>>, ApiError> {
        self.store
            .lock()
            .map_err(|_| ApiError::Internal("store lock poisoned".to_string()))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Invalid(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Invalid(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => {
                error!(message = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(ApiResponse::err(message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::Empty => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - List, optionally filtered
async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionFilter>, QueryRejection>,
) -> ApiResult<Vec<dompet::Transaction>> {
    let Query(filter) = query?;
    let txs = state.store()?.list()?;
    Ok(Json(ApiResponse::ok(filter.apply(&txs))))
}

/// POST /api/transactions - Validated create
async fn create_transaction(
    State(state): State<AppState>,
    Json(new): Json<NewTransaction>,
) -> Result<(StatusCode, Json<ApiResponse<dompet::Transaction>>), ApiError> {
    validate_transaction(&new).map_err(|errors| ApiError::Invalid(describe_errors(&errors)))?;
    let tx = state.store()?.create(new)?;
    info!(id = %tx.id, "created transaction");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(tx))))
}

/// GET /api/transactions/:id
async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<dompet::Transaction> {
    let tx = state
        .store()?
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {}", id)))?;
    Ok(Json(ApiResponse::ok(tx)))
}

/// PATCH /api/transactions/:id - Partial update, validated against the result
async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TransactionPatch>,
) -> ApiResult<dompet::Transaction> {
    let mut store = state.store()?;
    let current = store
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {}", id)))?;
    validate_patch(&current, &patch).map_err(|errors| ApiError::Invalid(describe_errors(&errors)))?;

    let tx = store.update(&id, &patch)?;
    Ok(Json(ApiResponse::ok(tx)))
}

/// DELETE /api/transactions/:id
async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<bool> {
    if !state.store()?.delete(&id)? {
        return Err(ApiError::NotFound(format!("transaction not found: {}", id)));
    }
    Ok(Json(ApiResponse::ok(true)))
}

/// GET /api/stats
async fn get_stats(
    State(state): State<AppState>,
    query: Result<Query<TransactionFilter>, QueryRejection>,
) -> ApiResult<dompet::Statistics> {
    let Query(filter) = query?;
    let txs = filter.apply(&state.store()?.list()?);
    Ok(Json(ApiResponse::ok(statistics(&txs))))
}

/// GET /api/monthly
async fn get_monthly(State(state): State<AppState>) -> ApiResult<Vec<dompet::MonthlySummary>> {
    let txs = state.store()?.list()?;
    Ok(Json(ApiResponse::ok(monthly_summary(&txs))))
}

/// GET /api/categories/:tipe - Breakdown with whole-percent shares
async fn get_categories(
    State(state): State<AppState>,
    Path(tipe): Path<String>,
) -> ApiResult<Vec<dompet::CategoryShare>> {
    let tipe: TransactionType = resolve_type(&tipe)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown transaction type: {}", tipe)))?;
    let txs = state.store()?.list()?;
    Ok(Json(ApiResponse::ok(with_percentages(&category_breakdown(&txs, tipe)))))
}

/// GET /api/health-score
async fn get_health_score(State(state): State<AppState>) -> ApiResult<dompet::HealthReport> {
    let txs = state.store()?.list()?;
    Ok(Json(ApiResponse::ok(financial_health(&txs))))
}

/// GET /api/trend - Monthly expenses, oldest first
async fn get_trend(State(state): State<AppState>) -> ApiResult<Vec<dompet::TrendPoint>> {
    let txs = state.store()?.list()?;
    Ok(Json(ApiResponse::ok(expense_trend(&txs))))
}

#[derive(Debug, Default, Deserialize)]
struct ImportQuery {
    #[serde(default)]
    dry_run: bool,
    /// File extension of the upload (`csv`, `xlsx`, ...); CSV when absent
    #[serde(default)]
    format: Option<String>,
}

impl ImportQuery {
    fn source_format(&self) -> Result<SourceFormat, ParseError> {
        match self.format.as_deref().filter(|f| !f.trim().is_empty()) {
            None => Ok(SourceFormat::Delimited),
            Some(ext) => SourceFormat::from_extension(ext)
                .ok_or_else(|| ParseError::UnsupportedFormat(ext.to_string())),
        }
    }
}

#[derive(Serialize)]
struct ImportResponse {
    valid: usize,
    inserted: usize,
    errors: Vec<RowError>,
}

/// POST /api/import - Raw file body; `?format=xlsx` for spreadsheets
async fn import_file(
    State(state): State<AppState>,
    query: Result<Query<ImportQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult<ImportResponse> {
    let Query(query) = query?;
    let rows = parse_bytes(&body, query.source_format()?, &state.aliases)?;
    let result = RowValidator::new(&state.aliases).validate(rows);

    let inserted = if query.dry_run {
        0
    } else {
        let mut store = state.store()?;
        dompet::commit(&mut **store, &result)?
    };

    Ok(Json(ApiResponse::ok(ImportResponse {
        valid: result.valid.len(),
        inserted,
        errors: result.errors,
    })))
}

#[derive(Debug, Default, Deserialize)]
struct ExportQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    layout: Option<ExportLayout>,
    #[serde(default, deserialize_with = "empty_as_none")]
    start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    kategori: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    tipe: Option<TransactionType>,
    #[serde(default)]
    search_query: Option<String>,
}

/// GET /api/export - CSV download
async fn export_transactions(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let filter = TransactionFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        kategori: query.kategori,
        tipe: query.tipe,
        search_query: query.search_query,
    };
    let txs = filter.apply(&state.store()?.list()?);
    let csv = export_csv(&txs, query.layout.unwrap_or_default())?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(Local::now().date_naive())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

// ============================================================================
// Main Server
// ============================================================================

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
        .route("/stats", get(get_stats))
        .route("/monthly", get(get_monthly))
        .route("/categories/:tipe", get(get_categories))
        .route("/health-score", get(get_health_score))
        .route("/trend", get(get_trend))
        .route("/import", post(import_file))
        .route("/export", get(export_transactions))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config(&config_path(None))?;
    init_logging(&cfg.logging)?;

    println!("🌐 Dompet - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = cfg.open_store()?;
    info!(backend = ?cfg.storage.backend, path = %cfg.storage.path.display(), "store opened");
    let state = AppState::new(store, cfg.alias_table()?);

    let addr = cfg.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/transactions", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
