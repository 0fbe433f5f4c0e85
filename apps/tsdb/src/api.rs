//! # HTTP API
//!
//! axum router over a shared [`Database`], served by `tsdb-server`.
//!
//! | method | path                                              |
//! |--------|---------------------------------------------------|
//! | GET    | `/health`                                         |
//! | GET    | `/measurands`                                     |
//! | GET    | `/sources`                                        |
//! | GET    | `/timeseries?measurand=&source=&freq=`            |
//! | GET    | `/timeseries/{id}/instances`                      |
//! | GET    | `/timeseries/{id}/{freq}/{measurand}/{source}`    |
//! | POST   | `/timeseries/{id}/{freq}/{measurand}/{source}`    |
//!
//! The engine is synchronous; handlers call it on the blocking pool.

use crate::cli::CliResult;
use crate::ingest::{self, Points};
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tsdb_core::{
    Database, Frequency, InstanceFilter, InstanceKey, Measurand, Source, TimeseriesInstance,
    TsdbError,
};

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Handler errors, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] TsdbError),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Db(TsdbError::NotFound(_) | TsdbError::MissingData { .. }) => {
                StatusCode::NOT_FOUND
            }
            Self::Db(TsdbError::Duplicate { .. } | TsdbError::AlreadyExists(_)) => {
                StatusCode::CONFLICT
            }
            Self::Db(TsdbError::Data(_) | TsdbError::InvalidFrequency(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Db(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run an engine call on the blocking pool.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> tsdb_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub measurand: Option<String>,
    pub source: Option<String>,
    pub freq: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    /// RFC 3339 instant; reads the change log as it stood then.
    pub as_at: Option<String>,
}

/// Instance as rendered over HTTP (frequency as its alias string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceView {
    pub identifier: String,
    pub freq: String,
    pub measurand: String,
    pub source: String,
    pub uuid: String,
    pub initial_metadata: String,
}

impl From<TimeseriesInstance> for InstanceView {
    fn from(instance: TimeseriesInstance) -> Self {
        Self {
            freq: instance.freq.to_string(),
            uuid: instance.uuid.to_string(),
            identifier: instance.identifier,
            measurand: instance.measurand,
            source: instance.source,
            initial_metadata: instance.initial_metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": tsdb_core::VERSION }))
}

async fn list_measurands(State(state): State<AppState>) -> ApiResult<Vec<Measurand>> {
    blocking(&state, |db| db.list_measurands()).await.map(Json)
}

async fn list_sources(State(state): State<AppState>) -> ApiResult<Vec<Source>> {
    blocking(&state, |db| db.list_sources()).await.map(Json)
}

async fn list_timeseries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<String>> {
    let mut filter = InstanceFilter::default();
    if let Some(m) = query.measurand {
        filter = filter.measurand(m);
    }
    if let Some(s) = query.source {
        filter = filter.source(s);
    }
    if let Some(f) = query.freq {
        filter = filter.freq(f.parse::<Frequency>()?);
    }
    blocking(&state, move |db| db.ts_list(&filter)).await.map(Json)
}

async fn list_instances(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Vec<InstanceView>> {
    let instances = blocking(&state, move |db| db.list_instances(&identifier)).await?;
    Ok(Json(instances.into_iter().map(InstanceView::from).collect()))
}

fn instance_key(
    (identifier, freq, measurand, source): (String, String, String, String),
) -> Result<InstanceKey, ApiError> {
    let freq: Frequency = freq.parse()?;
    Ok(InstanceKey::new(identifier, freq, measurand, source))
}

async fn read_series(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String, String)>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<Points> {
    let key = instance_key(path)?;
    let as_at = match query.as_at.as_deref() {
        None => None,
        Some(text) => Some(
            ingest::parse_time(text)
                .ok_or_else(|| ApiError::BadRequest(format!("bad as_at time '{text}'")))?,
        ),
    };

    let series = blocking(&state, move |db| match as_at {
        Some(t) => db.read_log(&key, t),
        None => db.read(&key),
    })
    .await?;
    Ok(Json(Points::from_series(&series)))
}

async fn write_series(
    State(state): State<AppState>,
    Path(path): Path<(String, String, String, String)>,
    Json(body): Json<Points>,
) -> ApiResult<WriteSummary> {
    let key = instance_key(path)?;
    let series = body.to_series();
    let report = blocking(&state, move |db| db.write(&key, &series)).await?;
    Ok(Json(WriteSummary {
        created: report.created.len(),
        updated: report.updated.len(),
    }))
}

// =============================================================================
// ROUTER / SERVER
// =============================================================================

/// Build the router with tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/measurands", get(list_measurands))
        .route("/sources", get(list_sources))
        .route("/timeseries", get(list_timeseries))
        .route("/timeseries/{id}/instances", get(list_instances))
        .route(
            "/timeseries/{id}/{freq}/{measurand}/{source}",
            get(read_series).post(write_series),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Serve `db` on `bind` until Ctrl-C.
pub async fn serve(db: Database, bind: SocketAddr) -> CliResult<()> {
    let router = create_router(AppState::new(db));
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "tsdb server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
