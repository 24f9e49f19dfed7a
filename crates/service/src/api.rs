//! REST API Endpoints
//!
//! Sidecar building, health, status, and build record endpoints.

use std::time::Instant;

use crate::state::{AppState, BuildCounts, BuildRecord, BuildStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sidecar_gen::{
    BeaconBlock, BlobSidecars, BlobsBundle, ChainConfig, ChainSpec, FieldRootsBody,
    SidecarError,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;

const BUILD_TIMEOUTS_TOTAL: &str = "sidecar_build_timeouts_total";

/// Run the API server
pub async fn run_server(listen: String, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(address = %listen, "API server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/sidecars", post(build_sidecars))
        .route("/builds/{slot}", get(get_build))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors returned by the API
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Local sidecar builder is disabled")]
    BuilderDisabled,

    #[error("Inconsistent block body: {0}")]
    InconsistentBody(#[from] sidecar_gen::BodyAssemblyError),

    #[error("Sidecar build timed out after {0} ms")]
    Timeout(u64),

    #[error(transparent)]
    Build(#[from] SidecarError),

    #[error("Sidecar build task failed: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BuilderDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::InconsistentBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Build(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Sidecar build request
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub block: BeaconBlock<FieldRootsBody>,
    pub bundle: BlobsBundle,
}

/// Build sidecars for a block
async fn build_sidecars(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> Result<Json<BlobSidecars>, ApiError> {
    let slot = request.block.slot;
    let start = Instant::now();

    let result = run_build(&state, request).await;

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let record = match &result {
        Ok(sidecars) => BuildRecord {
            slot,
            status: BuildStatus::Built,
            sidecars: sidecars.len(),
            body_root: sidecars
                .get(0)
                .map(|s| format!("0x{}", hex::encode(s.header().body_root))),
            duration_ms,
            error: None,
        },
        Err(e) => BuildRecord {
            slot,
            status: match e {
                ApiError::Timeout(_) => BuildStatus::TimedOut,
                _ => BuildStatus::Failed,
            },
            sidecars: 0,
            body_root: None,
            duration_ms,
            error: Some(e.to_string()),
        },
    };
    state.record_build(record);

    result.map(Json)
}

async fn run_build(state: &AppState, request: BuildRequest) -> Result<BlobSidecars, ApiError> {
    let config = state.config();
    if !config.local_builder {
        return Err(ApiError::BuilderDisabled);
    }

    let BuildRequest { block, bundle } = request;
    let factory = state.factory();
    block.body.check(factory.chain_spec(), factory.leafifier())?;

    let timeout = config.build_timeout;
    let worker_state = state.clone();
    let task = tokio::task::spawn_blocking(move || {
        worker_state.factory().build_sidecars(&block, &bundle)
    });

    match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            metrics::counter!(BUILD_TIMEOUTS_TOTAL).increment(1);
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(timeout_ms, "Sidecar build timed out");
            Err(ApiError::Timeout(timeout_ms))
        }
        Ok(Err(join_error)) => Err(ApiError::Internal(join_error.to_string())),
        Ok(Ok(result)) => result.map_err(ApiError::from),
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    local_builder: bool,
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.config().local_builder;
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        local_builder: healthy,
    };

    (status_code, Json(response))
}

/// Status response
#[derive(Serialize)]
struct StatusResponse {
    head_slot: u64,
    uptime_secs: u64,
    chain: ChainConfig,
    inclusion_proof_depth: u32,
    builds: BuildCounts,
    last_error: Option<String>,
}

/// Status endpoint
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let chain = state.config().chain;
    Json(StatusResponse {
        head_slot: state.head_slot(),
        uptime_secs: state.uptime_secs(),
        chain,
        inclusion_proof_depth: chain.inclusion_proof_depth(),
        builds: state.build_counts(),
        last_error: state.last_error(),
    })
}

/// Get the last build record for a slot
async fn get_build(
    State(state): State<AppState>,
    Path(slot): Path<u64>,
) -> Result<Json<BuildRecord>, StatusCode> {
    state.get_build(slot).map(Json).ok_or(StatusCode::NOT_FOUND)
}
