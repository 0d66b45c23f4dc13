//! Route table and handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use lanwatch_core::{
    DeviceListing, DeviceRecord, ScanId, ScanListing, ScanRequest, ScanResult, ScanStatus,
};
use lanwatch_discover::netinfo::{self, NetworkInfo};
use lanwatch_discover::ScanCoordinator;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ApiResult;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: ScanCoordinator,
    /// Suggested range when local interfaces cannot be enumerated.
    pub default_network_range: String,
}

/// Build the full application router.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/scan", post(start_scan))
        .route("/scan/{id}", get(scan_status).delete(cancel_scan))
        .route("/scan/{id}/devices", get(scan_devices))
        .route("/scans", get(list_scans))
        .route("/network/info", get(network_info))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Response to a successful `POST /scan`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStarted {
    pub scan_id: ScanId,
    pub status: &'static str,
    pub progress: u8,
    pub devices: Vec<DeviceRecord>,
    pub total_devices: usize,
    pub timestamp: DateTime<Utc>,
}

impl From<ScanResult> for ScanStarted {
    fn from(result: ScanResult) -> Self {
        Self {
            scan_id: result.scan_id,
            status: "started",
            progress: result.progress,
            devices: result.devices,
            total_devices: result.total_devices,
            timestamp: result.timestamp,
        }
    }
}

/// Response to `DELETE /scan/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub message: &'static str,
    pub scan_id: ScanId,
    pub status: ScanStatus,
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "lanwatch network discovery API",
        "version": env!("CARGO_PKG_VERSION"),
        "prober": state.coordinator.prober_name(),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn start_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<Json<ScanStarted>> {
    let Json(request) = payload?;
    let initial = state.coordinator.submit(&request)?;
    Ok(Json(initial.into()))
}

async fn scan_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScanResult>> {
    let scan_id: ScanId = id.parse()?;
    Ok(Json(state.coordinator.status(&scan_id)?))
}

async fn scan_devices(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeviceListing>> {
    let scan_id: ScanId = id.parse()?;
    Ok(Json(state.coordinator.devices(&scan_id)?))
}

async fn cancel_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let scan_id: ScanId = id.parse()?;
    let outcome = state.coordinator.cancel(&scan_id)?;
    let status = state.coordinator.status(&scan_id)?.status;
    Ok(Json(CancelResponse {
        message: outcome.message(),
        scan_id,
        status,
    }))
}

async fn list_scans(State(state): State<AppState>) -> Json<ScanListing> {
    Json(state.coordinator.list())
}

async fn network_info(State(state): State<AppState>) -> Json<NetworkInfo> {
    Json(netinfo::network_info(&state.default_network_range))
}
