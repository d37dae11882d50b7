use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use super::alerts::AlertResponse;
use crate::app::AppState;
use crate::dashboard::Notification;
use crate::device::Coordinates;
use crate::status::HelmetStatus;

#[derive(Deserialize)]
pub struct MonitoringRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub status: HelmetStatus,
    pub notification: Option<Notification>,
    pub alerts: Vec<AlertResponse>,
}

// GET /status
pub async fn get_status(Extension(state): Extension<AppState>) -> Json<HelmetStatus> {
    Json(state.dashboard.status().await)
}

// POST /status/monitoring
pub async fn set_monitoring(
    Extension(state): Extension<AppState>,
    Json(payload): Json<MonitoringRequest>,
) -> Json<HelmetStatus> {
    tracing::Span::current()
        .record("action", if payload.enabled { "start_monitoring" } else { "stop_monitoring" });
    state.dashboard.set_monitoring(payload.enabled).await;
    Json(state.dashboard.status().await)
}

// POST /device/position - Fix from the browser's geolocation watch
pub async fn report_position(
    Extension(state): Extension<AppState>,
    Json(position): Json<Coordinates>,
) -> impl IntoResponse {
    state.device.report_position(position);
    StatusCode::NO_CONTENT
}

// POST /device/position/denied
pub async fn report_position_denied(Extension(state): Extension<AppState>) -> impl IntoResponse {
    tracing::warn!("Geolocation permission denied by the browser");
    state.device.report_denied();
    StatusCode::NO_CONTENT
}

// GET /dashboard - Status card, banner and the live alert history in one read
pub async fn get_dashboard(Extension(state): Extension<AppState>) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        status: state.dashboard.status().await,
        notification: state.dashboard.notification().await,
        alerts: state
            .history_view
            .snapshot()
            .await
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}
