use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::device::Coordinates;
use crate::entities::{accident_alert, prelude::*};
use crate::error::{StatusError, WorkflowError};
use crate::history::{StatusChange, DEFAULT_HISTORY_LIMIT};
use crate::store::{ChangeEvent, ChangeKind, ALERTS_TABLE};

#[derive(Serialize)]
pub struct AlertResponse {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub impact_force: f64,
    pub impact_label: String,
    pub alerted_contacts: Vec<Uuid>,
    pub status: AlertStatus,
    pub created_at: chrono::NaiveDateTime,
    pub resolved_at: Option<chrono::NaiveDateTime>,
    pub maps_url: String,
}

impl From<accident_alert::Model> for AlertResponse {
    fn from(alert: accident_alert::Model) -> Self {
        Self {
            impact_label: alert.impact_label(),
            maps_url: alert.maps_url(),
            id: alert.id,
            latitude: alert.latitude,
            longitude: alert.longitude,
            severity: alert.severity,
            impact_force: alert.impact_force,
            alerted_contacts: alert.alerted_contacts.0,
            status: alert.status,
            created_at: alert.created_at,
            resolved_at: alert.resolved_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListAlertsQuery {
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: AlertStatus,
}

fn record(action: &str, alert_id: Option<Uuid>) {
    let span = tracing::Span::current();
    span.record("table", "accident_alerts").record("action", action);
    if let Some(id) = alert_id {
        span.record("alert_id", tracing::field::display(id));
    }
}

// GET /alerts?limit=N - Newest first
pub async fn list_alerts(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> impl IntoResponse {
    record("list_alerts", None);

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match state.history.list_recent_alerts(limit).await {
        Ok(alerts) => {
            let response: Vec<AlertResponse> = alerts.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to fetch accident alerts: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch alerts").into_response()
        }
    }
}

// POST /alerts/trigger - Body is optional: {"latitude": .., "longitude": ..}
pub async fn trigger_alert(Extension(state): Extension<AppState>, body: Bytes) -> impl IntoResponse {
    let location = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Coordinates>(&body) {
            Ok(location) => Some(location),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": format!("Invalid location: {}", e)})),
                )
                    .into_response()
            }
        }
    };

    match state.workflow.trigger_alert(location).await {
        Ok(alert) => {
            record("trigger_alert", Some(alert.id));
            tracing::Span::current().record("business_event", "Accident alert raised");
            let notification = state.dashboard.notification().await;
            let alert: AlertResponse = alert.into();
            (
                StatusCode::CREATED,
                Json(json!({"alert": alert, "notification": notification})),
            )
                .into_response()
        }
        Err(WorkflowError::MonitoringOff) => {
            record("trigger_alert_rejected", None);
            (
                StatusCode::CONFLICT,
                Json(json!({"error": "Start monitoring to enable accident detection"})),
            )
                .into_response()
        }
        Err(e) => {
            // Nothing was shown to the user, the alert simply did not happen
            error!("Accident alert not raised: {}", e);
            record("trigger_alert_failed", None);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to raise alert").into_response()
        }
    }
}

// POST /alerts/:id/status - Active -> Resolved | False Alarm, once
pub async fn set_alert_status(
    Extension(state): Extension<AppState>,
    Path(alert_id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> impl IntoResponse {
    record("set_alert_status", Some(alert_id));

    match state.history.set_status(alert_id, payload.status).await {
        Ok(StatusChange::Applied(alert)) => {
            let alert: AlertResponse = alert.into();
            (StatusCode::OK, Json(alert)).into_response()
        }
        Ok(StatusChange::Unchanged(alert)) => {
            info!("Alert {} already settled", alert_id);
            let alert: AlertResponse = alert.into();
            (
                StatusCode::CONFLICT,
                Json(json!({"error": "Alert is no longer active", "alert": alert})),
            )
                .into_response()
        }
        Err(StatusError::InvalidTarget) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": StatusError::InvalidTarget.to_string()})),
        )
            .into_response(),
        Err(StatusError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "Alert not found").into_response()
        }
        Err(StatusError::Store(e)) => {
            error!("Failed to update alert status: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update alert").into_response()
        }
    }
}

/// `EventSource` drops events without a data line, so every event carries one.
fn change_event(change: ChangeEvent) -> Event {
    Event::default()
        .event("change")
        .json_data(change)
        .unwrap_or_else(|_| Event::default().event("change").data(change.table))
}

// GET /alerts/changes - One "change" event per write, clients re-query
pub async fn alert_changes(
    Extension(state): Extension<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = state.subscribe_alert_changes();

    let events = stream::unfold(changes, |mut changes| async move {
        let event = match changes.recv().await {
            Ok(change) => change_event(change),
            // Missed events still mean the table changed
            Err(RecvError::Lagged(_)) => change_event(ChangeEvent {
                table: ALERTS_TABLE,
                kind: ChangeKind::Update,
            }),
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(event), changes))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
