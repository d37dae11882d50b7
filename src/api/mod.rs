//! HTTP surface consumed by the browser dashboard.

pub mod alerts;
pub mod emergency_contacts;
pub mod status;

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};

use crate::app::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

/// All dashboard routes. Tracing, CORS and metrics layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Emergency contacts
        .route(
            "/emergency-contacts",
            get(emergency_contacts::list_emergency_contacts)
                .post(emergency_contacts::create_emergency_contact),
        )
        .route(
            "/emergency-contacts/:id",
            delete(emergency_contacts::delete_emergency_contact),
        )
        .route(
            "/emergency-contacts/:id/primary",
            post(emergency_contacts::toggle_primary_contact),
        )
        // Accident alerts
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/trigger", post(alerts::trigger_alert))
        .route("/alerts/changes", get(alerts::alert_changes))
        .route("/alerts/:id/status", post(alerts::set_alert_status))
        // Helmet status and device reports
        .route("/status", get(status::get_status))
        .route("/status/monitoring", post(status::set_monitoring))
        .route("/device/position", post(status::report_position))
        .route("/device/position/denied", post(status::report_position_denied))
        .route("/dashboard", get(status::get_dashboard))
        .layer(Extension(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::dashboard::NOTIFICATION_TTL;
    use crate::testing::test_store;

    async fn test_app() -> (Router, AppState) {
        let state = AppState::new(test_store().await, NOTIFICATION_TTL);
        (router(state.clone()), state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health() {
        let (app, _) = test_app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn contact_lifecycle() {
        let (app, _) = test_app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/emergency-contacts",
            Some(json!({"name": "Ada", "phone": "555-0100", "relationship": "Doctor"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["contact"]["relationship"], "Doctor");
        assert_eq!(created["contacts"].as_array().unwrap().len(), 1);
        let id = created["contact"]["id"].as_str().unwrap().to_string();

        let (status, toggled) =
            send(&app, "POST", &format!("/emergency-contacts/{id}/primary"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["is_primary"], true);

        let (status, deleted) = send(&app, "DELETE", &format!("/emergency-contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["contacts"], json!([]));

        let (status, _) = send(&app, "DELETE", &format!("/emergency-contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn contact_without_phone_is_rejected() {
        let (app, _) = test_app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/emergency-contacts",
            Some(json!({"name": "Ada", "phone": ""})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "phone must not be empty");
    }

    #[tokio::test]
    async fn trigger_requires_monitoring() {
        let (app, _) = test_app().await;

        let (status, _) = send(&app, "POST", "/alerts/trigger", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, alerts) = send(&app, "GET", "/alerts", None).await;
        assert_eq!(alerts, json!([]));
    }

    #[tokio::test]
    async fn alert_lifecycle() {
        let (app, state) = test_app().await;
        let (status, monitoring) =
            send(&app, "POST", "/status/monitoring", Some(json!({"enabled": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(monitoring["trigger_enabled"], true);

        let (status, raised) = send(
            &app,
            "POST",
            "/alerts/trigger",
            Some(json!({"latitude": 40.7128, "longitude": -74.006})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(raised["alert"]["status"], "Active");
        assert_eq!(raised["alert"]["latitude"], 40.7128);
        assert!(raised["notification"]["message"]
            .as_str()
            .unwrap()
            .contains("40.7128, -74.0060"));
        assert!(state.dashboard.notification().await.is_some());
        let id = raised["alert"]["id"].as_str().unwrap().to_string();

        let (status, alerts) = send(&app, "GET", "/alerts?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(alerts.as_array().unwrap().len(), 1);

        let uri = format!("/alerts/{id}/status");
        let (status, resolved) =
            send(&app, "POST", &uri, Some(json!({"status": "False Alarm"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resolved["status"], "False Alarm");
        assert_eq!(resolved["resolved_at"], Value::Null);

        let (status, _) = send(&app, "POST", &uri, Some(json!({"status": "Resolved"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn active_is_not_an_allowed_status() {
        let (app, state) = test_app().await;
        state.dashboard.start_monitoring().await;
        let alert = state.workflow.trigger_alert(None).await.unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/alerts/{}/status", alert.id),
            Some(json!({"status": "Active"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_location_is_a_bad_request() {
        let (app, state) = test_app().await;
        state.dashboard.start_monitoring().await;

        let (status, _) = send(&app, "POST", "/alerts/trigger", Some(json!({"lat": 1}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn position_reports_reach_the_dashboard() {
        let (app, state) = test_app().await;
        state.dashboard.start_monitoring().await;

        let (status, _) = send(
            &app,
            "POST",
            "/device/position",
            Some(json!({"latitude": 1.0, "longitude": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
        loop {
            let (_, status) = send(&app, "GET", "/status", None).await;
            if status["location"] == json!({"latitude": 1.0, "longitude": 2.0}) {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "position never arrived");
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn change_stream_reports_a_lagged_burst_with_data() {
        use futures::StreamExt;

        let (app, state) = test_app().await;
        state.dashboard.start_monitoring().await;
        let response = app
            .oneshot(Request::get("/alerts/changes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // More writes than the change feed buffers
        for _ in 0..70 {
            state.workflow.trigger_with_force(None, 6.0).await.unwrap();
        }

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let first = String::from_utf8(first.to_vec()).unwrap();
        assert!(first.contains("event:") && first.contains("change"), "{first}");
        assert!(first.contains("data:"), "{first}");
        assert!(first.contains("accident_alerts"), "{first}");
    }

    #[tokio::test]
    async fn dashboard_combines_status_and_history() {
        let (app, state) = test_app().await;
        let handles = state.start_background_tasks(std::time::Duration::from_secs(30));
        state.dashboard.start_monitoring().await;
        state.workflow.trigger_alert(None).await.unwrap();

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        let body = loop {
            let (_, body) = send(&app, "GET", "/dashboard", None).await;
            if body["alerts"].as_array().map(Vec::len) == Some(1) {
                break body;
            }
            assert!(tokio::time::Instant::now() < deadline, "history view never refreshed");
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        };

        assert_eq!(body["status"]["monitoring"], true);
        assert!(body["notification"]["message"]
            .as_str()
            .unwrap()
            .contains("0 contacts notified"));

        state.dashboard.shutdown();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
