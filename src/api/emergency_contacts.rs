use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::contacts::ContactForm;
use crate::entities::{emergency_contact, prelude::*};
use crate::error::ContactError;

#[derive(Serialize)]
pub struct EmergencyContactResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Relationship,
    pub is_primary: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<emergency_contact::Model> for EmergencyContactResponse {
    fn from(model: emergency_contact::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            relationship: model.relationship,
            is_primary: model.is_primary,
            created_at: model.created_at,
        }
    }
}

fn record(action: &str, contact_id: Option<Uuid>) {
    let span = tracing::Span::current();
    span.record("table", "emergency_contacts")
        .record("action", action);
    if let Some(id) = contact_id {
        span.record("contact_id", tracing::field::display(id));
    }
}

/// Re-fetch after a successful write. A failed re-fetch only drops the list.
async fn refreshed_contacts(state: &AppState) -> Option<Vec<EmergencyContactResponse>> {
    match state.contacts.list_contacts().await {
        Ok(contacts) => Some(contacts.into_iter().map(Into::into).collect()),
        Err(e) => {
            error!("Failed to re-fetch emergency contacts: {}", e);
            None
        }
    }
}

fn contact_error_response(e: ContactError) -> axum::response::Response {
    match e {
        ContactError::MissingField(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": e.to_string()})),
        )
            .into_response(),
        ContactError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Emergency contact not found"})),
        )
            .into_response(),
        ContactError::Store(e) => {
            error!("Emergency contact store error: {}", e);
            tracing::Span::current().record("error", "store_error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update emergency contacts",
            )
                .into_response()
        }
    }
}

// GET /emergency-contacts - Primary first, then newest first
pub async fn list_emergency_contacts(Extension(state): Extension<AppState>) -> impl IntoResponse {
    record("list_contacts", None);

    match state.contacts.list_contacts().await {
        Ok(contacts) => {
            let response: Vec<EmergencyContactResponse> =
                contacts.into_iter().map(|c| c.into()).collect();
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Failed to fetch emergency contacts: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch emergency contacts",
            )
                .into_response()
        }
    }
}

// POST /emergency-contacts - Create new emergency contact
pub async fn create_emergency_contact(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ContactForm>,
) -> impl IntoResponse {
    match state.contacts.add_contact(payload).await {
        Ok(contact) => {
            record("create_contact", Some(contact.id));
            let contacts = refreshed_contacts(&state).await;
            let contact: EmergencyContactResponse = contact.into();
            (
                StatusCode::CREATED,
                Json(json!({"contact": contact, "contacts": contacts})),
            )
                .into_response()
        }
        Err(e) => {
            record("create_contact_failed", None);
            contact_error_response(e)
        }
    }
}

// DELETE /emergency-contacts/:id - Alerts keep their (now stale) reference
pub async fn delete_emergency_contact(
    Extension(state): Extension<AppState>,
    Path(contact_id): Path<Uuid>,
) -> impl IntoResponse {
    record("delete_contact", Some(contact_id));

    match state.contacts.delete_contact(contact_id).await {
        Ok(()) => {
            let contacts = refreshed_contacts(&state).await;
            (
                StatusCode::OK,
                Json(json!({"message": "Emergency contact deleted", "contacts": contacts})),
            )
                .into_response()
        }
        Err(e) => contact_error_response(e),
    }
}

// POST /emergency-contacts/:id/primary - Toggle the primary flag
pub async fn toggle_primary_contact(
    Extension(state): Extension<AppState>,
    Path(contact_id): Path<Uuid>,
) -> impl IntoResponse {
    record("toggle_primary", Some(contact_id));

    match state.contacts.set_primary(contact_id).await {
        Ok(is_primary) => {
            let contacts = refreshed_contacts(&state).await;
            (
                StatusCode::OK,
                Json(json!({"id": contact_id, "is_primary": is_primary, "contacts": contacts})),
            )
                .into_response()
        }
        Err(e) => contact_error_response(e),
    }
}
