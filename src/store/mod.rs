//! Access to the `emergency_contacts` and `accident_alerts` collections.
//!
//! Everything above this module talks to the store through [`ContactStore`] and
//! [`AlertStore`] only. [`DbStore`] is the sea-orm backed implementation.

mod db;

pub use db::DbStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::entities::{accident_alert, emergency_contact, prelude::*};
use crate::error::StoreError;

pub const CONTACTS_TABLE: &str = "emergency_contacts";
pub const ALERTS_TABLE: &str = "accident_alerts";

/// Fields of a contact row before the store assigns `id` and `created_at`.
#[derive(Clone, Debug)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Relationship,
}

#[derive(Clone, Debug)]
pub struct NewAlert {
    pub latitude: f64,
    pub longitude: f64,
    pub severity: Severity,
    pub impact_force: f64,
    pub alerted_contacts: Vec<Uuid>,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert_contact(
        &self,
        contact: NewContact,
    ) -> Result<emergency_contact::Model, StoreError>;

    /// All contacts, primary first, then newest first.
    async fn list_contacts(&self) -> Result<Vec<emergency_contact::Model>, StoreError>;

    async fn find_contact(&self, id: Uuid)
        -> Result<Option<emergency_contact::Model>, StoreError>;

    /// Update-by-id of the primary flag. Returns false when no row matched.
    async fn set_primary_flag(&self, id: Uuid, is_primary: bool) -> Result<bool, StoreError>;

    /// Update-where-not-id: clears the primary flag on every other contact.
    async fn clear_primary_except(&self, id: Uuid) -> Result<u64, StoreError>;

    /// Returns false when no row matched.
    async fn delete_contact(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Single atomic insert; the row starts out `Active`.
    async fn insert_alert(&self, alert: NewAlert) -> Result<accident_alert::Model, StoreError>;

    /// Newest first, at most `limit` rows.
    async fn list_recent_alerts(
        &self,
        limit: u64,
    ) -> Result<Vec<accident_alert::Model>, StoreError>;

    async fn find_alert(&self, id: Uuid) -> Result<Option<accident_alert::Model>, StoreError>;

    /// Conditional update: only applies while the row is still `Active`.
    /// Returns false when nothing changed.
    async fn transition_from_active(
        &self,
        id: Uuid,
        status: AlertStatus,
        resolved_at: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError>;

    /// Table-level change notifications for `accident_alerts`.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row changed in `table`. Carries no row data; consumers re-query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: &'static str,
    pub kind: ChangeKind,
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
