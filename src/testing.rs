//! Shared fixtures for unit tests: an in-memory SQLite database with the real
//! migrations applied, and store doubles that always fail.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::entities::{accident_alert, emergency_contact, prelude::*};
use crate::error::StoreError;
use crate::migrator::Migrator;
use crate::store::{AlertStore, ChangeEvent, ChangeFeed, ContactStore, DbStore, NewAlert, NewContact};

pub async fn test_db() -> DatabaseConnection {
    // One connection, otherwise every pooled connection sees its own empty database
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn test_store() -> DbStore {
    DbStore::new(test_db().await)
}

pub fn new_contact(name: &str) -> NewContact {
    NewContact {
        name: name.to_string(),
        phone: "+1 555 0100".to_string(),
        email: None,
        relationship: Relationship::Family,
    }
}

/// Every call fails as if the remote store were unreachable.
#[derive(Default)]
pub struct UnreachableStore {
    feed: ChangeFeed,
}

fn unreachable<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl ContactStore for UnreachableStore {
    async fn insert_contact(&self, _: NewContact) -> Result<emergency_contact::Model, StoreError> {
        unreachable()
    }

    async fn list_contacts(&self) -> Result<Vec<emergency_contact::Model>, StoreError> {
        unreachable()
    }

    async fn find_contact(&self, _: Uuid) -> Result<Option<emergency_contact::Model>, StoreError> {
        unreachable()
    }

    async fn set_primary_flag(&self, _: Uuid, _: bool) -> Result<bool, StoreError> {
        unreachable()
    }

    async fn clear_primary_except(&self, _: Uuid) -> Result<u64, StoreError> {
        unreachable()
    }

    async fn delete_contact(&self, _: Uuid) -> Result<bool, StoreError> {
        unreachable()
    }
}

#[async_trait]
impl AlertStore for UnreachableStore {
    async fn insert_alert(&self, _: NewAlert) -> Result<accident_alert::Model, StoreError> {
        unreachable()
    }

    async fn list_recent_alerts(&self, _: u64) -> Result<Vec<accident_alert::Model>, StoreError> {
        unreachable()
    }

    async fn find_alert(&self, _: Uuid) -> Result<Option<accident_alert::Model>, StoreError> {
        unreachable()
    }

    async fn transition_from_active(
        &self,
        _: Uuid,
        _: AlertStatus,
        _: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError> {
        unreachable()
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
