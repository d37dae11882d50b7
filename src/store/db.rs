use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::{
    AlertStore, ChangeEvent, ChangeFeed, ChangeKind, ContactStore, NewAlert, NewContact,
    ALERTS_TABLE,
};
use crate::entities::{accident_alert, emergency_contact, prelude::*};
use crate::error::StoreError;

/// sea-orm backed store. Writes to `accident_alerts` are announced on the change feed.
#[derive(Clone)]
pub struct DbStore {
    db: DatabaseConnection,
    feed: ChangeFeed,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            feed: ChangeFeed::default(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn alert_changed(&self, kind: ChangeKind) {
        self.feed.publish(ChangeEvent {
            table: ALERTS_TABLE,
            kind,
        });
    }
}

#[async_trait]
impl ContactStore for DbStore {
    async fn insert_contact(
        &self,
        contact: NewContact,
    ) -> Result<emergency_contact::Model, StoreError> {
        let active_model = emergency_contact::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(contact.name),
            phone: Set(contact.phone),
            email: Set(contact.email),
            relationship: Set(contact.relationship),
            is_primary: Set(false),
            created_at: Set(chrono::Utc::now().naive_utc()),
        };

        Ok(active_model.insert(&self.db).await?)
    }

    async fn list_contacts(&self) -> Result<Vec<emergency_contact::Model>, StoreError> {
        Ok(EmergencyContact::find()
            .order_by_desc(emergency_contact::Column::IsPrimary)
            .order_by_desc(emergency_contact::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    async fn find_contact(
        &self,
        id: Uuid,
    ) -> Result<Option<emergency_contact::Model>, StoreError> {
        Ok(EmergencyContact::find_by_id(id).one(&self.db).await?)
    }

    async fn set_primary_flag(&self, id: Uuid, is_primary: bool) -> Result<bool, StoreError> {
        let result = EmergencyContact::update_many()
            .col_expr(emergency_contact::Column::IsPrimary, Expr::value(is_primary))
            .filter(emergency_contact::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn clear_primary_except(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = EmergencyContact::update_many()
            .col_expr(emergency_contact::Column::IsPrimary, Expr::value(false))
            .filter(emergency_contact::Column::Id.ne(id))
            .filter(emergency_contact::Column::IsPrimary.eq(true))
            .exec(&self.db)
            .await?;

        debug!("Cleared primary flag on {} contact(s)", result.rows_affected);
        Ok(result.rows_affected)
    }

    async fn delete_contact(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = EmergencyContact::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl AlertStore for DbStore {
    async fn insert_alert(&self, alert: NewAlert) -> Result<accident_alert::Model, StoreError> {
        let active_model = accident_alert::ActiveModel {
            id: Set(Uuid::new_v4()),
            latitude: Set(alert.latitude),
            longitude: Set(alert.longitude),
            severity: Set(alert.severity),
            impact_force: Set(alert.impact_force),
            alerted_contacts: Set(ContactIds(alert.alerted_contacts)),
            status: Set(AlertStatus::Active),
            created_at: Set(chrono::Utc::now().naive_utc()),
            resolved_at: Set(None),
        };

        let model = active_model.insert(&self.db).await?;
        self.alert_changed(ChangeKind::Insert);
        Ok(model)
    }

    async fn list_recent_alerts(
        &self,
        limit: u64,
    ) -> Result<Vec<accident_alert::Model>, StoreError> {
        Ok(AccidentAlert::find()
            .order_by_desc(accident_alert::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<accident_alert::Model>, StoreError> {
        Ok(AccidentAlert::find_by_id(id).one(&self.db).await?)
    }

    async fn transition_from_active(
        &self,
        id: Uuid,
        status: AlertStatus,
        resolved_at: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError> {
        let result = AccidentAlert::update_many()
            .col_expr(accident_alert::Column::Status, Expr::value(status.to_value()))
            .col_expr(accident_alert::Column::ResolvedAt, Expr::value(resolved_at))
            .filter(accident_alert::Column::Id.eq(id))
            .filter(accident_alert::Column::Status.eq(AlertStatus::Active.to_value()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        self.alert_changed(ChangeKind::Update);
        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
