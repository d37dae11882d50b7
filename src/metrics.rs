use sea_orm::{ActiveEnum, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::{accident_alert, prelude::*};

/// Seeds the gauges from what is already stored; later writes adjust them in place.
pub async fn init_metrics(db: &DatabaseConnection) {
    let contact_count = EmergencyContact::find().count(db).await.unwrap_or(0);
    metrics::gauge!("helmet_contacts_total").set(contact_count as f64);

    let alert_count = AccidentAlert::find().count(db).await.unwrap_or(0);
    metrics::gauge!("helmet_alerts_total").set(alert_count as f64);

    let active_count = AccidentAlert::find()
        .filter(accident_alert::Column::Status.eq(AlertStatus::Active.to_value()))
        .count(db)
        .await
        .unwrap_or(0);
    metrics::gauge!("helmet_active_alerts").set(active_count as f64);

    tracing::info!(
        "Initialized metrics: Contacts={}, Alerts={}, Active={}",
        contact_count,
        alert_count,
        active_count
    );
}
