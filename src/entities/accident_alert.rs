use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "accident_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_type = "Double")]
    pub latitude: f64,
    #[sea_orm(column_type = "Double")]
    pub longitude: f64,
    pub severity: Severity,
    #[sea_orm(column_type = "Double")]
    pub impact_force: f64,
    #[sea_orm(column_type = "Json")]
    pub alerted_contacts: ContactIds,
    pub status: AlertStatus,
    pub created_at: DateTime,
    pub resolved_at: Option<DateTime>,
}

impl Model {
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }

    /// Impact force as shown on the history card, e.g. `"9.3 G"`.
    pub fn impact_label(&self) -> String {
        format!("{:.1} G", self.impact_force)
    }
}

/// Contacts notified when the alert was raised, in the order they were read.
///
/// Entries are never rewritten, so a later contact deletion leaves a stale id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, FromJsonQueryResult)]
pub struct ContactIds(pub Vec<Uuid>);

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Severity {
    #[sea_orm(string_value = "Low")]
    Low,
    #[sea_orm(string_value = "Medium")]
    Medium,
    #[sea_orm(string_value = "High")]
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum AlertStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Resolved")]
    Resolved,
    #[serde(rename = "False Alarm")]
    #[sea_orm(string_value = "False Alarm")]
    FalseAlarm,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "Active",
            AlertStatus::Resolved => "Resolved",
            AlertStatus::FalseAlarm => "False Alarm",
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
