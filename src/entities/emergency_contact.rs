use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "emergency_contacts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Relationship,
    pub is_primary: bool,
    pub created_at: DateTime,
}

/// How a contact relates to the helmet wearer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Relationship {
    #[default]
    #[sea_orm(string_value = "Family")]
    Family,
    #[sea_orm(string_value = "Friend")]
    Friend,
    #[sea_orm(string_value = "Doctor")]
    Doctor,
    #[sea_orm(string_value = "Colleague")]
    Colleague,
    #[sea_orm(string_value = "Other")]
    Other,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
