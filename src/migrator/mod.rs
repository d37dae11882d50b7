use sea_orm_migration::prelude::*;

mod m20260301_000001_create_emergency_contacts;
mod m20260301_000002_create_accident_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_emergency_contacts::Migration),
            Box::new(m20260301_000002_create_accident_alerts::Migration),
        ]
    }
}
