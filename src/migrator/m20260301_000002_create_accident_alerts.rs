use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccidentAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccidentAlerts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccidentAlerts::Latitude).double().not_null())
                    .col(ColumnDef::new(AccidentAlerts::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(AccidentAlerts::Severity)
                            .string()
                            .default("Low")
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccidentAlerts::ImpactForce).double().not_null())
                    // Snapshot of contact ids, no foreign key: contacts may be deleted later
                    .col(ColumnDef::new(AccidentAlerts::AlertedContacts).json().not_null())
                    .col(
                        ColumnDef::new(AccidentAlerts::Status)
                            .string()
                            .default("Active")
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccidentAlerts::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccidentAlerts::ResolvedAt).date_time())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accident_alerts_created_at")
                    .table(AccidentAlerts::Table)
                    .col(AccidentAlerts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccidentAlerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AccidentAlerts {
    Table,
    Id,
    Latitude,
    Longitude,
    Severity,
    ImpactForce,
    AlertedContacts,
    Status,
    CreatedAt,
    ResolvedAt,
}
