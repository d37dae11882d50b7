use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmergencyContacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmergencyContacts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::Phone)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EmergencyContacts::Email).string())
                    .col(
                        ColumnDef::new(EmergencyContacts::Relationship)
                            .string()
                            .default("Family")
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::IsPrimary)
                            .boolean()
                            .default(false)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmergencyContacts::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_emergency_contacts_is_primary")
                    .table(EmergencyContacts::Table)
                    .col(EmergencyContacts::IsPrimary)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmergencyContacts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EmergencyContacts {
    Table,
    Id,
    Name,
    Phone,
    Email,
    Relationship,
    IsPrimary,
    CreatedAt,
}
