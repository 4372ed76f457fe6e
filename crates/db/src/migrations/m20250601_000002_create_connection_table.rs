//! Create connection table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connection::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connection::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connection::AppId).big_integer().not_null())
                    .col(ColumnDef::new(Connection::FromId).big_integer().not_null())
                    .col(ColumnDef::new(Connection::ToId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Connection::ConnectionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Connection::State).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Connection::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Connection::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connection::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connection_from")
                            .from(Connection::Table, Connection::FromId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connection_to")
                            .from(Connection::Table, Connection::ToId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one edge per (app, from, to, type)
        manager
            .create_index(
                Index::create()
                    .name("idx_connection_edge")
                    .table(Connection::Table)
                    .col(Connection::AppId)
                    .col(Connection::FromId)
                    .col(Connection::ToId)
                    .col(Connection::ConnectionType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, from_id) for outgoing edge scans
        manager
            .create_index(
                Index::create()
                    .name("idx_connection_from")
                    .table(Connection::Table)
                    .col(Connection::AppId)
                    .col(Connection::FromId)
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, to_id) for incoming edge scans
        manager
            .create_index(
                Index::create()
                    .name("idx_connection_to")
                    .table(Connection::Table)
                    .col(Connection::AppId)
                    .col(Connection::ToId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Connection::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Connection {
    Table,
    Id,
    AppId,
    FromId,
    ToId,
    ConnectionType,
    State,
    Enabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
