//! Create event table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Event::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Event::AppId).big_integer().not_null())
                    .col(ColumnDef::new(Event::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Event::ObjectId).big_integer().null())
                    .col(ColumnDef::new(Event::TargetId).string_len(64).null())
                    .col(ColumnDef::new(Event::TargetType).string_len(64).null())
                    .col(ColumnDef::new(Event::EventType).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Event::Visibility)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Event::Owned)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Event::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Event::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_user")
                            .from(Event::Table, Event::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, user_id, created_at) for per-actor feed scans
        manager
            .create_index(
                Index::create()
                    .name("idx_event_user_created")
                    .table(Event::Table)
                    .col(Event::AppId)
                    .col(Event::UserId)
                    .col(Event::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, object_id, event_type) for like lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_event_object_type")
                    .table(Event::Table)
                    .col(Event::AppId)
                    .col(Event::ObjectId)
                    .col(Event::EventType)
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, target_id, target_type) for notification scans
        manager
            .create_index(
                Index::create()
                    .name("idx_event_target")
                    .table(Event::Table)
                    .col(Event::AppId)
                    .col(Event::TargetId)
                    .col(Event::TargetType)
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, visibility, created_at) for global feed scans
        manager
            .create_index(
                Index::create()
                    .name("idx_event_visibility_created")
                    .table(Event::Table)
                    .col(Event::AppId)
                    .col(Event::Visibility)
                    .col(Event::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    AppId,
    UserId,
    ObjectId,
    TargetId,
    TargetType,
    EventType,
    Visibility,
    Owned,
    Enabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
