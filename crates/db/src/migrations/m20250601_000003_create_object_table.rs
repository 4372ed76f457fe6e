//! Create object table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Object::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Object::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Object::AppId).big_integer().not_null())
                    .col(ColumnDef::new(Object::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(Object::ObjectId).big_integer().null())
                    .col(
                        ColumnDef::new(Object::ObjectType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Object::Visibility)
                            .small_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Object::Owned)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Object::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Object::Attachments)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Object::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Object::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_object_owner")
                            .from(Object::Table, Object::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, owner_id, object_type) for per-owner post scans
        manager
            .create_index(
                Index::create()
                    .name("idx_object_owner_type")
                    .table(Object::Table)
                    .col(Object::AppId)
                    .col(Object::OwnerId)
                    .col(Object::ObjectType)
                    .to_owned(),
            )
            .await?;

        // Index: (app_id, object_id) for comment-by-post scans
        manager
            .create_index(
                Index::create()
                    .name("idx_object_parent")
                    .table(Object::Table)
                    .col(Object::AppId)
                    .col(Object::ObjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Object::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Object {
    Table,
    Id,
    AppId,
    OwnerId,
    ObjectId,
    ObjectType,
    Visibility,
    Owned,
    Deleted,
    Attachments,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
