//! Create community_message table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommunityMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommunityMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommunityMessage::CommunityId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunityMessage::SenderId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommunityMessage::Text).text().not_null())
                    .col(
                        ColumnDef::new(CommunityMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_community_message_community_id")
                    .table(CommunityMessage::Table)
                    .col(CommunityMessage::CommunityId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommunityMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommunityMessage {
    Table,
    Id,
    CommunityId,
    SenderId,
    Text,
    CreatedAt,
}
