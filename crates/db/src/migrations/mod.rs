//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20251001_000001_create_community_message_table;
mod m20251001_000002_create_community_member_table;
mod m20251001_000003_create_push_token_table;
mod m20251001_000004_create_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_community_message_table::Migration),
            Box::new(m20251001_000002_create_community_member_table::Migration),
            Box::new(m20251001_000003_create_push_token_table::Migration),
            Box::new(m20251001_000004_create_notification_table::Migration),
        ]
    }
}
