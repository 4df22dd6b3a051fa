use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

/// Participants (registered by display name)
#[derive(DeriveIden)]
enum Participants {
    Table,
    Id,
    Name,
    CreatedAt,
}

/// Items (replaced wholesale on import)
#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    Name,
    Category,
    Quantity,
}

/// Votes: one row per (participant, item)
#[derive(DeriveIden)]
enum Votes {
    Table,
    ParticipantId,
    ItemId,
    Points,
}

/// Draw runs
#[derive(DeriveIden)]
enum Runs {
    Table,
    Id,
    Seed,
    CreatedAt,
}

/// One allocation row per drawn unit
#[derive(DeriveIden)]
enum Allocations {
    Table,
    Id,
    RunId,
    ItemId,
    ParticipantId,
    WeightSnapshot,
    CreatedAt,
}

/// Change counters polled by clients
#[derive(DeriveIden)]
enum Meta {
    Table,
    Key,
    Value,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Items::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Items::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Items::Category)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Items::Quantity)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::ParticipantId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Votes::ItemId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Votes::Points)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(Votes::ParticipantId)
                            .col(Votes::ItemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_participant")
                            .from(Votes::Table, Votes::ParticipantId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_item")
                            .from(Votes::Table, Votes::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Runs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Runs::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Runs::Seed).text().not_null())
                    .col(
                        ColumnDef::new(Runs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Allocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Allocations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Allocations::RunId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Allocations::ItemId)
                            .big_integer()
                            .not_null(),
                    )
                    // NULL = unclaimed unit
                    .col(ColumnDef::new(Allocations::ParticipantId).big_integer().null())
                    .col(ColumnDef::new(Allocations::WeightSnapshot).json().not_null())
                    .col(
                        ColumnDef::new(Allocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allocations_run")
                            .from(Allocations::Table, Allocations::RunId)
                            .to(Runs::Table, Runs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allocations_item")
                            .from(Allocations::Table, Allocations::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_allocations_participant")
                            .from(Allocations::Table, Allocations::ParticipantId)
                            .to(Participants::Table, Participants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_allocations_run")
                    .table(Allocations::Table)
                    .col(Allocations::RunId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Meta::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Meta::Key)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Meta::Value)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        let conn = manager.get_connection();
        let insert_sql = r#"
INSERT OR IGNORE INTO meta (key, value)
VALUES
 ('votes_version', 0),
 ('items_version', 0),
 ('alloc_version', 0);
"#;
        conn.execute(Statement::from_string(
            manager.get_database_backend(),
            insert_sql.to_string(),
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // children first
        let drops = [
            Table::drop().table(Allocations::Table).if_exists().to_owned(),
            Table::drop().table(Runs::Table).if_exists().to_owned(),
            Table::drop().table(Votes::Table).if_exists().to_owned(),
            Table::drop().table(Items::Table).if_exists().to_owned(),
            Table::drop().table(Participants::Table).if_exists().to_owned(),
            Table::drop().table(Meta::Table).if_exists().to_owned(),
        ];
        for stmt in drops {
            manager.drop_table(stmt).await?;
        }
        Ok(())
    }
}
