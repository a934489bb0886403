//! Create movie table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Movie::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Movie::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Movie::Synopsis).text().not_null())
                    .col(ColumnDef::new(Movie::ReleaseDate).date().not_null())
                    .col(ColumnDef::new(Movie::Director).string_len(100).not_null())
                    .col(ColumnDef::new(Movie::Actors).text().not_null())
                    .col(ColumnDef::new(Movie::Cover).string_len(512))
                    .col(ColumnDef::new(Movie::TrailerUrl).string_len(200))
                    .col(
                        ColumnDef::new(Movie::AverageRating)
                            .decimal_len(3, 1)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Movie::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Movie::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(
                        Expr::col(Movie::AverageRating)
                            .gte(0)
                            .and(Expr::col(Movie::AverageRating).lte(5)),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (release_date, title) for the default listing order
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_release_date_title")
                    .table(Movie::Table)
                    .col(Movie::ReleaseDate)
                    .col(Movie::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_director")
                    .table(Movie::Table)
                    .col(Movie::Director)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Movie::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Movie {
    Table,
    Id,
    Title,
    Synopsis,
    ReleaseDate,
    Director,
    Actors,
    Cover,
    TrailerUrl,
    AverageRating,
    CreatedAt,
    UpdatedAt,
}
