//! Create category and movie_category tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Category::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Category::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Category::Slug).string_len(100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_slug")
                    .table(Category::Table)
                    .col(Category::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieCategory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MovieCategory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MovieCategory::MovieId).string_len(32).not_null())
                    .col(ColumnDef::new(MovieCategory::CategoryId).string_len(32).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_category_movie")
                            .from(MovieCategory::Table, MovieCategory::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_category_category")
                            .from(MovieCategory::Table, MovieCategory::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (movie_id, category_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_category_movie_category")
                    .table(MovieCategory::Table)
                    .col(MovieCategory::MovieId)
                    .col(MovieCategory::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: category_id (for category browsing)
        manager
            .create_index(
                Index::create()
                    .name("idx_movie_category_category_id")
                    .table(MovieCategory::Table)
                    .col(MovieCategory::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MovieCategory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(Iden)]
enum MovieCategory {
    Table,
    Id,
    MovieId,
    CategoryId,
}

#[derive(Iden)]
enum Movie {
    Table,
    Id,
}
