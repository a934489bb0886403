//! Movie repository.

use std::sync::Arc;

use crate::entities::{Category, Movie, MovieCategory, category, movie, movie_category};
use cinelog_common::{AppError, AppResult};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::Expr,
};

/// Admin listing filters for movies.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Substring matched against title, director and actors.
    pub search: Option<String>,
    /// Exact director name.
    pub director: Option<String>,
}

/// Movie repository for database operations.
#[derive(Clone)]
pub struct MovieRepository {
    db: Arc<DatabaseConnection>,
}

impl MovieRepository {
    /// Create a new movie repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a movie by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<movie::Model>> {
        Movie::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a movie by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<movie::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::MovieNotFound(id.to_string()))
    }

    /// All movies, newest release first, then by title.
    pub async fn find_all(&self) -> AppResult<Vec<movie::Model>> {
        Movie::find()
            .order_by_desc(movie::Column::ReleaseDate)
            .order_by_asc(movie::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Movies matching the admin filters, in listing order.
    pub async fn search(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>> {
        let mut query = Movie::find();

        if let Some(q) = filter.search.as_deref().filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(movie::Column::Title.contains(q))
                    .add(movie::Column::Director.contains(q))
                    .add(movie::Column::Actors.contains(q)),
            );
        }

        if let Some(director) = &filter.director {
            query = query.filter(movie::Column::Director.eq(director.as_str()));
        }

        query
            .order_by_desc(movie::Column::ReleaseDate)
            .order_by_asc(movie::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Movies in a category, in listing order.
    pub async fn find_by_category(&self, category_id: &str) -> AppResult<Vec<movie::Model>> {
        Movie::find()
            .inner_join(MovieCategory)
            .filter(movie_category::Column::CategoryId.eq(category_id))
            .order_by_desc(movie::Column::ReleaseDate)
            .order_by_asc(movie::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Categories a movie belongs to, by name.
    pub async fn find_categories(&self, movie_id: &str) -> AppResult<Vec<category::Model>> {
        Category::find()
            .inner_join(MovieCategory)
            .filter(movie_category::Column::MovieId.eq(movie_id))
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Start a transaction for a movie write and its category links.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the category set of a movie.
    pub async fn set_categories<C: ConnectionTrait>(
        conn: &C,
        movie_id: &str,
        links: Vec<movie_category::ActiveModel>,
    ) -> AppResult<()> {
        MovieCategory::delete_many()
            .filter(movie_category::Column::MovieId.eq(movie_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if links.is_empty() {
            return Ok(());
        }

        MovieCategory::insert_many(links)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Insert a new movie.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: movie::ActiveModel,
    ) -> AppResult<movie::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write the changed columns of a movie.
    pub async fn save<C: ConnectionTrait>(
        conn: &C,
        model: movie::ActiveModel,
    ) -> AppResult<movie::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a movie. Comments, ratings and category links cascade.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let movie = self.get_by_id(id).await?;
        movie
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Load a movie and hold a row lock on it until the surrounding
    /// transaction ends (`SELECT ... FOR UPDATE`).
    pub async fn lock_for_update<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<movie::Model>> {
        Movie::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a freshly computed average rating.
    pub async fn set_average_rating<C: ConnectionTrait>(
        conn: &C,
        id: &str,
        average: Decimal,
    ) -> AppResult<()> {
        Movie::update_many()
            .col_expr(movie::Column::AverageRating, Expr::value(average))
            .col_expr(
                movie::Column::UpdatedAt,
                Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
            )
            .filter(movie::Column::Id.eq(id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Set the cover image key of a movie.
    pub async fn set_cover(&self, id: &str, cover: Option<String>) -> AppResult<movie::Model> {
        let movie = self.get_by_id(id).await?;
        let mut active: movie::ActiveModel = movie.into();
        active.cover = Set(cover);
        active.updated_at = Set(Utc::now().into());
        Self::save(self.db.as_ref(), active).await
    }
}
