//! Rating repository.
//!
//! Writes that change a movie's rating set go through the connection-generic
//! helpers so they can share a transaction with the average recompute.

use std::sync::Arc;

use crate::entities::{Rating, rating};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, FromQueryResult, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, sea_query::Expr,
};

/// Sum and count of the scores of one movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromQueryResult)]
pub struct ScoreTotals {
    /// `NULL` when the movie has no ratings.
    pub total: Option<i64>,
    /// Number of ratings.
    pub count: i64,
}

/// Admin listing filters for ratings.
#[derive(Debug, Clone, Default)]
pub struct RatingFilter {
    /// Only ratings of this movie.
    pub movie_id: Option<String>,
    /// Only ratings with this score.
    pub score: Option<i32>,
}

/// Rating repository for database operations.
#[derive(Clone)]
pub struct RatingRepository {
    db: Arc<DatabaseConnection>,
}

impl RatingRepository {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction on the underlying connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the rating a user gave a movie.
    pub async fn find_by_movie_and_user(
        &self,
        movie_id: &str,
        user_id: &str,
    ) -> AppResult<Option<rating::Model>> {
        Self::find_by_movie_and_user_in(self.db.as_ref(), movie_id, user_id).await
    }

    /// Ratings matching the admin filters, newest first.
    pub async fn search(&self, filter: &RatingFilter) -> AppResult<Vec<rating::Model>> {
        let mut query = Rating::find();

        if let Some(movie_id) = &filter.movie_id {
            query = query.filter(rating::Column::MovieId.eq(movie_id.as_str()));
        }

        if let Some(score) = filter.score {
            query = query.filter(rating::Column::Score.eq(score));
        }

        query
            .order_by_desc(rating::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the rating a user gave a movie on the given connection.
    pub async fn find_by_movie_and_user_in<C: ConnectionTrait>(
        conn: &C,
        movie_id: &str,
        user_id: &str,
    ) -> AppResult<Option<rating::Model>> {
        Rating::find()
            .filter(rating::Column::MovieId.eq(movie_id))
            .filter(rating::Column::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a rating by ID on the given connection.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<rating::Model>> {
        Rating::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a rating on the given connection.
    pub async fn insert<C: ConnectionTrait>(
        conn: &C,
        model: rating::ActiveModel,
    ) -> AppResult<rating::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a rating on the given connection.
    pub async fn update<C: ConnectionTrait>(
        conn: &C,
        model: rating::ActiveModel,
    ) -> AppResult<rating::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a rating on the given connection.
    pub async fn remove<C: ConnectionTrait>(conn: &C, model: rating::Model) -> AppResult<()> {
        model
            .delete(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// `SUM(score)` and `COUNT(*)` over a movie's current ratings.
    pub async fn score_totals<C: ConnectionTrait>(
        conn: &C,
        movie_id: &str,
    ) -> AppResult<ScoreTotals> {
        let totals = Rating::find()
            .select_only()
            .column_as(Expr::col(rating::Column::Score).sum(), "total")
            .column_as(Expr::col(rating::Column::Id).count(), "count")
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_model::<ScoreTotals>()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(totals.unwrap_or(ScoreTotals {
            total: None,
            count: 0,
        }))
    }
}
