//! Comment repository.

use std::sync::Arc;

use crate::entities::{Comment, comment, movie, user};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, sea_query::Expr,
};

/// Moderation listing filters for comments.
#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    /// Only comments with this approval state.
    pub approved: Option<bool>,
    /// Only comments on this movie.
    pub movie_id: Option<String>,
    /// Substring matched against the text, the author's username and the movie title.
    pub search: Option<String>,
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approved comments on a movie, newest first.
    pub async fn find_approved_by_movie(
        &self,
        movie_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::MovieId.eq(movie_id))
            .filter(comment::Column::Approved.eq(true))
            .order_by_desc(comment::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count comments on a movie, approved or not.
    pub async fn count_by_movie(&self, movie_id: &str) -> AppResult<u64> {
        Comment::find()
            .filter(comment::Column::MovieId.eq(movie_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments matching the moderation filters, newest first.
    pub async fn search(&self, filter: &CommentFilter) -> AppResult<Vec<comment::Model>> {
        let mut query = Comment::find();

        if let Some(approved) = filter.approved {
            query = query.filter(comment::Column::Approved.eq(approved));
        }

        if let Some(movie_id) = &filter.movie_id {
            query = query.filter(comment::Column::MovieId.eq(movie_id.as_str()));
        }

        if let Some(q) = filter.search.as_deref().filter(|q| !q.is_empty()) {
            query = query
                .join(JoinType::InnerJoin, comment::Relation::Author.def())
                .join(JoinType::InnerJoin, comment::Relation::Movie.def())
                .filter(
                    Condition::any()
                        .add(comment::Column::Text.contains(q))
                        .add(user::Column::Username.contains(q))
                        .add(movie::Column::Title.contains(q)),
                );
        }

        query
            .order_by_desc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the approval flag on exactly the given comments.
    ///
    /// Returns the number of rows changed.
    pub async fn set_approved(&self, ids: &[String], approved: bool) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Comment::update_many()
            .col_expr(comment::Column::Approved, Expr::value(approved))
            .filter(comment::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
