//! Comment submission and listing.

use std::collections::HashMap;

use chrono::Utc;
use cinelog_common::{AppError, AppResult, IdGenerator};
use cinelog_db::{
    entities::{comment, user},
    repositories::{CommentRepository, MovieRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// How many comments the catalog listing shows per movie.
pub const RECENT_COMMENTS: u64 = 3;

/// A comment together with its author's username.
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: comment::Model,
    /// Username of the author.
    pub author: String,
}

/// Comment form.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitCommentInput {
    #[validate(
        custom(function = "not_blank"),
        length(max = 5000, message = "Comments are limited to 5000 characters.")
    )]
    pub text: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("This field is required.".into()));
    }
    Ok(())
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    movie_repo: MovieRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        movie_repo: MovieRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            movie_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment on a movie.
    ///
    /// Serves both the catalog listing and the movie page. Anonymous
    /// callers get [`AppError::Unauthorized`] before anything is read or
    /// written. New comments are approved.
    pub async fn submit(
        &self,
        author: Option<&user::Model>,
        movie_id: &str,
        input: SubmitCommentInput,
    ) -> AppResult<comment::Model> {
        let author = author.ok_or(AppError::Unauthorized)?;
        input.validate()?;

        let movie = self.movie_repo.get_by_id(movie_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            movie_id: Set(movie.id),
            author_id: Set(author.id.clone()),
            text: Set(input.text.trim().to_string()),
            created_at: Set(Utc::now().into()),
            approved: Set(true),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(
            comment_id = %comment.id,
            movie_id = %comment.movie_id,
            author_id = %comment.author_id,
            "Comment submitted"
        );
        Ok(comment)
    }

    /// Approved comments on a movie, newest first, optionally capped.
    pub async fn approved_for_movie(
        &self,
        movie_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<CommentWithAuthor>> {
        let comments = self
            .comment_repo
            .find_approved_by_movie(movie_id, limit)
            .await?;
        self.with_authors(comments).await
    }

    /// Attach author usernames to comments.
    pub async fn with_authors(
        &self,
        comments: Vec<comment::Model>,
    ) -> AppResult<Vec<CommentWithAuthor>> {
        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let names: HashMap<String, String> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = names.get(&comment.author_id).cloned().unwrap_or_default();
                CommentWithAuthor { comment, author }
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cinelog_db::entities::movie;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hash".to_string(),
            token: Some("tok".to_string()),
            is_admin: false,
            is_moderator: false,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_movie(id: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            title: "Inception".to_string(),
            synopsis: "Dreams.".to_string(),
            release_date: NaiveDate::from_ymd_opt(2010, 7, 16).unwrap(),
            director: "Christopher Nolan".to_string(),
            actors: "Leonardo DiCaprio".to_string(),
            cover: None,
            trailer_url: None,
            average_rating: Decimal::ZERO,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_comment(id: &str, author_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            movie_id: "m1".to_string(),
            author_id: author_id.to_string(),
            text: "Loved it".to_string(),
            created_at: Utc::now().into(),
            approved: true,
        }
    }

    fn service(db: Arc<sea_orm::DatabaseConnection>) -> CommentService {
        CommentService::new(
            CommentRepository::new(db.clone()),
            MovieRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_submit_anonymous_touches_nothing() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let comments = service(db.clone());

        let result = comments
            .submit(
                None,
                "m1",
                SubmitCommentInput {
                    text: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
        drop(comments);
        assert!(Arc::try_unwrap(db).unwrap().into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn test_submit_blank_text_is_invalid() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let comments = service(db);
        let user = create_test_user("u1");

        let err = comments
            .submit(
                Some(&user),
                "m1",
                SubmitCommentInput {
                    text: "   ".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.field_errors()["text"], vec!["This field is required."]);
    }

    #[tokio::test]
    async fn test_submit_unknown_movie() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<movie::Model>::new()])
                .into_connection(),
        );
        let comments = service(db);
        let user = create_test_user("u1");

        let result = comments
            .submit(
                Some(&user),
                "missing",
                SubmitCommentInput {
                    text: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::MovieNotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_creates_approved_comment() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_comment("c1", "u1")]])
                .into_connection(),
        );
        let comments = service(db);
        let user = create_test_user("u1");

        let comment = comments
            .submit(
                Some(&user),
                "m1",
                SubmitCommentInput {
                    text: "Loved it".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(comment.approved);
        assert_eq!(comment.author_id, "u1");
        assert_eq!(comment.movie_id, "m1");
    }

    #[tokio::test]
    async fn test_with_authors_resolves_usernames() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1")]])
                .into_connection(),
        );
        let comments = service(db);

        let result = comments
            .with_authors(vec![
                create_test_comment("c1", "u1"),
                create_test_comment("c2", "u1"),
            ])
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.author == "alice"));
    }
}
