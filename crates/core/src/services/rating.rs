//! Ratings and the per-movie average.
//!
//! Every write that changes a movie's set of ratings runs in one transaction
//! with the average recompute. The movie row is locked first (`FOR UPDATE`),
//! so concurrent ratings of the same movie are applied one after another and
//! the stored average always matches the committed ratings.

use chrono::Utc;
use cinelog_common::{AppError, AppResult, IdGenerator};
use cinelog_db::{
    entities::{rating, user},
    repositories::{MovieRepository, RatingFilter, RatingRepository},
};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ConnectionTrait, DatabaseTransaction, Set};
use serde::Deserialize;
use validator::Validate;

/// Rating form.
#[derive(Debug, Deserialize, Validate)]
pub struct RateInput {
    #[validate(range(
        min = rating::MIN_SCORE,
        max = rating::MAX_SCORE,
        message = "Select a score from 1 to 5."
    ))]
    pub score: i32,
}

/// Mean of `count` scores summing to `total`, to one decimal place.
///
/// Halves round away from zero. No ratings gives 0.0.
#[must_use]
pub fn average_of(total: i64, count: i64) -> Decimal {
    let mut average = if count <= 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(total) / Decimal::from(count))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    };
    average.rescale(1);
    average
}

/// Rating service for business logic.
#[derive(Clone)]
pub struct RatingService {
    rating_repo: RatingRepository,
    id_gen: IdGenerator,
}

impl RatingService {
    /// Create a new rating service.
    #[must_use]
    pub const fn new(rating_repo: RatingRepository) -> Self {
        Self {
            rating_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// The rating a user gave a movie, if any.
    pub async fn find_for_user(
        &self,
        user: &user::Model,
        movie_id: &str,
    ) -> AppResult<Option<rating::Model>> {
        self.rating_repo
            .find_by_movie_and_user(movie_id, &user.id)
            .await
    }

    /// Ratings matching the admin filters, newest first.
    pub async fn list(&self, filter: &RatingFilter) -> AppResult<Vec<rating::Model>> {
        self.rating_repo.search(filter).await
    }

    /// Rate a movie, replacing the caller's previous score if there is one.
    pub async fn rate(
        &self,
        actor: Option<&user::Model>,
        movie_id: &str,
        input: RateInput,
    ) -> AppResult<rating::Model> {
        let user = actor.ok_or(AppError::Unauthorized)?;
        input.validate()?;

        let txn = self.rating_repo.begin().await?;
        lock_movie(&txn, movie_id).await?;

        let rating = match RatingRepository::find_by_movie_and_user_in(&txn, movie_id, &user.id)
            .await?
        {
            Some(existing) => {
                let mut active: rating::ActiveModel = existing.into();
                active.score = Set(input.score);
                RatingRepository::update(&txn, active).await?
            }
            None => {
                let model = rating::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    movie_id: Set(movie_id.to_string()),
                    user_id: Set(user.id.clone()),
                    score: Set(input.score),
                    created_at: Set(Utc::now().into()),
                };
                RatingRepository::insert(&txn, model).await?
            }
        };

        let average = recompute_in(&txn, movie_id).await?;
        commit(txn).await?;

        tracing::info!(
            movie_id = %movie_id,
            user_id = %user.id,
            score = rating.score,
            average = %average,
            "Rated movie"
        );
        Ok(rating)
    }

    /// Remove the caller's own rating of a movie.
    pub async fn delete(&self, actor: Option<&user::Model>, movie_id: &str) -> AppResult<Decimal> {
        let user = actor.ok_or(AppError::Unauthorized)?;

        let txn = self.rating_repo.begin().await?;
        lock_movie(&txn, movie_id).await?;

        let rating = RatingRepository::find_by_movie_and_user_in(&txn, movie_id, &user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rating not found".to_string()))?;
        RatingRepository::remove(&txn, rating).await?;

        let average = recompute_in(&txn, movie_id).await?;
        commit(txn).await?;

        tracing::info!(movie_id = %movie_id, user_id = %user.id, average = %average, "Removed rating");
        Ok(average)
    }

    /// Remove any rating (moderator action).
    pub async fn delete_by_id(&self, rating_id: &str) -> AppResult<Decimal> {
        let txn = self.rating_repo.begin().await?;

        let rating = RatingRepository::find_by_id_in(&txn, rating_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating not found: {rating_id}")))?;
        let movie_id = rating.movie_id.clone();

        lock_movie(&txn, &movie_id).await?;
        RatingRepository::remove(&txn, rating).await?;

        let average = recompute_in(&txn, &movie_id).await?;
        commit(txn).await?;

        tracing::info!(rating_id = %rating_id, movie_id = %movie_id, average = %average, "Deleted rating");
        Ok(average)
    }

    /// Recompute and store a movie's average from its current ratings.
    pub async fn recompute(&self, movie_id: &str) -> AppResult<Decimal> {
        let txn = self.rating_repo.begin().await?;
        lock_movie(&txn, movie_id).await?;
        let average = recompute_in(&txn, movie_id).await?;
        commit(txn).await?;
        Ok(average)
    }
}

async fn lock_movie<C: ConnectionTrait>(conn: &C, movie_id: &str) -> AppResult<()> {
    MovieRepository::lock_for_update(conn, movie_id)
        .await?
        .ok_or_else(|| AppError::MovieNotFound(movie_id.to_string()))?;
    Ok(())
}

async fn recompute_in<C: ConnectionTrait>(conn: &C, movie_id: &str) -> AppResult<Decimal> {
    let totals = RatingRepository::score_totals(conn, movie_id).await?;
    let average = average_of(totals.total.unwrap_or(0), totals.count);
    MovieRepository::set_average_rating(conn, movie_id, average).await?;
    Ok(average)
}

async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}
