//! Admin API: catalog management and moderation.
//!
//! Every route requires a moderator or admin.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use cinelog_common::{AppError, AppResult};
use cinelog_core::{
    CommentWithAuthor, CreateCategoryInput, CreateMovieInput, UpdateMovieInput, approval_message,
};
use cinelog_db::{
    entities::{category, movie, rating},
    repositories::{CommentFilter, MovieFilter, RatingFilter},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::StaffUser,
    middleware::AppState,
    response::{ApiResponse, Created, ok},
    views::MovieView,
};

/// Movie listing query.
#[derive(Debug, Default, Deserialize)]
pub struct MovieQuery {
    pub search: Option<String>,
    pub director: Option<String>,
}

/// Comment listing query.
#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    pub approved: Option<bool>,
    pub movie_id: Option<String>,
    pub search: Option<String>,
}

/// Rating listing query.
#[derive(Debug, Default, Deserialize)]
pub struct RatingQuery {
    pub movie_id: Option<String>,
    pub score: Option<i32>,
}

/// Bulk moderation request.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<String>,
}

/// Outcome of a bulk moderation action.
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub count: u64,
    pub message: String,
}

/// A movie's freshly computed average.
#[derive(Debug, Serialize)]
pub struct AverageResponse {
    pub movie_id: String,
    pub average_rating: Decimal,
}

/// Result of removing a rating: the movie's new average.
#[derive(Debug, Serialize)]
pub struct DeletedRatingResponse {
    pub rating_id: String,
    pub average_rating: Decimal,
}

async fn movie_view(state: &AppState, movie: movie::Model) -> AppResult<MovieView> {
    let categories = state.movie_service.categories(&movie.id).await?;
    Ok(MovieView::new(&state.movie_service, movie, categories))
}

// === Movies ===

async fn list_movies(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Query(query): Query<MovieQuery>,
) -> AppResult<ApiResponse<Vec<MovieView>>> {
    let filter = MovieFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        director: query.director.filter(|s| !s.trim().is_empty()),
    };
    let movies = state.movie_service.search(&filter).await?;

    let mut views = Vec::with_capacity(movies.len());
    for movie in movies {
        views.push(movie_view(&state, movie).await?);
    }
    Ok(ApiResponse::ok(views))
}

async fn create_movie(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(input): Json<CreateMovieInput>,
) -> AppResult<Created<MovieView>> {
    let movie = state.movie_service.create(input).await?;
    tracing::info!(movie_id = %movie.id, by = %user.username, "Movie created via admin");
    Ok(ApiResponse::created(movie_view(&state, movie).await?))
}

async fn get_movie(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MovieView>> {
    let movie = state.movie_service.get(&id).await?;
    Ok(ApiResponse::ok(movie_view(&state, movie).await?))
}

async fn update_movie(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateMovieInput>,
) -> AppResult<ApiResponse<MovieView>> {
    let movie = state.movie_service.update(&id, input).await?;
    Ok(ApiResponse::ok(movie_view(&state, movie).await?))
}

async fn delete_movie(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.movie_service.delete(&id).await?;
    Ok(ok())
}

/// Replace a movie's cover from the `file` field of a multipart form.
async fn upload_cover(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<MovieView>> {
    let mut upload: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("cover").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .to_vec();
        upload = Some((file_name, content_type, data));
    }

    let (file_name, content_type, data) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    let movie = state
        .movie_service
        .upload_cover(&id, &file_name, &content_type, &data)
        .await?;
    Ok(ApiResponse::ok(movie_view(&state, movie).await?))
}

async fn recompute_average(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<AverageResponse>> {
    let average_rating = state.rating_service.recompute(&id).await?;
    Ok(ApiResponse::ok(AverageResponse {
        movie_id: id,
        average_rating,
    }))
}

// === Categories ===

async fn list_categories(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<category::Model>>> {
    Ok(ApiResponse::ok(state.category_service.list().await?))
}

async fn create_category(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<Created<category::Model>> {
    let category = state.category_service.create(input).await?;
    Ok(ApiResponse::created(category))
}

async fn delete_category(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.category_service.delete(&id).await?;
    Ok(ok())
}

// === Comments ===

async fn list_comments(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> AppResult<ApiResponse<Vec<CommentWithAuthor>>> {
    let filter = CommentFilter {
        approved: query.approved,
        movie_id: query.movie_id,
        search: query.search.filter(|s| !s.trim().is_empty()),
    };
    Ok(ApiResponse::ok(state.moderation_service.list(&filter).await?))
}

async fn approve_comments(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> AppResult<ApiResponse<BulkResponse>> {
    let count = state.moderation_service.approve(&req.ids).await?;
    tracing::info!(count, by = %user.username, "Approved comments");
    Ok(ApiResponse::ok(BulkResponse {
        count,
        message: approval_message(count, true),
    }))
}

async fn reject_comments(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<BulkRequest>,
) -> AppResult<ApiResponse<BulkResponse>> {
    let count = state.moderation_service.reject(&req.ids).await?;
    tracing::info!(count, by = %user.username, "Rejected comments");
    Ok(ApiResponse::ok(BulkResponse {
        count,
        message: approval_message(count, false),
    }))
}

// === Ratings ===

async fn list_ratings(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Query(query): Query<RatingQuery>,
) -> AppResult<ApiResponse<Vec<rating::Model>>> {
    let filter = RatingFilter {
        movie_id: query.movie_id,
        score: query.score,
    };
    Ok(ApiResponse::ok(state.rating_service.list(&filter).await?))
}

async fn delete_rating(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeletedRatingResponse>> {
    let average_rating = state.rating_service.delete_by_id(&id).await?;
    tracing::info!(rating_id = %id, by = %user.username, "Rating removed via admin");
    Ok(ApiResponse::ok(DeletedRatingResponse {
        rating_id: id,
        average_rating,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/{id}",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
        .route("/movies/{id}/cover", post(upload_cover))
        .route("/movies/{id}/recompute", post(recompute_average))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/{id}", delete(delete_category))
        .route("/comments", get(list_comments))
        .route("/comments/approve", post(approve_comments))
        .route("/comments/reject", post(reject_comments))
        .route("/ratings", get(list_ratings))
        .route("/ratings/{id}", delete(delete_rating))
}
