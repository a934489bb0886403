//! Catalog pages: listing, category listing and movie detail.

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use cinelog_common::{AppError, AppResult, field_errors};
use cinelog_core::{RECENT_COMMENTS, RateInput, SubmitCommentInput};
use cinelog_db::entities::{category, movie, user};
use serde::Deserialize;

use crate::{
    extractors::MaybeAuthUser,
    flash::{self, FlashMessage, Level},
    middleware::AppState,
    views::{DetailPage, FieldErrors, ListingEntry, ListingPage, MovieView, UserView},
};

/// Where anonymous users are sent when they try to post.
pub const LOGIN_PATH: &str = "/accounts/login_register/";

fn detail_path(movie_id: &str) -> String {
    format!("/pelicula/{movie_id}/")
}

/// Flash `message` and send the browser to the login screen.
pub(crate) fn login_required(jar: CookieJar, message: &str) -> Response {
    let jar = flash::push(jar, Level::Error, message);
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}

fn redirect_with(jar: CookieJar, level: Level, message: &str, to: &str) -> Response {
    let jar = flash::push(jar, level, message);
    (jar, Redirect::to(to)).into_response()
}

/// Inline comment form of the listing page.
#[derive(Debug, Deserialize)]
pub struct ListingForm {
    pub submit_comment: Option<String>,
    pub movie_id: Option<String>,
    pub text: Option<String>,
}

/// Comment and rating forms of the movie page.
#[derive(Debug, Deserialize)]
pub struct DetailForm {
    pub submit_comment: Option<String>,
    pub submit_rating: Option<String>,
    pub delete_rating: Option<String>,
    pub text: Option<String>,
    pub score: Option<String>,
}

async fn listing_page(
    state: &AppState,
    user: Option<&user::Model>,
    category: Option<category::Model>,
    movies: Vec<movie::Model>,
    messages: Vec<FlashMessage>,
) -> AppResult<ListingPage> {
    let mut entries = Vec::with_capacity(movies.len());
    for movie in movies {
        let categories = state.movie_service.categories(&movie.id).await?;
        let recent_comments = state
            .comment_service
            .approved_for_movie(&movie.id, Some(RECENT_COMMENTS))
            .await?;
        entries.push(ListingEntry {
            movie: MovieView::new(&state.movie_service, movie, categories),
            recent_comments,
        });
    }

    Ok(ListingPage {
        user: user.map(UserView::from),
        messages,
        category,
        movies: entries,
        can_comment: user.is_some(),
    })
}

async fn detail_page(
    state: &AppState,
    user: Option<&user::Model>,
    movie_id: &str,
    mut messages: Vec<FlashMessage>,
    errors: FieldErrors,
) -> AppResult<DetailPage> {
    let movie = state.movie_service.get(movie_id).await?;
    let categories = state.movie_service.categories(&movie.id).await?;
    let comments = state
        .comment_service
        .approved_for_movie(&movie.id, None)
        .await?;

    let my_rating = match user {
        Some(u) => state
            .rating_service
            .find_for_user(u, &movie.id)
            .await?
            .map(|r| r.score),
        None => {
            messages.push(FlashMessage::new(
                Level::Info,
                "Log in to leave a comment.",
            ));
            None
        }
    };

    Ok(DetailPage {
        user: user.map(UserView::from),
        messages,
        movie: MovieView::new(&state.movie_service, movie, categories),
        comments,
        my_rating,
        can_comment: user.is_some(),
        can_rate: user.is_some(),
        errors,
    })
}

/// The whole catalog, newest release first.
async fn listing(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ListingPage>)> {
    let (jar, messages) = flash::take(jar);
    let movies = state.movie_service.list().await?;
    let page = listing_page(&state, user.as_ref(), None, movies, messages).await?;
    Ok((jar, Json(page)))
}

/// Inline comment posted from the listing.
async fn listing_submit(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    jar: CookieJar,
    Form(form): Form<ListingForm>,
) -> AppResult<Response> {
    if form.submit_comment.is_none() {
        return Ok(listing(State(state), MaybeAuthUser(user), jar)
            .await?
            .into_response());
    }

    let movie_id = form.movie_id.unwrap_or_default();
    let input = SubmitCommentInput {
        text: form.text.unwrap_or_default(),
    };

    match state
        .comment_service
        .submit(user.as_ref(), &movie_id, input)
        .await
    {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Your comment has been added. It may require approval.",
            "/",
        )),
        Err(AppError::Unauthorized) => Ok(login_required(jar, "You must log in to comment.")),
        Err(AppError::InvalidForm(errors)) => {
            tracing::debug!(movie_id = %movie_id, ?errors, "Rejected inline comment");
            Ok(redirect_with(
                jar,
                Level::Error,
                "Could not add the comment. Please check the form.",
                "/",
            ))
        }
        Err(e) => Err(e),
    }
}

/// Movies of one category.
async fn category_listing(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ListingPage>)> {
    let (jar, messages) = flash::take(jar);
    let (category, movies) = state.movie_service.list_by_category(&slug).await?;
    let page = listing_page(&state, user.as_ref(), Some(category), movies, messages).await?;
    Ok((jar, Json(page)))
}

/// A movie with its approved comments.
async fn detail(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<String>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<DetailPage>)> {
    let (jar, messages) = flash::take(jar);
    let page = detail_page(&state, user.as_ref(), &id, messages, FieldErrors::new()).await?;
    Ok((jar, Json(page)))
}

/// Re-render the movie page with the errors of a rejected form.
async fn rerender_detail(
    state: &AppState,
    user: Option<&user::Model>,
    movie_id: &str,
    jar: CookieJar,
    message: &str,
    errors: FieldErrors,
) -> AppResult<Response> {
    let (jar, mut messages) = flash::take(jar);
    messages.push(FlashMessage::new(Level::Error, message));
    let page = detail_page(state, user, movie_id, messages, errors).await?;
    Ok((jar, Json(page)).into_response())
}

/// Comment, rating or rating removal posted from the movie page.
async fn detail_submit(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<DetailForm>,
) -> AppResult<Response> {
    // Unknown movies are a 404 whoever is asking
    state.movie_service.get(&id).await?;

    if form.submit_comment.is_some() {
        let input = SubmitCommentInput {
            text: form.text.unwrap_or_default(),
        };
        return match state.comment_service.submit(user.as_ref(), &id, input).await {
            Ok(_) => Ok(redirect_with(
                jar,
                Level::Success,
                "Your comment has been submitted for review.",
                &detail_path(&id),
            )),
            Err(AppError::Unauthorized) => Ok(login_required(jar, "You must log in to comment.")),
            Err(AppError::InvalidForm(errors)) => {
                rerender_detail(
                    &state,
                    user.as_ref(),
                    &id,
                    jar,
                    "Could not submit the comment. Please check the form.",
                    field_errors(&errors),
                )
                .await
            }
            Err(e) => Err(e),
        };
    }

    if form.submit_rating.is_some() {
        // Unparseable scores fail the range check
        let score = form
            .score
            .as_deref()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .unwrap_or(0);
        return match state
            .rating_service
            .rate(user.as_ref(), &id, RateInput { score })
            .await
        {
            Ok(_) => Ok(redirect_with(
                jar,
                Level::Success,
                "Your rating has been saved.",
                &detail_path(&id),
            )),
            Err(AppError::Unauthorized) => Ok(login_required(jar, "You must log in to rate.")),
            Err(AppError::InvalidForm(errors)) => {
                rerender_detail(
                    &state,
                    user.as_ref(),
                    &id,
                    jar,
                    "Could not save the rating. Please check the form.",
                    field_errors(&errors),
                )
                .await
            }
            Err(e) => Err(e),
        };
    }

    if form.delete_rating.is_some() {
        return match state.rating_service.delete(user.as_ref(), &id).await {
            Ok(_) => Ok(redirect_with(
                jar,
                Level::Success,
                "Your rating has been removed.",
                &detail_path(&id),
            )),
            Err(AppError::Unauthorized) => Ok(login_required(jar, "You must log in to rate.")),
            Err(AppError::NotFound(_)) => Ok(redirect_with(
                jar,
                Level::Error,
                "You have not rated this movie.",
                &detail_path(&id),
            )),
            Err(e) => Err(e),
        };
    }

    Ok(detail(State(state), MaybeAuthUser(user), Path(id), jar)
        .await?
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(listing).post(listing_submit))
        .route("/categoria/{slug}/", get(category_listing))
        .route("/pelicula/{id}/", get(detail).post(detail_submit))
}
