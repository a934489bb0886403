//! JSON view-models for the public pages.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::NaiveDate;
use cinelog_core::{CommentWithAuthor, MovieService, trailer_embed_url};
use cinelog_db::entities::{category, movie, user};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::flash::FlashMessage;

/// Field name to error messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The logged-in user as shown on pages.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub is_staff: bool,
}

impl From<&user::Model> for UserView {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            is_staff: user.is_staff(),
        }
    }
}

/// A movie as shown on pages and in the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct MovieView {
    pub id: String,
    pub title: String,
    pub synopsis: String,
    pub release_date: NaiveDate,
    pub director: String,
    pub actors: String,
    /// `actors` split on commas.
    pub cast: Vec<String>,
    pub cover_url: Option<String>,
    pub trailer_url: Option<String>,
    pub trailer_embed_url: Option<String>,
    pub average_rating: Decimal,
    pub categories: Vec<category::Model>,
}

impl MovieView {
    /// Build the view of a movie.
    #[must_use]
    pub fn new(
        movies: &MovieService,
        movie: movie::Model,
        categories: Vec<category::Model>,
    ) -> Self {
        let cast = movie
            .actors
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToString::to_string)
            .collect();

        Self {
            cover_url: movie.cover.as_deref().map(|key| movies.cover_url(key)),
            trailer_embed_url: movie
                .trailer_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .map(trailer_embed_url),
            id: movie.id,
            title: movie.title,
            synopsis: movie.synopsis,
            release_date: movie.release_date,
            director: movie.director,
            actors: movie.actors,
            cast,
            trailer_url: movie.trailer_url,
            average_rating: movie.average_rating,
            categories,
        }
    }
}

/// One movie of the catalog listing.
#[derive(Debug, Serialize)]
pub struct ListingEntry {
    pub movie: MovieView,
    /// Newest approved comments.
    pub recent_comments: Vec<CommentWithAuthor>,
}

/// The catalog listing, optionally narrowed to one category.
#[derive(Debug, Serialize)]
pub struct ListingPage {
    pub user: Option<UserView>,
    pub messages: Vec<FlashMessage>,
    pub category: Option<category::Model>,
    pub movies: Vec<ListingEntry>,
    /// Whether the inline comment form is offered.
    pub can_comment: bool,
}

/// A movie's page.
#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub user: Option<UserView>,
    pub messages: Vec<FlashMessage>,
    pub movie: MovieView,
    /// Approved comments, newest first.
    pub comments: Vec<CommentWithAuthor>,
    /// The viewer's own score, if they rated the movie.
    pub my_rating: Option<i32>,
    pub can_comment: bool,
    pub can_rate: bool,
    /// Errors of the submitted comment or rating form.
    pub errors: FieldErrors,
}

/// The combined login and registration screen.
#[derive(Debug, Default, Serialize)]
pub struct AccountsPage {
    pub user: Option<UserView>,
    pub messages: Vec<FlashMessage>,
    pub login_errors: FieldErrors,
    pub register_errors: FieldErrors,
}
