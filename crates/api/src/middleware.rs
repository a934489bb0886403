//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;
use cinelog_core::{
    CategoryService, CommentService, ModerationService, MovieService, RatingService, UserService,
};

use crate::session::SESSION_COOKIE;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub movie_service: MovieService,
    pub category_service: CategoryService,
    pub comment_service: CommentService,
    pub moderation_service: ModerationService,
    pub rating_service: RatingService,
    /// Send the session cookie with the `Secure` attribute.
    pub secure_cookies: bool,
}

/// Authentication middleware.
///
/// Resolves the session cookie or an `Authorization: Bearer` token to a user
/// and stores it in the request extensions. Unknown tokens are ignored.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(ToString::to_string);

    let token = bearer.or_else(|| {
        CookieJar::from_headers(req.headers())
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
    });

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_server_error() => {
                tracing::warn!(error = %e, "Session lookup failed");
            }
            Err(_) => {}
        }
    }

    next.run(req).await
}
