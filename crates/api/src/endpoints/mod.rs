//! HTTP endpoints.

mod accounts;
mod admin;
mod pages;

use axum::Router;

use crate::middleware::AppState;

pub use pages::LOGIN_PATH;

/// Create the application router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(pages::router())
        .nest("/accounts", accounts::router())
        .nest("/admin", admin::router())
}
