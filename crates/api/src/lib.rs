//! HTTP layer for cinelog.
//!
//! - **Endpoints**: catalog pages, account forms and the JSON admin API
//! - **Extractors**: current user, staff-only access
//! - **Middleware**: session and bearer-token authentication
//! - **Flash**: one-shot messages carried across redirects in a cookie
//!
//! Pages answer with JSON view-models; rendering them is left to a front end.

pub mod endpoints;
pub mod extractors;
pub mod flash;
pub mod middleware;
pub mod response;
pub mod session;
pub mod views;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::AppState;

/// Routes with authentication applied, ready to be served.
pub fn app(state: AppState) -> Router {
    router()
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .with_state(state)
}
