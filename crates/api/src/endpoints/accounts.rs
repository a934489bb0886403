//! Login, registration and logout.

use axum::{
    Form, Json, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use cinelog_common::{AppError, AppResult, field_errors};
use cinelog_core::{LoginInput, RegisterInput};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    flash::{self, FlashMessage, Level},
    middleware::AppState,
    session::{expired_session_cookie, session_cookie},
    views::{AccountsPage, UserView},
};

/// Either of the two forms on the combined screen.
#[derive(Debug, Default, Deserialize)]
pub struct AccountsForm {
    pub login_submit: Option<String>,
    pub register_submit: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

/// The login and registration screen.
async fn show(
    MaybeAuthUser(user): MaybeAuthUser,
    jar: CookieJar,
) -> (CookieJar, Json<AccountsPage>) {
    let (jar, messages) = flash::take(jar);
    let page = AccountsPage {
        user: user.as_ref().map(UserView::from),
        messages,
        ..AccountsPage::default()
    };
    (jar, Json(page))
}

async fn login(state: &AppState, jar: CookieJar, form: AccountsForm) -> AppResult<Response> {
    let input = LoginInput {
        username: form.username,
        password: form.password,
    };

    match state.user_service.authenticate(input).await {
        Ok(user) => {
            let Some(token) = user.token.clone() else {
                return Err(AppError::Internal("Session token missing".to_string()));
            };
            let jar = jar.add(session_cookie(token, state.secure_cookies));
            let jar = flash::push(jar, Level::Success, format!("Welcome back, {}.", user.username));
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::Unauthorized) => {
            let (jar, mut messages) = flash::take(jar);
            messages.push(FlashMessage::new(Level::Error, "Invalid username or password."));
            let page = AccountsPage {
                messages,
                ..AccountsPage::default()
            };
            Ok((jar, Json(page)).into_response())
        }
        Err(AppError::InvalidForm(errors)) => {
            let (jar, messages) = flash::take(jar);
            let page = AccountsPage {
                messages,
                login_errors: field_errors(&errors),
                ..AccountsPage::default()
            };
            Ok((jar, Json(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn register(state: &AppState, jar: CookieJar, form: AccountsForm) -> AppResult<Response> {
    let input = RegisterInput {
        username: form.username,
        email: form.email,
        password: form.password,
        password2: form.password2,
    };

    match state.user_service.register(input).await {
        Ok(user) => {
            let Some(token) = user.token.clone() else {
                return Err(AppError::Internal("Session token missing".to_string()));
            };
            let jar = jar.add(session_cookie(token, state.secure_cookies));
            let jar = flash::push(
                jar,
                Level::Success,
                format!("Welcome, {}. Your account has been created.", user.username),
            );
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(AppError::InvalidForm(errors)) => {
            let (jar, mut messages) = flash::take(jar);
            messages.push(FlashMessage::new(
                Level::Error,
                "Registration failed. Please correct the errors below.",
            ));
            let page = AccountsPage {
                messages,
                register_errors: field_errors(&errors),
                ..AccountsPage::default()
            };
            Ok((jar, Json(page)).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Dispatch on the submit button that was pressed.
async fn submit(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    jar: CookieJar,
    Form(form): Form<AccountsForm>,
) -> AppResult<Response> {
    if form.login_submit.is_some() {
        return login(&state, jar, form).await;
    }
    if form.register_submit.is_some() {
        return register(&state, jar, form).await;
    }
    Ok(show(MaybeAuthUser(user), jar).await.into_response())
}

/// End every session of the user.
async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    state.user_service.logout(user).await?;

    let jar = jar.remove(expired_session_cookie());
    let jar = flash::push(jar, Level::Info, "You have been logged out.");
    Ok((jar, Redirect::to("/")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login_register/", get(show).post(submit))
        .route("/logout/", post(logout))
}
