//! API integration tests.
//!
//! The router runs against a mock database; each test queues exactly the
//! rows its request should read.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{NaiveDate, Utc};
use maplit::btreemap;
use cinelog_api::{AppState, app};
use cinelog_common::LocalStorage;
use cinelog_core::{
    CategoryService, CommentService, ModerationService, MovieService, RatingService, UserService,
};
use cinelog_db::{
    entities::{category, comment, movie, user},
    repositories::{
        CategoryRepository, CommentRepository, MovieRepository, RatingRepository, UserRepository,
    },
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::Value;
use tower::ServiceExt;

const FORM: &str = "application/x-www-form-urlencoded";

fn create_test_user(is_moderator: bool) -> user::Model {
    user::Model {
        id: "u1".to_string(),
        username: "alice".to_string(),
        username_lower: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "hash".to_string(),
        token: Some("tok".to_string()),
        is_admin: false,
        is_moderator,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_movie() -> movie::Model {
    movie::Model {
        id: "m1".to_string(),
        title: "Arrival".to_string(),
        synopsis: "Linguist meets heptapods.".to_string(),
        release_date: NaiveDate::from_ymd_opt(2016, 11, 11).unwrap(),
        director: "Denis Villeneuve".to_string(),
        actors: "Amy Adams, Jeremy Renner".to_string(),
        cover: None,
        trailer_url: Some("https://www.youtube.com/watch?v=tFMo3UJ4B4g".to_string()),
        average_rating: Decimal::new(45, 1),
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn create_test_state(db: DatabaseConnection) -> AppState {
    let db = Arc::new(db);

    let user_repo = UserRepository::new(db.clone());
    let movie_repo = MovieRepository::new(db.clone());
    let category_repo = CategoryRepository::new(db.clone());
    let comment_repo = CommentRepository::new(db.clone());
    let rating_repo = RatingRepository::new(db);

    let storage = Arc::new(LocalStorage::new(
        PathBuf::from("./media"),
        "/media".to_string(),
    ));

    let comment_service =
        CommentService::new(comment_repo.clone(), movie_repo.clone(), user_repo.clone());

    AppState {
        user_service: UserService::new(user_repo),
        movie_service: MovieService::new(movie_repo, category_repo.clone(), storage),
        category_service: CategoryService::new(category_repo),
        moderation_service: ModerationService::new(comment_repo, comment_service.clone()),
        comment_service,
        rating_service: RatingService::new(rating_repo),
        secure_cookies: false,
    }
}

/// Router over a database that fails every query.
fn create_empty_router() -> Router {
    app(create_test_state(
        MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
    ))
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, FORM)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().unwrap().starts_with(&format!("{name}=")))
}

/// Router whose database holds only the test movie.
fn create_movie_router() -> Router {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_movie()]])
        .into_connection();
    app(create_test_state(db))
}

#[tokio::test]
async fn test_anonymous_comment_redirects_to_login() {
    let app = create_movie_router();

    let response = app
        .oneshot(form_post("/pelicula/m1/", "submit_comment=1&text=Great+movie"))
        .await
        .unwrap();

    // Any write beyond the movie lookup would have surfaced as a 500
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login_register/");
    assert!(sets_cookie(&response, "cinelog_flash"));
}

#[tokio::test]
async fn test_anonymous_rating_redirects_to_login() {
    let app = create_movie_router();

    let response = app
        .oneshot(form_post("/pelicula/m1/", "submit_rating=1&score=4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login_register/");
}

#[tokio::test]
async fn test_anonymous_inline_comment_redirects_to_login() {
    let app = create_empty_router();

    let response = app
        .oneshot(form_post("/", "submit_comment=1&movie_id=m1&text=Hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login_register/");
}

#[tokio::test]
async fn test_anonymous_post_to_unknown_movie_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<movie::Model>::new()])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(form_post("/pelicula/missing/", "submit_comment=1&text=Hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_without_email_logs_in() {
    let mut created = create_test_user(false);
    created.username = "bob".to_string();
    created.username_lower = "bob".to_string();
    created.email = String::new();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[btreemap! { "num_items" => sea_orm::Value::BigInt(Some(0)) }]])
        .append_query_results([[created]])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(form_post(
            "/accounts/login_register/",
            "register_submit=1&username=bob&email=&password=abc&password2=abc",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(sets_cookie(&response, "cinelog_session"));
}

#[tokio::test]
async fn test_registration_password_mismatch_reports_password2() {
    let app = create_empty_router();

    let response = app
        .oneshot(form_post(
            "/accounts/login_register/",
            "register_submit=1&username=bob&email=bob%40example.com&password=secret123&password2=secret999",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!sets_cookie(&response, "cinelog_session"));

    let body = json_body(response).await;
    assert_eq!(
        body["register_errors"]["password2"][0],
        "Passwords do not match."
    );
}

#[tokio::test]
async fn test_login_register_screen_renders() {
    let app = create_empty_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts/login_register/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["user"].is_null());
}

#[tokio::test]
async fn test_logout_requires_login() {
    let app = create_empty_router();

    let response = app.oneshot(form_post("/accounts/logout/", "")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_requires_login() {
    let app = create_empty_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/comments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_forbidden_for_regular_user() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_user(false)]])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/comments")
                .header(header::AUTHORIZATION, "Bearer tok")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_bulk_approve_reports_count() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_user(true)]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 2,
        }])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/comments/approve")
                .method("POST")
                .header(header::AUTHORIZATION, "Bearer tok")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"ids":["c1","c2"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["message"], "2 comments marked as approved.");
}

#[tokio::test]
async fn test_anonymous_detail_shows_login_hint() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_movie()]])
        .append_query_results([Vec::<category::Model>::new()])
        .append_query_results([Vec::<comment::Model>::new()])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/pelicula/m1/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["movie"]["title"], "Arrival");
    assert_eq!(
        body["movie"]["trailer_embed_url"],
        "https://www.youtube.com/embed/tFMo3UJ4B4g"
    );
    assert_eq!(body["movie"]["cast"][1], "Jeremy Renner");
    assert_eq!(body["can_comment"], false);
    assert!(body["my_rating"].is_null());
    assert_eq!(body["messages"][0]["level"], "info");
    assert_eq!(body["messages"][0]["message"], "Log in to leave a comment.");
}

#[tokio::test]
async fn test_unknown_movie_returns_404() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<movie::Model>::new()])
        .into_connection();
    let app = app(create_test_state(db));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/pelicula/missing/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_empty_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
