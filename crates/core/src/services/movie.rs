//! Movie catalog service.

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDate, Utc};
use cinelog_common::{AppError, AppResult, IdGenerator, StorageBackend, cover_storage_key};
use cinelog_db::{
    entities::{category, movie, movie_category},
    repositories::{CategoryRepository, MovieFilter, MovieRepository},
};
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, Set};
use serde::Deserialize;
use validator::{Validate, ValidateUrl, ValidationError};

#[allow(clippy::unwrap_used)]
static YOUTUBE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/ ]{11})"#)
        .unwrap()
});

/// Turn a YouTube watch or short link into an embeddable player URL.
///
/// Anything that is not recognisably YouTube is returned unchanged, and an
/// empty input gives an empty string.
#[must_use]
pub fn trailer_embed_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    YOUTUBE_ID_RE.captures(url).map_or_else(
        || url.to_string(),
        |caps| format!("https://www.youtube.com/embed/{}", &caps[1]),
    )
}

/// Movie service for business logic.
#[derive(Clone)]
pub struct MovieService {
    movie_repo: MovieRepository,
    category_repo: CategoryRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

/// Input for creating a movie.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMovieInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub synopsis: String,

    pub release_date: NaiveDate,

    #[validate(length(min = 1, max = 100))]
    pub director: String,

    #[validate(length(min = 1))]
    pub actors: String,

    /// An empty string means no trailer.
    #[validate(custom(function = "validate_trailer_url"), length(max = 200))]
    pub trailer_url: Option<String>,

    #[serde(default)]
    pub category_ids: Vec<String>,
}

/// Input for updating a movie. The average rating is not editable.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMovieInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub synopsis: Option<String>,

    pub release_date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 100))]
    pub director: Option<String>,

    #[validate(length(min = 1))]
    pub actors: Option<String>,

    /// An empty string clears the trailer.
    #[validate(custom(function = "validate_trailer_url"), length(max = 200))]
    pub trailer_url: Option<String>,

    pub category_ids: Option<Vec<String>>,
}

fn validate_trailer_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_url() {
        return Ok(());
    }
    Err(ValidationError::new("url").with_message("Enter a valid URL.".into()))
}

impl MovieService {
    /// Create a new movie service.
    #[must_use]
    pub fn new(
        movie_repo: MovieRepository,
        category_repo: CategoryRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            movie_repo,
            category_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a movie by ID.
    pub async fn get(&self, id: &str) -> AppResult<movie::Model> {
        self.movie_repo.get_by_id(id).await
    }

    /// The whole catalog, newest release first.
    pub async fn list(&self) -> AppResult<Vec<movie::Model>> {
        self.movie_repo.find_all().await
    }

    /// Movies of the category with this slug.
    pub async fn list_by_category(
        &self,
        slug: &str,
    ) -> AppResult<(category::Model, Vec<movie::Model>)> {
        let category = self
            .category_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(slug.to_string()))?;

        let movies = self.movie_repo.find_by_category(&category.id).await?;
        Ok((category, movies))
    }

    /// Admin search over the catalog.
    pub async fn search(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>> {
        self.movie_repo.search(filter).await
    }

    /// Categories of a movie.
    pub async fn categories(&self, movie_id: &str) -> AppResult<Vec<category::Model>> {
        self.movie_repo.find_categories(movie_id).await
    }

    /// Public URL of a cover key.
    #[must_use]
    pub fn cover_url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }

    /// Create a movie. Its average rating starts at 0.0.
    pub async fn create(&self, input: CreateMovieInput) -> AppResult<movie::Model> {
        input.validate()?;
        self.check_categories(&input.category_ids).await?;

        let now = Utc::now();
        let model = movie::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            synopsis: Set(input.synopsis),
            release_date: Set(input.release_date),
            director: Set(input.director),
            actors: Set(input.actors),
            cover: Set(None),
            trailer_url: Set(input.trailer_url.filter(|u| !u.is_empty())),
            average_rating: Set(Decimal::ZERO),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self.movie_repo.begin().await?;
        let movie = MovieRepository::insert(&txn, model).await?;
        let links = self.category_links(&movie.id, &input.category_ids);
        MovieRepository::set_categories(&txn, &movie.id, links).await?;
        commit(txn).await?;

        tracing::info!(movie_id = %movie.id, title = %movie.title, "Created movie");
        Ok(movie)
    }

    /// Update a movie's editable fields.
    pub async fn update(&self, id: &str, input: UpdateMovieInput) -> AppResult<movie::Model> {
        input.validate()?;
        if let Some(category_ids) = &input.category_ids {
            self.check_categories(category_ids).await?;
        }

        let movie = self.movie_repo.get_by_id(id).await?;
        let mut active: movie::ActiveModel = movie.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(synopsis) = input.synopsis {
            active.synopsis = Set(synopsis);
        }
        if let Some(release_date) = input.release_date {
            active.release_date = Set(release_date);
        }
        if let Some(director) = input.director {
            active.director = Set(director);
        }
        if let Some(actors) = input.actors {
            active.actors = Set(actors);
        }
        if let Some(trailer_url) = input.trailer_url {
            active.trailer_url = Set(Some(trailer_url).filter(|u| !u.is_empty()));
        }
        active.updated_at = Set(Utc::now().into());

        let txn = self.movie_repo.begin().await?;
        let movie = MovieRepository::save(&txn, active).await?;
        if let Some(category_ids) = &input.category_ids {
            let links = self.category_links(&movie.id, category_ids);
            MovieRepository::set_categories(&txn, &movie.id, links).await?;
        }
        commit(txn).await?;

        Ok(movie)
    }

    /// Delete a movie along with its comments, ratings and cover file.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let movie = self.movie_repo.get_by_id(id).await?;
        self.movie_repo.delete(&movie.id).await?;

        if let Some(cover) = &movie.cover {
            if let Err(e) = self.storage.delete(cover).await {
                tracing::warn!(error = %e, key = %cover, "Failed to delete cover file");
            }
        }

        tracing::info!(movie_id = %id, "Deleted movie");
        Ok(())
    }

    /// Store a new cover image, replacing the old one.
    pub async fn upload_cover(
        &self,
        id: &str,
        original_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> AppResult<movie::Model> {
        if !content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "cover: unsupported content type {content_type}"
            )));
        }

        let movie = self.movie_repo.get_by_id(id).await?;
        let key = cover_storage_key(&movie.id, original_name);
        let uploaded = self.storage.upload(&key, data, content_type).await?;

        let previous = movie.cover.clone();
        let movie = self.movie_repo.set_cover(&movie.id, Some(uploaded.key)).await?;

        if let Some(old) = previous {
            if let Err(e) = self.storage.delete(&old).await {
                tracing::warn!(error = %e, key = %old, "Failed to delete previous cover");
            }
        }

        Ok(movie)
    }

    async fn check_categories(&self, ids: &[String]) -> AppResult<()> {
        let found = self.category_repo.find_by_ids(ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|c| &c.id == *id)) {
            return Err(AppError::CategoryNotFound(missing.clone()));
        }
        Ok(())
    }

    fn category_links(&self, movie_id: &str, ids: &[String]) -> Vec<movie_category::ActiveModel> {
        let mut unique: Vec<&String> = ids.iter().collect();
        unique.sort();
        unique.dedup();

        unique
            .into_iter()
            .map(|category_id| movie_category::ActiveModel {
                id: Set(self.id_gen.generate()),
                movie_id: Set(movie_id.to_string()),
                category_id: Set(category_id.clone()),
            })
            .collect()
    }
}

async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinelog_common::LocalStorage;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_movie(id: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            title: "Inception".to_string(),
            synopsis: "Dreams within dreams.".to_string(),
            release_date: NaiveDate::from_ymd_opt(2010, 7, 16).unwrap(),
            director: "Christopher Nolan".to_string(),
            actors: "Leonardo DiCaprio".to_string(),
            cover: None,
            trailer_url: Some("https://www.youtube.com/watch?v=YoHD9XEInc0".to_string()),
            average_rating: Decimal::ZERO,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> MovieService {
        let db = Arc::new(db.into_connection());
        MovieService::new(
            MovieRepository::new(db.clone()),
            CategoryRepository::new(db),
            Arc::new(LocalStorage::new(
                std::env::temp_dir().join("cinelog-movie-tests"),
                "/media".to_string(),
            )),
        )
    }

    #[test]
    fn test_trailer_embed_url_watch() {
        assert_eq!(
            trailer_embed_url("https://www.youtube.com/watch?v=YoHD9XEInc0"),
            "https://www.youtube.com/embed/YoHD9XEInc0"
        );
    }

    #[test]
    fn test_trailer_embed_url_short_link() {
        assert_eq!(
            trailer_embed_url("https://youtu.be/YoHD9XEInc0?t=10"),
            "https://www.youtube.com/embed/YoHD9XEInc0"
        );
    }

    #[test]
    fn test_trailer_embed_url_passthrough() {
        assert_eq!(
            trailer_embed_url("https://vimeo.com/12345"),
            "https://vimeo.com/12345"
        );
        assert_eq!(trailer_embed_url(""), "");
    }

    #[tokio::test]
    async fn test_list_by_unknown_category() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<category::Model>::new()]),
        );

        let result = service.list_by_category("nope").await;

        assert!(matches!(result, Err(AppError::CategoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_starts_with_zero_average() {
        let movie = create_test_movie("m1");

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[movie.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }]),
        );

        let created = service
            .create(CreateMovieInput {
                title: movie.title.clone(),
                synopsis: movie.synopsis.clone(),
                release_date: movie.release_date,
                director: movie.director.clone(),
                actors: movie.actors.clone(),
                trailer_url: movie.trailer_url.clone(),
                category_ids: vec![],
            })
            .await
            .unwrap();

        assert_eq!(created.average_rating, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_create_writes_movie_and_links_in_one_transaction() {
        let movie = create_test_movie("m1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[movie.clone()]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = MovieService::new(
            MovieRepository::new(db.clone()),
            CategoryRepository::new(db.clone()),
            Arc::new(LocalStorage::new(
                std::env::temp_dir().join("cinelog-movie-tests"),
                "/media".to_string(),
            )),
        );

        service
            .create(CreateMovieInput {
                title: movie.title.clone(),
                synopsis: movie.synopsis.clone(),
                release_date: movie.release_date,
                director: movie.director.clone(),
                actors: movie.actors.clone(),
                trailer_url: None,
                category_ids: vec![],
            })
            .await
            .unwrap();
        drop(service);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = format!("{log:?}");
        assert!(sql.contains("INSERT INTO \"movie\""));
        assert!(sql.contains("DELETE FROM \"movie_category\""));
        assert!(sql.contains("COMMIT"));
    }

    #[test]
    fn test_empty_trailer_url_is_accepted_on_create() {
        let input = CreateMovieInput {
            title: "Arrival".to_string(),
            synopsis: "Heptapods.".to_string(),
            release_date: NaiveDate::from_ymd_opt(2016, 11, 11).unwrap(),
            director: "Denis Villeneuve".to_string(),
            actors: "Amy Adams".to_string(),
            trailer_url: Some(String::new()),
            category_ids: vec![],
        };
        assert!(input.validate().is_ok());

        let input = CreateMovieInput {
            trailer_url: Some("not a url".to_string()),
            ..input
        };
        let errors = input.validate().unwrap_err();
        assert_eq!(
            cinelog_common::field_errors(&errors)["trailer_url"],
            vec!["Enter a valid URL."]
        );
    }

    #[test]
    fn test_update_trailer_url_rules_match_create() {
        let clear = UpdateMovieInput {
            trailer_url: Some(String::new()),
            ..UpdateMovieInput::default()
        };
        assert!(clear.validate().is_ok());

        let bad = UpdateMovieInput {
            trailer_url: Some("not a url".to_string()),
            ..UpdateMovieInput::default()
        };
        assert!(bad.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_long_title() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .create(CreateMovieInput {
                title: "x".repeat(201),
                synopsis: "s".to_string(),
                release_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                director: "d".to_string(),
                actors: "a".to_string(),
                trailer_url: None,
                category_ids: vec![],
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidForm(_))));
    }

    #[tokio::test]
    async fn test_upload_cover_rejects_non_image() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .upload_cover("m1", "notes.txt", "text/plain", b"hello")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
