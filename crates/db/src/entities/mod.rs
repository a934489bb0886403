//! Database entities.

pub mod category;
pub mod comment;
pub mod movie;
pub mod movie_category;
pub mod rating;
pub mod user;

pub use category::Entity as Category;
pub use comment::Entity as Comment;
pub use movie::Entity as Movie;
pub use movie_category::Entity as MovieCategory;
pub use rating::Entity as Rating;
pub use user::Entity as User;
