//! Database repositories.

mod category;
mod comment;
mod movie;
mod rating;
mod user;

pub use category::CategoryRepository;
pub use comment::{CommentFilter, CommentRepository};
pub use movie::{MovieFilter, MovieRepository};
pub use rating::{RatingFilter, RatingRepository, ScoreTotals};
pub use user::UserRepository;
