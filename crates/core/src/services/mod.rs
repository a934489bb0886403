//! Business logic services.

pub mod category;
pub mod comment;
pub mod moderation;
pub mod movie;
pub mod rating;
pub mod user;

pub use category::{CategoryService, CreateCategoryInput, slugify};
pub use comment::{CommentService, CommentWithAuthor, RECENT_COMMENTS, SubmitCommentInput};
pub use moderation::{ModerationService, approval_message};
pub use movie::{CreateMovieInput, MovieService, UpdateMovieInput, trailer_embed_url};
pub use rating::{RateInput, RatingService, average_of};
pub use user::{LoginInput, RegisterInput, UserService, hash_password, verify_password};
