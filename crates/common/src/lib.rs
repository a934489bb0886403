//! Common utilities and shared types for cinelog.
//!
//! This crate provides foundational components used across all cinelog crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Storage**: File storage for uploaded movie covers
//!
//! # Example
//!
//! ```no_run
//! use cinelog_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     println!("{} -> {}", config.server.url, id_gen.generate());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult, field_errors};
pub use id::IdGenerator;
pub use storage::{COVER_DIR, LocalStorage, StorageBackend, UploadedFile, cover_storage_key};
