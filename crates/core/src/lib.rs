//! Core business logic for cinelog.

pub mod services;

pub use services::*;
