//! Error types shared across handlers.

pub mod app_error;

pub use app_error::{AppError, AppResult};
