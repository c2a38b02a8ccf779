//! Docsmith Core Library
//!
//! This crate provides the foundational utilities shared by every Docsmith crate:
//! - Error handling (`AppError`, `AppResult`, `ProviderFailure`)
//! - Logging infrastructure
//! - Configuration management
//! - Atomic file output

pub mod config;
pub mod error;
pub mod fs;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult, ProviderFailure};
