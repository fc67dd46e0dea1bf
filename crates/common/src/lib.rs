//! Foodgram Common Library
//!
//! Shared code for the Foodgram API including:
//! - Database models, schema bootstrap and repository
//! - Validation, payloads and response representations
//! - Filtering, pagination and permissions
//! - Shopping list aggregation
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod pagination;
pub mod permissions;
pub mod serializers;
pub mod shopping_list;
pub mod validators;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
