//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod middleware;
pub mod api_common;
pub mod schema;

// APIs
pub mod health_api;

// Services
pub mod authorization_service;

pub use error::{PlatformError, Result};
pub use middleware::{AppState, Authenticated, Identity};
pub use health_api::health_router;
pub use authorization_service::{AuthContext, AuthorizationService};
pub use schema::create_tables;
