//! Quill Platform
//!
//! Blog backend core:
//! - Users, roles and posts stored through SeaORM
//! - Argon2id password hashing and HS256 bearer tokens
//! - Role-gated user management
//! - REST endpoints with an OpenAPI document
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - SeaORM entity and create/update inputs
//! - `repository` - Data access
//! - `api` - REST endpoints

// Aggregates
pub mod role;
pub mod user;
pub mod post;

// Authentication & authorization
pub mod auth;

// Shared infrastructure
pub mod shared;

// Router assembly
pub mod app;

pub use shared::error::{PlatformError, Result};

// Re-export main entity types for convenience
pub use role::entity::Model as Role;
pub use user::entity::Model as User;
pub use post::entity::Model as Post;

// Re-export repositories
pub use role::repository::RoleRepository;
pub use user::repository::UserRepository;
pub use post::repository::PostRepository;

// Re-export services
pub use auth::{AuthConfig, AuthService, Argon2Config, PasswordPolicy, PasswordService};
pub use shared::{AppState, AuthContext, AuthorizationService, create_tables};
pub use app::{api_router, build_app, build_router};
