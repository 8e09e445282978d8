//! Role Aggregate

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{NewRole, RoleChanges, ADMIN_ROLE};
pub use repository::RoleRepository;
pub use api::{roles_router, RolesState};
