//! User Aggregate
//!
//! Blog accounts. Each user holds exactly one role.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{NewUser, UserChanges};
pub use repository::UserRepository;
pub use api::{users_router, UsersState};
