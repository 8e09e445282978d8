//! Post Aggregate

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{NewPost, PostChanges};
pub use repository::PostRepository;
pub use api::{posts_router, PostsState};
