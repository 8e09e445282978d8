//! Posts API

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::post::entity::{Model as Post, NewPost, PostChanges};
use crate::post::repository::PostRepository;
use crate::shared::api_common::{
    parse_datetime, require, CreatedResponse, JsonBody, MessageResponse, PathParam,
};
use crate::shared::error::{ErrorResponse, PlatformError};

/// Create post request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[schema(required = true)]
    pub title: Option<String>,

    #[schema(required = true)]
    pub body: Option<String>,

    #[schema(required = true)]
    pub author_id: Option<i32>,

    /// ISO-8601 timestamp; the current time when omitted
    pub created: Option<String>,
}

/// Update post request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub author_id: Option<i32>,
    pub created: Option<String>,
}

/// Post response
#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub author_id: i32,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            body: p.body,
            created: p.created,
            author_id: p.author_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
}

/// Posts service state
#[derive(Clone)]
pub struct PostsState {
    pub post_repo: Arc<PostRepository>,
}

/// Create a new post
#[utoipa::path(
    post,
    path = "",
    tag = "posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = CreatedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Unknown author", body = ErrorResponse)
    )
)]
pub async fn create_post(
    State(state): State<PostsState>,
    JsonBody(req): JsonBody<CreatePostRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), PlatformError> {
    let title = require(req.title, "title")?;
    let body = require(req.body, "body")?;
    let author_id = require(req.author_id, "author_id")?;
    let created = req
        .created
        .as_deref()
        .map(|value| parse_datetime("created", value))
        .transpose()?;

    let post = state
        .post_repo
        .insert(NewPost {
            title,
            body,
            author_id,
            created,
        })
        .await?;

    info!(post_id = post.id, author_id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse::new(post.id, "Post created successfully!")),
    ))
}

/// List posts
#[utoipa::path(
    get,
    path = "",
    tag = "posts",
    responses(
        (status = 200, description = "All posts ordered by id", body = PostListResponse)
    )
)]
pub async fn list_posts(
    State(state): State<PostsState>,
) -> Result<Json<PostListResponse>, PlatformError> {
    let posts = state.post_repo.list_all().await?;

    Ok(Json(PostListResponse {
        posts: posts.into_iter().map(PostResponse::from).collect(),
    }))
}

/// Get post by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "posts",
    params(
        ("id" = i32, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Post found", body = PostResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn get_post(
    State(state): State<PostsState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<PostResponse>, PlatformError> {
    let post = state.post_repo.get_by_id(id).await?;
    Ok(Json(post.into()))
}

/// Update a post
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "posts",
    params(
        ("id" = i32, Path, description = "Post ID")
    ),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Post updated", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse),
        (status = 409, description = "Unknown author", body = ErrorResponse)
    )
)]
pub async fn update_post(
    State(state): State<PostsState>,
    PathParam(id): PathParam<i32>,
    JsonBody(req): JsonBody<UpdatePostRequest>,
) -> Result<Json<MessageResponse>, PlatformError> {
    let post = state.post_repo.get_by_id(id).await?;

    let changes = PostChanges {
        title: req.title,
        body: req.body,
        author_id: req.author_id,
        created: req
            .created
            .as_deref()
            .map(|value| parse_datetime("created", value))
            .transpose()?,
    };

    let post = state.post_repo.update_fields(post, changes).await?;
    info!(post_id = post.id, "Post updated");

    Ok(Json(MessageResponse::new("Post updated successfully!")))
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "posts",
    params(
        ("id" = i32, Path, description = "Post ID")
    ),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    State(state): State<PostsState>,
    PathParam(id): PathParam<i32>,
) -> Result<StatusCode, PlatformError> {
    let post = state.post_repo.get_by_id(id).await?;
    state.post_repo.delete(post).await?;
    info!(post_id = id, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Create posts router
pub fn posts_router(state: PostsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_post, list_posts))
        .routes(routes!(get_post, update_post, delete_post))
        .with_state(state)
}
