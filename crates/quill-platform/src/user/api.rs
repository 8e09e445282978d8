//! Users API
//!
//! User management. Every route sits behind the admin role gate
//! (see [`users_router`]).

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::password_service::PasswordService;
use crate::role::api::RoleResponse;
use crate::role::repository::RoleRepository;
use crate::shared::api_common::{require, CreatedResponse, JsonBody, PathParam};
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::Authenticated;
use crate::user::entity::{Model as User, NewUser, UserChanges};
use crate::user::repository::UserRepository;

/// Create user request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(required = true)]
    pub username: Option<String>,

    /// Plaintext password, hashed before storage
    #[schema(required = true)]
    pub password: Option<String>,

    #[schema(required = true)]
    pub role_id: Option<i32>,
}

/// Update user request. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i32>,
}

/// User response
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
        }
    }
}

/// User with its role, as listed
#[derive(Debug, Serialize, ToSchema)]
pub struct UserWithRoleResponse {
    pub id: i32,
    pub username: String,
    pub role: Option<RoleResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserWithRoleResponse>,
}

/// Users service state
#[derive(Clone)]
pub struct UsersState {
    pub user_repo: Arc<UserRepository>,
    pub role_repo: Arc<RoleRepository>,
    pub password_service: Arc<PasswordService>,
}

impl UsersState {
    async fn ensure_role_exists(&self, role_id: i32) -> Result<(), PlatformError> {
        if self.role_repo.find_by_id(role_id).await?.is_none() {
            return Err(PlatformError::bad_request(format!("Role {} does not exist", role_id)));
        }
        Ok(())
    }
}

fn validate_username(username: String) -> Result<String, PlatformError> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(PlatformError::validation("Username must not be empty"));
    }
    Ok(username)
}

/// Create a new user
#[utoipa::path(
    post,
    path = "",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreatedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Duplicate username", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), PlatformError> {
    let username = validate_username(require(req.username, "username")?)?;
    let password = require(req.password, "password")?;
    let role_id = require(req.role_id, "role_id")?;

    state.ensure_role_exists(role_id).await?;
    let password_hash = state.password_service.hash_password(&password)?;

    let user = state
        .user_repo
        .insert(NewUser {
            username,
            password_hash,
            role_id,
        })
        .await?;

    info!(user_id = user.id, role_id, created_by = auth.user_id, "User created");

    Ok((StatusCode::CREATED, Json(CreatedResponse::new(user.id, "User created!"))))
}

/// List users with their roles
#[utoipa::path(
    get,
    path = "",
    tag = "users",
    responses(
        (status = 200, description = "All users ordered by id", body = UserListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<UsersState>,
) -> Result<Json<UserListResponse>, PlatformError> {
    let users = state.user_repo.list_all_with_role().await?;

    let users = users
        .into_iter()
        .map(|(user, role)| UserWithRoleResponse {
            id: user.id,
            username: user.username,
            role: role.map(RoleResponse::from),
        })
        .collect();

    Ok(Json(UserListResponse { users }))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<UsersState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state.user_repo.get_by_id(id).await?;
    Ok(Json(user.into()))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Duplicate username", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    PathParam(id): PathParam<i32>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, PlatformError> {
    let user = state.user_repo.get_by_id(id).await?;

    if let Some(role_id) = req.role_id {
        state.ensure_role_exists(role_id).await?;
    }

    let changes = UserChanges {
        username: req.username.map(validate_username).transpose()?,
        password_hash: req
            .password
            .map(|p| state.password_service.hash_password(&p))
            .transpose()?,
        role_id: req.role_id,
    };

    let user = state.user_repo.update_fields(user, changes).await?;
    info!(user_id = user.id, updated_by = auth.user_id, "User updated");

    Ok(Json(user.into()))
}

/// Delete a user. Fails while posts still reference it.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "User still has posts", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<UsersState>,
    auth: Authenticated,
    PathParam(id): PathParam<i32>,
) -> Result<StatusCode, PlatformError> {
    let user = state.user_repo.get_by_id(id).await?;
    state.user_repo.delete(user).await?;
    info!(user_id = id, deleted_by = auth.user_id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Create users router. Callers wrap it with the admin gate.
pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_user, list_users))
        .routes(routes!(get_user, update_user, delete_user))
        .with_state(state)
}
