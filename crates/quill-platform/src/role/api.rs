//! Roles API
//!
//! Public CRUD endpoints for roles.

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

use crate::role::entity::{Model as Role, NewRole, RoleChanges};
use crate::role::repository::RoleRepository;
use crate::shared::api_common::{require, CreatedResponse, JsonBody, PathParam};
use crate::shared::error::{ErrorResponse, PlatformError};

/// Create role request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    #[schema(required = true)]
    pub name: Option<String>,
}

/// Update role request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
}

/// Role response
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
}

impl From<Role> for RoleResponse {
    fn from(r: Role) -> Self {
        Self { id: r.id, name: r.name }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
}

/// Roles service state
#[derive(Clone)]
pub struct RolesState {
    pub role_repo: Arc<RoleRepository>,
}

fn validate_name(name: String) -> Result<String, PlatformError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(PlatformError::validation("Role name must not be empty"));
    }
    Ok(name)
}

/// Create a new role
#[utoipa::path(
    post,
    path = "",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = CreatedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Duplicate role name", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<RolesState>,
    JsonBody(req): JsonBody<CreateRoleRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), PlatformError> {
    let name = validate_name(require(req.name, "name")?)?;

    let role = state.role_repo.insert(NewRole { name }).await?;
    info!(role_id = role.id, name = %role.name, "Role created");

    Ok((StatusCode::CREATED, Json(CreatedResponse::new(role.id, "Role created!"))))
}

/// List roles
#[utoipa::path(
    get,
    path = "",
    tag = "roles",
    responses(
        (status = 200, description = "All roles ordered by id", body = RoleListResponse)
    )
)]
pub async fn list_roles(
    State(state): State<RolesState>,
) -> Result<Json<RoleListResponse>, PlatformError> {
    let roles = state.role_repo.list_all().await?;

    Ok(Json(RoleListResponse {
        roles: roles.into_iter().map(RoleResponse::from).collect(),
    }))
}

/// Get role by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "roles",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Role found", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role(
    State(state): State<RolesState>,
    PathParam(id): PathParam<i32>,
) -> Result<Json<RoleResponse>, PlatformError> {
    let role = state.role_repo.get_by_id(id).await?;
    Ok(Json(role.into()))
}

/// Rename a role
#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "roles",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Duplicate role name", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<RolesState>,
    PathParam(id): PathParam<i32>,
    JsonBody(req): JsonBody<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, PlatformError> {
    let role = state.role_repo.get_by_id(id).await?;

    let changes = RoleChanges {
        name: req.name.map(validate_name).transpose()?,
    };
    let role = state.role_repo.update_fields(role, changes).await?;
    info!(role_id = role.id, "Role updated");

    Ok(Json(role.into()))
}

/// Delete a role. Fails while users still reference it.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "roles",
    params(
        ("id" = i32, Path, description = "Role ID")
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role still assigned to users", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    State(state): State<RolesState>,
    PathParam(id): PathParam<i32>,
) -> Result<StatusCode, PlatformError> {
    let role = state.role_repo.get_by_id(id).await?;
    state.role_repo.delete(role).await?;
    info!(role_id = id, "Role deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Create roles router
pub fn roles_router(state: RolesState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(create_role, list_roles))
        .routes(routes!(get_role, update_role, delete_role))
        .with_state(state)
}
