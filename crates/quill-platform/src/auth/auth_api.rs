//! Auth API Endpoints
//!
//! - POST /auth/login - exchange username and password for an access token
//! - GET /auth/me - the user behind the presented token

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::auth::auth_service::AuthService;
use crate::auth::password_service::PasswordService;
use crate::role::api::RoleResponse;
use crate::shared::api_common::{require, JsonBody};
use crate::shared::authorization_service::AuthorizationService;
use crate::shared::error::{ErrorResponse, PlatformError};
use crate::shared::middleware::{AuthLayer, Identity};
use crate::user::repository::UserRepository;

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(required = true)]
    pub username: Option<String>,

    #[schema(required = true)]
    pub password: Option<String>,
}

/// Login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub access_token: String,
}

/// Current user response
#[derive(Debug, Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: i32,
    pub username: String,
    pub role: RoleResponse,
}

/// Auth service state
#[derive(Clone)]
pub struct AuthState {
    pub user_repo: Arc<UserRepository>,
    pub auth_service: Arc<AuthService>,
    pub authz_service: Arc<AuthorizationService>,
    pub password_service: Arc<PasswordService>,
}

/// Login with username and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, PlatformError> {
    let username = require(req.username, "username")?;
    let password = require(req.password, "password")?;

    // Unknown user and wrong password are indistinguishable to the caller
    let Some(user) = state.user_repo.find_by_username(&username).await? else {
        state.password_service.verify_unknown_user(&password);
        info!(username = %username, "Login failed: unknown user");
        return Err(PlatformError::InvalidCredentials);
    };

    let password_valid = state
        .password_service
        .verify_password(&password, &user.password)
        .unwrap_or_else(|e| {
            warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
            false
        });

    if !password_valid {
        info!(user_id = user.id, "Login failed: wrong password");
        return Err(PlatformError::InvalidCredentials);
    }

    let access_token = state.auth_service.generate_access_token(&user)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse { access_token }))
}

/// Get current user info
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_current_user(
    State(state): State<AuthState>,
    identity: Identity,
) -> Result<Json<CurrentUserResponse>, PlatformError> {
    let context = state
        .authz_service
        .resolve(identity.user_id)
        .await?
        .ok_or_else(|| PlatformError::unauthorized("User no longer exists"))?;

    Ok(Json(CurrentUserResponse {
        id: context.user_id,
        username: context.username,
        role: RoleResponse {
            id: context.role_id,
            name: context.role_name,
        },
    }))
}

/// Create auth router. `/me` runs behind the authenticate stage.
pub fn auth_router(state: AuthState) -> OpenApiRouter {
    let current_user = OpenApiRouter::new()
        .routes(routes!(get_current_user))
        .route_layer(AuthLayer::new(state.auth_service.clone()));

    OpenApiRouter::new()
        .routes(routes!(login))
        .merge(current_user)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_allows_missing_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"username":"joe"}"#).unwrap();
        assert_eq!(req.username.as_deref(), Some("joe"));
        assert!(req.password.is_none());
    }

    #[test]
    fn test_login_response_serialization() {
        let json = serde_json::to_value(LoginResponse {
            access_token: "abc".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"access_token": "abc"}));
    }
}
