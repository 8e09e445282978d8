//! Authorization Service
//!
//! Role checks for protected routes. The caller's role is always read from
//! the store (user first, then role by foreign key), never from the token.

use std::sync::Arc;
use tracing::debug;

use crate::role::repository::RoleRepository;
use crate::shared::error::{PlatformError, Result};
use crate::user::repository::UserRepository;

/// Authorization context for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i32,
    pub username: String,
    pub role_id: i32,
    pub role_name: String,
}

impl AuthContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.role_name == role
    }
}

pub struct AuthorizationService {
    user_repo: Arc<UserRepository>,
    role_repo: Arc<RoleRepository>,
}

impl AuthorizationService {
    pub fn new(user_repo: Arc<UserRepository>, role_repo: Arc<RoleRepository>) -> Self {
        Self { user_repo, role_repo }
    }

    /// Resolve a user id to its context. `None` when the user or its role is gone.
    pub async fn resolve(&self, user_id: i32) -> Result<Option<AuthContext>> {
        let Some(user) = self.user_repo.find_by_id(user_id).await? else {
            return Ok(None);
        };
        let Some(role) = self.role_repo.find_by_id(user.role_id).await? else {
            return Ok(None);
        };

        Ok(Some(AuthContext {
            user_id: user.id,
            username: user.username,
            role_id: role.id,
            role_name: role.name,
        }))
    }

    /// Require that `user_id` exists and holds the role named `role_name`.
    pub async fn requires_role(&self, user_id: i32, role_name: &str) -> Result<AuthContext> {
        let Some(context) = self.resolve(user_id).await? else {
            debug!(user_id, "Token subject has no user or role");
            return Err(PlatformError::forbidden(format!(
                "Role '{}' required",
                role_name
            )));
        };

        if !context.has_role(role_name) {
            debug!(user_id, role = %context.role_name, required = role_name, "Role check failed");
            return Err(PlatformError::forbidden(format!(
                "Role '{}' required",
                role_name
            )));
        }

        Ok(context)
    }
}
