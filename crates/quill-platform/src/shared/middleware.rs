//! API Middleware
//!
//! Protected routes run two stages before the handler:
//!
//! 1. **authenticate** ([`AuthLayer`]): a valid bearer token is required.
//!    The token's user id is stored in the request as an [`Identity`].
//!    Missing or invalid tokens are rejected with 401.
//! 2. **authorize** ([`RequireRoleLayer`]): the identity must resolve to a user
//!    holding the named role. The resulting [`AuthContext`] is stored for
//!    handlers. Anything else is rejected with 403.
//!
//! A rejected request never reaches the handler.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;
use utoipa_axum::router::OpenApiRouter;

use crate::auth::auth_service::{extract_bearer_token, AuthService};
use crate::auth::password_service::PasswordService;
use crate::post::repository::PostRepository;
use crate::role::repository::RoleRepository;
use crate::shared::authorization_service::{AuthContext, AuthorizationService};
use crate::shared::error::{PlatformError, Result};
use crate::user::repository::UserRepository;

/// Shared services, built once at startup and cloned into each router
#[derive(Clone)]
pub struct AppState {
    pub db: sea_orm::DatabaseConnection,
    pub role_repo: Arc<RoleRepository>,
    pub user_repo: Arc<UserRepository>,
    pub post_repo: Arc<PostRepository>,
    pub auth_service: Arc<AuthService>,
    pub authz_service: Arc<AuthorizationService>,
    pub password_service: Arc<PasswordService>,
}

impl AppState {
    pub fn new(
        db: sea_orm::DatabaseConnection,
        auth_service: AuthService,
        password_service: PasswordService,
    ) -> Self {
        let role_repo = Arc::new(RoleRepository::new(&db));
        let user_repo = Arc::new(UserRepository::new(&db));
        let post_repo = Arc::new(PostRepository::new(&db));
        let authz_service = Arc::new(AuthorizationService::new(user_repo.clone(), role_repo.clone()));

        Self {
            db,
            role_repo,
            user_repo,
            post_repo,
            auth_service: Arc::new(auth_service),
            authz_service,
            password_service: Arc::new(password_service),
        }
    }
}

/// Caller identity established by the authenticate stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
}

/// Authenticate stage: bearer token to [`Identity`]
pub fn authenticate(auth_service: &AuthService, headers: &HeaderMap) -> Result<Identity> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))?;

    let token = header
        .to_str()
        .ok()
        .and_then(extract_bearer_token)
        .ok_or_else(|| PlatformError::unauthorized("Authorization header must be 'Bearer <token>'"))?;

    let user_id = auth_service.decode_identity(token)?;
    Ok(Identity { user_id })
}

/// Authorize stage: [`Identity`] plus role name to [`AuthContext`]
pub async fn authorize(
    authz_service: &AuthorizationService,
    identity: Option<Identity>,
    role: &str,
) -> Result<AuthContext> {
    let identity =
        identity.ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))?;
    authz_service.requires_role(identity.user_id, role).await
}

/// Authenticated extractor. Available on routes behind [`RequireRoleLayer`].
pub struct Authenticated(pub AuthContext);

impl std::ops::Deref for Authenticated {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(Authenticated)
            .ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or_else(|| PlatformError::unauthorized("Missing authentication token"))
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Layer running the authenticate stage
#[derive(Clone)]
pub struct AuthLayer {
    auth_service: Arc<AuthService>,
}

impl AuthLayer {
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            auth_service: self.auth_service.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    auth_service: Arc<AuthService>,
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        match authenticate(&self.auth_service, req.headers()) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                let future = self.inner.call(req);
                Box::pin(future)
            }
            Err(err) => {
                debug!(path = %req.uri().path(), error = %err, "Authentication failed");
                Box::pin(async move { Ok(err.into_response()) })
            }
        }
    }
}

/// Layer running the authorize stage for one role
#[derive(Clone)]
pub struct RequireRoleLayer {
    authz_service: Arc<AuthorizationService>,
    role: &'static str,
}

impl RequireRoleLayer {
    pub fn new(authz_service: Arc<AuthorizationService>, role: &'static str) -> Self {
        Self { authz_service, role }
    }
}

impl<S> Layer<S> for RequireRoleLayer {
    type Service = RequireRoleMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireRoleMiddleware {
            inner,
            authz_service: self.authz_service.clone(),
            role: self.role,
        }
    }
}

#[derive(Clone)]
pub struct RequireRoleMiddleware<S> {
    inner: S,
    authz_service: Arc<AuthorizationService>,
    role: &'static str,
}

impl<S> Service<Request> for RequireRoleMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // The clone may not be ready; keep the one poll_ready was called on
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let authz_service = self.authz_service.clone();
        let role = self.role;

        Box::pin(async move {
            let identity = req.extensions().get::<Identity>().copied();
            match authorize(&authz_service, identity, role).await {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                    inner.call(req).await
                }
                Err(err) => {
                    debug!(path = %req.uri().path(), role, error = %err, "Authorization failed");
                    Ok(err.into_response())
                }
            }
        })
    }
}

/// Wrap every route of `router` in authenticate, then authorize for `role`
pub fn require_role<S>(router: OpenApiRouter<S>, state: &AppState, role: &'static str) -> OpenApiRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Layers added later run first
    router
        .route_layer(RequireRoleLayer::new(state.authz_service.clone(), role))
        .route_layer(AuthLayer::new(state.auth_service.clone()))
}
