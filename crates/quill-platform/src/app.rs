//! Router assembly
//!
//! Builds the full HTTP surface from an [`AppState`]: resource routers,
//! auth endpoints, the admin gate on `/users`, and the OpenAPI document.

use axum::Router;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{Components, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_api::{auth_router, AuthState};
use crate::post::api::{posts_router, PostsState};
use crate::role::api::{roles_router, RolesState};
use crate::role::entity::ADMIN_ROLE;
use crate::shared::health_api::{health_router, HealthState};
use crate::shared::middleware::{require_role, AppState};
use crate::user::api::{users_router, UsersState};

/// All API routes with their OpenAPI paths
pub fn api_router(state: &AppState) -> OpenApiRouter {
    let posts_state = PostsState {
        post_repo: state.post_repo.clone(),
    };
    let roles_state = RolesState {
        role_repo: state.role_repo.clone(),
    };
    let users_state = UsersState {
        user_repo: state.user_repo.clone(),
        role_repo: state.role_repo.clone(),
        password_service: state.password_service.clone(),
    };
    let auth_state = AuthState {
        user_repo: state.user_repo.clone(),
        auth_service: state.auth_service.clone(),
        authz_service: state.authz_service.clone(),
        password_service: state.password_service.clone(),
    };
    let health_state = HealthState {
        db: state.db.clone(),
    };

    OpenApiRouter::new()
        .nest("/posts", posts_router(posts_state))
        .nest("/roles", roles_router(roles_state))
        .nest("/users", require_role(users_router(users_state), state, ADMIN_ROLE))
        .nest("/auth", auth_router(auth_state))
        .nest("/health", health_router(health_state))
}

/// Split the API router and finish the OpenAPI document
pub fn build_router(state: &AppState) -> (Router, OpenApi) {
    let (router, mut openapi) = api_router(state).split_for_parts();

    openapi.info.title = "Quill Blog API".to_string();
    openapi.info.version = env!("CARGO_PKG_VERSION").to_string();
    openapi.info.description = Some("Users, roles and posts with bearer token auth".to_string());

    openapi
        .components
        .get_or_insert_with(Components::new)
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

    (router, openapi)
}

/// The application router: API routes plus Swagger UI at `/swagger-ui`
/// (document served from `/q/openapi`).
///
/// API paths answer with or without a trailing slash (`/posts/` is `/posts`).
/// Swagger UI is outside the normalization; it redirects `/swagger-ui` to
/// `/swagger-ui/` on its own.
pub fn build_app(state: &AppState) -> Router {
    let (router, openapi) = build_router(state);
    let api = NormalizePathLayer::trim_trailing_slash().layer(router);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .fallback_service(api)
}
