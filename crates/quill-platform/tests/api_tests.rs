//! Platform API Integration Tests
//!
//! Drives the full router against an in-memory SQLite store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

use quill_platform::role::entity::{NewRole, ADMIN_ROLE};
use quill_platform::user::entity::NewUser;
use quill_platform::{
    build_app, create_tables, AppState, Argon2Config, AuthConfig, AuthService, PasswordPolicy,
    PasswordService,
};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    /// Empty store with the schema in place
    async fn empty() -> Self {
        let db = Database::connect(
            ConnectOptions::new("sqlite::memory:")
                .max_connections(1)
                .sqlx_logging(false)
                .to_owned(),
        )
        .await
        .unwrap();
        create_tables(&db).await.unwrap();

        let auth_service = AuthService::new(AuthConfig {
            secret_key: "integration-secret".to_string(),
            ..Default::default()
        });
        let password_service =
            PasswordService::new(Argon2Config::testing(), PasswordPolicy::default()).unwrap();

        let state = AppState::new(db, auth_service, password_service);
        let router = build_app(&state);
        Self { router, state }
    }

    /// Role `admin` (id 1) with user `joe`/`test` (id 1), and role `writer`
    /// (id 2) with user `ann`/`secret` (id 2)
    async fn seeded() -> Self {
        let app = Self::empty().await;

        let admin = app.add_role(ADMIN_ROLE).await;
        let writer = app.add_role("writer").await;
        app.add_user("joe", "test", admin).await;
        app.add_user("ann", "secret", writer).await;

        app
    }

    async fn add_role(&self, name: &str) -> i32 {
        self.state
            .role_repo
            .insert(NewRole { name: name.to_string() })
            .await
            .unwrap()
            .id
    }

    async fn add_user(&self, username: &str, password: &str, role_id: i32) -> i32 {
        let password_hash = self.state.password_service.hash_password(password).unwrap();
        self.state
            .user_repo
            .insert(NewUser {
                username: username.to_string(),
                password_hash,
                role_id,
            })
            .await
            .unwrap()
            .id
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/login",
                None,
                json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }
}

mod post_tests {
    use super::*;

    fn new_post(title: &str) -> Value {
        json!({"title": title, "body": "Lorem ipsum", "author_id": 1})
    }

    #[tokio::test]
    async fn test_create_without_created_assigns_current_time() {
        let app = TestApp::seeded().await;
        let before = chrono::Utc::now() - chrono::Duration::seconds(5);

        let (status, body) = app.post("/posts/", None, new_post("Hello")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": 1, "message": "Post created successfully!"}));

        let (status, post) = app.get("/posts/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post["title"], "Hello");
        assert_eq!(post["body"], "Lorem ipsum");
        assert_eq!(post["author_id"], 1);

        let created = chrono::DateTime::parse_from_rfc3339(post["created"].as_str().unwrap())
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert!(created >= before);
        assert!(created <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_create_with_explicit_created() {
        let app = TestApp::seeded().await;

        let mut post = new_post("Dated");
        post["created"] = json!("2024-01-15T10:00:00");
        let (status, _) = app.post("/posts/", None, post).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, post) = app.get("/posts/1", None).await;
        let created = chrono::DateTime::parse_from_rfc3339(post["created"].as_str().unwrap()).unwrap();
        assert_eq!(created.to_rfc3339(), "2024-01-15T10:00:00+00:00");
    }

    #[tokio::test]
    async fn test_create_missing_field_is_bad_request() {
        let app = TestApp::seeded().await;

        let (status, body) = app
            .post("/posts/", None, json!({"body": "no title", "author_id": 1}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn test_create_with_invalid_date_is_bad_request() {
        let app = TestApp::seeded().await;

        let mut post = new_post("Dated");
        post["created"] = json!("last tuesday");
        let (status, body) = app.post("/posts/", None, post).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = TestApp::seeded().await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/posts/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_author_is_constraint_violation() {
        let app = TestApp::seeded().await;

        let (status, body) = app
            .post("/posts/", None, json!({"title": "t", "body": "b", "author_id": 99}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");
    }

    #[tokio::test]
    async fn test_list_returns_every_created_post() {
        let app = TestApp::seeded().await;

        for i in 0..3 {
            let (status, _) = app.post("/posts/", None, new_post(&format!("Post {}", i))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = app.get("/posts/", None).await;
        assert_eq!(status, StatusCode::OK);
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0]["title"], "Post 0");
        assert_eq!(posts[2]["title"], "Post 2");

        // Same collection without the trailing slash
        let (status, body) = app.get("/posts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["posts"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_only_touches_supplied_fields() {
        let app = TestApp::seeded().await;
        app.post("/posts/", None, new_post("Before")).await;
        let (_, original) = app.get("/posts/1", None).await;

        let (status, body) = app.patch("/posts/1", None, json!({"title": "After"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Post updated successfully!"}));

        let (_, updated) = app.get("/posts/1", None).await;
        assert_eq!(updated["title"], "After");
        assert_eq!(updated["body"], original["body"]);
        assert_eq!(updated["created"], original["created"]);
        assert_eq!(updated["author_id"], original["author_id"]);
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let app = TestApp::seeded().await;

        let (status, body) = app.patch("/posts/42", None, json!({"title": "x"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_with_invalid_date_is_bad_request() {
        let app = TestApp::seeded().await;
        app.post("/posts/", None, new_post("Dated")).await;
        let (_, original) = app.get("/posts/1", None).await;

        let (status, body) = app
            .patch("/posts/1", None, json!({"created": "next tuesday"}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (_, post) = app.get("/posts/1", None).await;
        assert_eq!(post, original);
    }

    #[tokio::test]
    async fn test_update_with_unknown_author_is_conflict() {
        let app = TestApp::seeded().await;
        app.post("/posts/", None, new_post("Owned")).await;

        let (status, body) = app.patch("/posts/1", None, json!({"author_id": 99})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");

        let (_, post) = app.get("/posts/1", None).await;
        assert_eq!(post["author_id"], 1);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() {
        let app = TestApp::seeded().await;

        let (status, body) = app.get("/posts/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, body) = app.patch("/posts/abc", None, json!({"title": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, body) = app.delete("/roles/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let app = TestApp::seeded().await;
        app.post("/posts/", None, new_post("Doomed")).await;

        let (status, body) = app.delete("/posts/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = app.get("/posts/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.delete("/posts/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod role_tests {
    use super::*;

    #[tokio::test]
    async fn test_role_crud() {
        let app = TestApp::empty().await;

        let (status, body) = app.post("/roles/", None, json!({"name": "admin"})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": 1, "message": "Role created!"}));

        let (status, body) = app.get("/roles/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "name": "admin"}));

        let (status, body) = app.patch("/roles/1", None, json!({"name": "editor"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "name": "editor"}));

        let (_, body) = app.get("/roles", None).await;
        assert_eq!(body, json!({"roles": [{"id": 1, "name": "editor"}]}));

        let (status, _) = app.delete("/roles/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.get("/roles/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_role_name_is_conflict() {
        let app = TestApp::empty().await;

        app.post("/roles/", None, json!({"name": "admin"})).await;
        let (status, body) = app.post("/roles/", None, json!({"name": "admin"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");
    }

    #[tokio::test]
    async fn test_rename_to_existing_name_is_conflict() {
        let app = TestApp::seeded().await;

        let (status, body) = app.patch("/roles/2", None, json!({"name": "admin"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");

        let (_, role) = app.get("/roles/2", None).await;
        assert_eq!(role, json!({"id": 2, "name": "writer"}));
    }

    #[tokio::test]
    async fn test_missing_name_is_bad_request() {
        let app = TestApp::empty().await;

        let (status, body) = app.post("/roles/", None, json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_delete_role_in_use_is_conflict() {
        let app = TestApp::seeded().await;

        let (status, _) = app.delete("/roles/1", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app.get("/roles/1", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}

mod user_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_user_scenario() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app.get("/users/1", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 1, "username": "joe"}));
    }

    #[tokio::test]
    async fn test_create_user_requires_token() {
        let app = TestApp::seeded().await;

        let (status, body) = app
            .post("/users/", None, json!({"username": "bob", "password": "pass", "role_id": 2}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_create_user_requires_admin_role() {
        let app = TestApp::seeded().await;
        let token = app.login("ann", "secret").await;

        let (status, body) = app
            .post(
                "/users/",
                Some(&token),
                json!({"username": "bob", "password": "pass", "role_id": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");

        // Nothing was written
        assert_eq!(app.state.user_repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_creates_user() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app
            .post(
                "/users/",
                Some(&token),
                json!({"username": "bob", "password": "pass", "role_id": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"id": 3, "message": "User created!"}));

        // Stored hashed, and usable for login
        let bob = app.state.user_repo.get_by_id(3).await.unwrap();
        assert_ne!(bob.password, "pass");
        app.login("bob", "pass").await;
    }

    #[tokio::test]
    async fn test_create_user_with_unknown_role_is_bad_request() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app
            .post(
                "/users/",
                Some(&token),
                json!({"username": "bob", "password": "pass", "role_id": 9}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app
            .post(
                "/users/",
                Some(&token),
                json!({"username": "ann", "password": "pass", "role_id": 2}),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");
    }

    #[tokio::test]
    async fn test_list_users_is_gated() {
        let app = TestApp::seeded().await;

        let (status, _) = app.get("/users/", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let writer = app.login("ann", "secret").await;
        let (status, _) = app.get("/users/", Some(&writer)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = app.login("joe", "test").await;
        let (status, body) = app.get("/users/", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"users": [
                {"id": 1, "username": "joe", "role": {"id": 1, "name": "admin"}},
                {"id": 2, "username": "ann", "role": {"id": 2, "name": "writer"}}
            ]})
        );
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let app = TestApp::seeded().await;

        let (status, body) = app.get("/users/1", Some("not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "INVALID_TOKEN");

        let other_issuer = AuthService::new(AuthConfig {
            secret_key: "some-other-secret".to_string(),
            ..Default::default()
        });
        let joe = app.state.user_repo.get_by_id(1).await.unwrap();
        let forged = other_issuer.generate_access_token(&joe).unwrap();
        let (status, _) = app.get("/users/1", Some(&forged)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_user_overlay() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app
            .patch("/users/2", Some(&token), json!({"password": "changed"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": 2, "username": "ann"}));

        let ann = app.state.user_repo.get_by_id(2).await.unwrap();
        assert_eq!(ann.role_id, 2);
        app.login("ann", "changed").await;

        let (status, _) = app
            .post("/auth/login", None, json!({"username": "ann", "password": "secret"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rename_to_existing_username_is_conflict() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app
            .patch("/users/2", Some(&token), json!({"username": "joe"}))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONSTRAINT_VIOLATION");

        let ann = app.state.user_repo.get_by_id(2).await.unwrap();
        assert_eq!(ann.username, "ann");
    }

    #[tokio::test]
    async fn test_non_numeric_user_id_is_bad_request() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, body) = app.get("/users/abc", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let app = TestApp::seeded().await;
        let token = app.login("joe", "test").await;

        let (status, _) = app
            .patch("/users/77", Some(&token), json!({"username": "ghost"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleted_user_token_is_forbidden() {
        let app = TestApp::seeded().await;
        let admin = app.login("joe", "test").await;
        let ann = app.login("ann", "secret").await;

        let (status, body) = app.delete("/users/2", Some(&admin)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = app.get("/users/2", Some(&admin)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Still a validly signed token, but its subject is gone
        let (status, _) = app.get("/users/", Some(&ann)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_delete_user_with_posts_is_conflict() {
        let app = TestApp::seeded().await;
        let admin = app.login("joe", "test").await;
        app.post("/posts/", None, json!({"title": "t", "body": "b", "author_id": 2}))
            .await;

        let (status, _) = app.delete("/users/2", Some(&admin)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_returns_usable_token() {
        let app = TestApp::seeded().await;

        let token = app.login("joe", "test").await;
        assert_eq!(app.state.auth_service.decode_identity(&token).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bad_credentials_share_one_message() {
        let app = TestApp::seeded().await;

        let (status, wrong_password) = app
            .post("/auth/login", None, json!({"username": "joe", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password["error"], "INVALID_CREDENTIALS");

        let (status, unknown_user) = app
            .post("/auth/login", None, json!({"username": "nobody", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password, unknown_user);
    }

    #[tokio::test]
    async fn test_login_missing_password_is_bad_request() {
        let app = TestApp::seeded().await;

        let (status, _) = app.post("/auth/login", None, json!({"username": "joe"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_current_user() {
        let app = TestApp::seeded().await;
        let token = app.login("ann", "secret").await;

        let (status, body) = app.get("/auth/me", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"id": 2, "username": "ann", "role": {"id": 2, "name": "writer"}})
        );

        let (status, _) = app.get("/auth/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

mod service_tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::empty().await;

        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
    }

    #[tokio::test]
    async fn test_openapi_document() {
        let app = TestApp::empty().await;

        let (status, body) = app.get("/q/openapi", None).await;
        assert_eq!(status, StatusCode::OK);
        let paths = body["paths"].as_object().unwrap();
        assert!(paths.contains_key("/users/{id}"));
        assert!(paths.contains_key("/posts/{id}"));
        assert!(paths.contains_key("/auth/login"));
        assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
