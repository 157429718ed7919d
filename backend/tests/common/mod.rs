//! Common test utilities for integration tests
//!
//! This module provides shared setup and teardown for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use innotaxi_backend::{
    auth::MemoryRevocationStore,
    config::AppConfig,
    repositories::{MemoryUserDirectory, UserRepository},
    routes,
    state::AppState,
};
use sqlx::PgPool;
use tower::ServiceExt;

/// Response parts the tests look at
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }

    /// `name=value` part of the Set-Cookie header
    pub fn cookie_pair(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub pool: Option<PgPool>,
}

impl TestApp {
    /// Application backed by the in-memory user directory and ledger
    pub fn in_memory() -> Self {
        Self::in_memory_with(test_config())
    }

    pub fn in_memory_with(config: AppConfig) -> Self {
        let state = AppState::new(
            Arc::new(MemoryUserDirectory::new()),
            Arc::new(MemoryRevocationStore::new()),
            config,
        );
        Self {
            app: routes::create_router(state),
            pool: None,
        }
    }

    /// Application backed by a real database
    pub async fn with_database() -> Self {
        let config = test_config();
        let pool = create_test_pool(&config.database.url).await;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("TRUNCATE users RESTART IDENTITY")
            .execute(&pool)
            .await
            .expect("Failed to clean users table");

        let state = AppState::new(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(MemoryRevocationStore::new()),
            config,
        );

        Self {
            app: routes::create_router(state),
            pool: Some(pool),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a request with a bearer token
    pub async fn with_bearer(&self, method: &str, path: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a GET request carrying a cookie
    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with JSON body
    pub async fn post(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Register a user and return the sign-in response
    pub async fn sign_up_and_in(&self, phone_number: &str, email: &str, password: &str) -> TestResponse {
        let sign_up = self
            .post(
                "/users/auth/sign-up",
                &serde_json::json!({
                    "name": "Ivan",
                    "phone_number": phone_number,
                    "email": email,
                    "password": password,
                })
                .to_string(),
            )
            .await;
        assert_eq!(sign_up.status, StatusCode::CREATED, "sign-up failed: {}", sign_up.body);

        self.post(
            "/users/auth/sign-in",
            &serde_json::json!({"phone_number": phone_number, "password": password}).to_string(),
        )
        .await
    }
}

/// Get test configuration
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();

    // Use test database URL from environment or default
    if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
        config.database.url = url;
    }
    config.auth.hs256_secret = "integration-test-secret-with-enough-length".to_string();
    config.auth.salt = "integration-test-salt".to_string();

    config
}

/// Create a test database pool
pub async fn create_test_pool(database_url: &str) -> PgPool {
    PgPool::connect(database_url)
        .await
        .expect("Failed to connect to test database")
}
