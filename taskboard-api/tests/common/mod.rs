//! Common test utilities for integration tests
//!
//! Builds the full router over the in-memory store, so tests need neither
//! a database nor a network listener. Requests go through
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
use taskboard_shared::models::user::{CreateUser, User};
use taskboard_shared::store::{BoardStore, MemoryBoardStore};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// A user created directly in the store, with an access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Status and parsed JSON body (`Null` for empty bodies)
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub json: Value,
}

impl TestResponse {
    /// Parses `field` of the body as a UUID
    pub fn id(&self, field: &str) -> Uuid {
        self.json[field]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| panic!("missing uuid field {field} in {}", self.json))
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryBoardStore>,
    pub state: AppState,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryBoardStore::new());
        let state = AppState::new(store.clone(), Config::in_memory(TEST_SECRET));
        let app = build_router(state.clone());

        Self { store, state, app }
    }

    /// Creates a user without going through password hashing
    pub async fn user(&self, name: &str) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                email: format!("{}@example.com", name.to_lowercase()),
                display_name: name.to_string(),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();

        TestUser {
            token: access_token(user.id),
            user,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, json }
    }

    pub async fn get(&self, uri: &str, as_user: &TestUser) -> TestResponse {
        self.request(Method::GET, uri, Some(&as_user.token), None).await
    }

    pub async fn post(&self, uri: &str, as_user: &TestUser, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(&as_user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, as_user: &TestUser, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(&as_user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, as_user: &TestUser) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&as_user.token), None).await
    }

    /// Creates a board through the API and returns its id
    pub async fn board(&self, owner: &TestUser, title: &str) -> Uuid {
        let response = self
            .post("/v1/boards", owner, serde_json::json!({ "title": title }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);
        response.id("id")
    }

    pub async fn column(&self, board_id: Uuid, as_user: &TestUser, title: &str) -> Uuid {
        let response = self
            .post(
                &format!("/v1/boards/{board_id}/columns"),
                as_user,
                serde_json::json!({ "title": title }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);
        response.id("id")
    }

    pub async fn card(&self, board_id: Uuid, column_id: Uuid, as_user: &TestUser, title: &str) -> TestResponse {
        let response = self
            .post(
                &format!("/v1/boards/{board_id}/cards"),
                as_user,
                serde_json::json!({ "column_id": column_id, "title": title }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.json);
        response
    }

    pub async fn invite(&self, board_id: Uuid, owner: &TestUser, invitee: &TestUser, role: &str) -> TestResponse {
        self.post(
            &format!("/v1/boards/{board_id}/invite"),
            owner,
            serde_json::json!({ "email": invitee.user.email, "role": role }),
        )
        .await
    }
}

/// Signs an access token for `user_id` with the test secret
pub fn access_token(user_id: Uuid) -> String {
    create_token(&Claims::new(user_id, TokenType::Access), TEST_SECRET).unwrap()
}
