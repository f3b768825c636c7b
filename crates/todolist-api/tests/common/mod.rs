//! Shared fixtures for the HTTP-level tests: an in-memory app, users with
//! known passwords, and a logged-in cookie without going through `/login`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use todolist_api::auth::{self, AppState, AppStateInner};
use todolist_api::password;
use todolist_db::Database;
use todolist_db::models::{CategoryRow, GoalRow, NewGoal, NewUser, UserRow};
use todolist_types::{Priority, Status};

pub const PASSWORD: &str = "Xq7!wplm-Rtz";

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        Self { state: Arc::new(AppStateInner::new(db)) }
    }

    pub fn router(&self) -> Router {
        todolist_api::router(self.state.clone())
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn create_user(&self, username: &str) -> UserRow {
        self.create_user_with(username, "", "", "")
    }

    pub fn create_user_with(&self, username: &str, first_name: &str, last_name: &str, email: &str) -> UserRow {
        let hash = password::hash_password(PASSWORD).unwrap();
        self.db()
            .create_user(&NewUser {
                username,
                password_hash: &hash,
                first_name,
                last_name,
                email,
            })
            .unwrap()
    }

    /// A `cookie` header value for a fresh session of `user`.
    pub fn force_login(&self, user: &UserRow) -> String {
        let cookie = auth::start_session(&self.state, user).unwrap();
        format!("{}={}", cookie.name(), cookie.value())
    }

    /// A session for `user` that has already expired.
    pub fn expired_login(&self, user: &UserRow) -> String {
        let key = format!("expired-{}", user.id);
        self.db()
            .create_session(&key, user.id, Utc::now() - Duration::minutes(1))
            .unwrap();
        format!("{}={}", auth::SESSION_COOKIE, key)
    }

    pub async fn send(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        self.router().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    /// Send a body verbatim, without re-encoding it as JSON.
    pub async fn send_raw(&self, method: &str, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.router()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Send and decode the JSON response. Empty bodies decode as `null`.
    pub async fn json(&self, method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, cookie, body).await;
        let status = response.status();
        (status, body_json(response).await)
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

impl TestApp {
    pub fn create_category(&self, owner: &UserRow, title: &str) -> CategoryRow {
        self.db().create_category(owner.id, title).unwrap()
    }

    pub fn create_deleted_category(&self, owner: &UserRow, title: &str) -> CategoryRow {
        let category = self.create_category(owner, title);
        self.db().soft_delete_category(category.id).unwrap();
        category
    }

    pub fn create_goal(&self, category: &CategoryRow, title: &str) -> GoalRow {
        self.create_goal_with(category, title, Status::ToDo, Priority::Medium, Utc::now())
    }

    pub fn create_goal_with(
        &self,
        category: &CategoryRow,
        title: &str,
        status: Status,
        priority: Priority,
        due_date: DateTime<Utc>,
    ) -> GoalRow {
        self.db()
            .create_goal(&NewGoal {
                user_id: category.owner.id,
                category_id: category.id,
                title,
                description: None,
                status,
                priority,
                due_date,
            })
            .unwrap()
    }
}
