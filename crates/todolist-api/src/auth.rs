use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use todolist_db::Database;
use todolist_db::models::{NewUser, UserRow};
use todolist_db::queries::is_unique_violation;
use todolist_types::api::{LoginRequest, SignupRequest};

use crate::error::{ApiError, FieldErrors};
use crate::extract::JsonBody;
use crate::password::{self, UserAttributes};
use crate::responses::profile_response;
use crate::validation;

pub const SESSION_COOKIE: &str = "sessionid";

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
}

impl AppStateInner {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            session_ttl: Duration::weeks(2),
            secure_cookies: false,
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();

    let username = validation::text(&mut errors, "username", req.username, true);
    if let Some(name) = &username {
        if validation::username(&mut errors, name) && state.db.username_taken(name, None)? {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    let first_name = optional_name(&mut errors, "first_name", req.first_name);
    let last_name = optional_name(&mut errors, "last_name", req.last_name);
    let email = optional_email(&mut errors, req.email);

    let password = validation::password(&mut errors, "password", req.password);
    let password_repeat = validation::password(&mut errors, "password_repeat", req.password_repeat);

    let attrs = UserAttributes {
        username: username.as_deref().unwrap_or_default(),
        first_name: &first_name,
        last_name: &last_name,
        email: &email,
    };
    for (field, value) in [("password", &password), ("password_repeat", &password_repeat)] {
        if let Some(pw) = value {
            for message in password::validate_password(pw, &attrs) {
                errors.add(field, message);
            }
        }
    }

    errors.into_result()?;

    let (Some(username), Some(password), Some(password_repeat)) = (username, password, password_repeat)
    else {
        return Err(anyhow::anyhow!("validated signup fields missing").into());
    };
    if password != password_repeat {
        return Err(ApiError::field("password_repeat", "Passwords must match"));
    }

    let password_hash = password::hash_password(&password)?;
    let user = state
        .db
        .create_user(&NewUser {
            username: &username,
            password_hash: &password_hash,
            first_name: &first_name,
            last_name: &last_name,
            email: &email,
        })
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::field("username", USERNAME_TAKEN)
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!("User {} signed up (id {})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(profile_response(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();
    let username = validation::text(&mut errors, "username", req.username, true);
    let password = validation::password(&mut errors, "password", req.password);
    errors.into_result()?;

    let (Some(username), Some(password)) = (username, password) else {
        return Err(anyhow::anyhow!("validated login fields missing").into());
    };

    // Unknown user and wrong password must look the same to the client.
    let user = state
        .db
        .get_user_by_username(&username)?
        .filter(|u| password::verify_password(&password, &u.password));
    let Some(user) = user else {
        warn!("Failed login attempt for {}", username);
        return Err(ApiError::AuthenticationFailed);
    };

    let cookie = start_session(&state, &user)?;
    info!("User {} logged in", user.username);

    Ok((jar.add(cookie), Json(profile_response(&user))))
}

/// Persist a new session for `user` and build the cookie carrying its key.
pub fn start_session(state: &AppStateInner, user: &UserRow) -> Result<Cookie<'static>, ApiError> {
    let key = new_session_key();
    state
        .db
        .create_session(&key, user.id, session_expiry(Utc::now(), state.session_ttl)?)?;

    Ok(Cookie::build((SESSION_COOKIE, key))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .build())
}

fn session_expiry(now: DateTime<Utc>, ttl: Duration) -> anyhow::Result<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Session lifetime {} overflows the clock", ttl))
}

/// Cookie that makes the client forget its session.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

fn new_session_key() -> String {
    let bytes: [u8; 32] = rand::random();
    B64.encode(bytes)
}

/// Optional name field: trimmed, may be blank, defaults to empty.
pub(crate) fn optional_name(errors: &mut FieldErrors, field: &str, value: Option<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    validation::max_len(errors, field, &value, validation::NAME_MAX_LEN);
    value
}

pub(crate) fn optional_email(errors: &mut FieldErrors, value: Option<String>) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if !value.is_empty() {
        validation::email(errors, &value);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_unique_and_url_safe() {
        let a = new_session_key();
        let b = new_session_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn session_expiry_overflow_is_an_error() {
        let now = Utc::now();
        assert_eq!(session_expiry(now, Duration::hours(1)).unwrap(), now + Duration::hours(1));
        assert!(session_expiry(now, Duration::MAX).is_err());
    }

    #[test]
    fn session_cookie_attributes() {
        let state = AppStateInner::new(Database::open_in_memory().unwrap());
        let user = state
            .db
            .create_user(&NewUser {
                username: "alice",
                password_hash: "hash",
                first_name: "",
                last_name: "",
                email: "",
            })
            .unwrap();

        let cookie = start_session(&state, &user).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));

        let resolved = state.db.get_session_user(cookie.value(), Utc::now()).unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));
    }
}
