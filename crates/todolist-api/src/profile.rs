use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::info;

use todolist_db::queries::is_unique_violation;
use todolist_types::api::{ProfileResponse, UpdatePasswordRequest, UpdateProfileRequest};

use crate::auth::{self, AppState, USERNAME_TAKEN};
use crate::error::{ApiError, FieldErrors};
use crate::extract::JsonBody;
use crate::middleware::CurrentUser;
use crate::password::{self, UserAttributes};
use crate::responses::profile_response;
use crate::validation;

pub async fn get_profile(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(profile_response(&current.user))
}

pub async fn patch_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update_profile(&state, &current, req, true)
}

pub async fn put_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update_profile(&state, &current, req, false)
}

fn update_profile(
    state: &AppState,
    current: &CurrentUser,
    req: UpdateProfileRequest,
    partial: bool,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut errors = FieldErrors::default();
    let mut user = current.user.clone();

    if let Some(name) = validation::text(&mut errors, "username", req.username, !partial) {
        if validation::username(&mut errors, &name) && state.db.username_taken(&name, Some(user.id))? {
            errors.add("username", USERNAME_TAKEN);
        }
        user.username = name;
    }
    if req.first_name.is_some() {
        user.first_name = auth::optional_name(&mut errors, "first_name", req.first_name);
    }
    if req.last_name.is_some() {
        user.last_name = auth::optional_name(&mut errors, "last_name", req.last_name);
    }
    if req.email.is_some() {
        user.email = auth::optional_email(&mut errors, req.email);
    }
    errors.into_result()?;

    state.db.update_profile(&user).map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::field("username", USERNAME_TAKEN)
        } else {
            ApiError::Internal(e)
        }
    })?;

    info!("User {} updated profile", user.id);
    Ok(Json(profile_response(&user)))
}

/// Logout: end the current session and clear the cookie.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_session(&current.session_key)?;
    info!("User {} logged out", current.user.username);
    Ok((jar.remove(auth::removal_cookie()), StatusCode::NO_CONTENT))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = &current.user;
    let mut errors = FieldErrors::default();

    let old_password = validation::password(&mut errors, "old_password", req.old_password);
    let new_password = validation::password(&mut errors, "new_password", req.new_password);
    if let Some(pw) = &new_password {
        let attrs = UserAttributes {
            username: &user.username,
            first_name: &user.first_name,
            last_name: &user.last_name,
            email: &user.email,
        };
        for message in password::validate_password(pw, &attrs) {
            errors.add("new_password", message);
        }
    }
    errors.into_result()?;

    let (Some(old_password), Some(new_password)) = (old_password, new_password) else {
        return Err(anyhow::anyhow!("validated password fields missing").into());
    };
    if !password::verify_password(&old_password, &user.password) {
        return Err(ApiError::field("old_password", "field is incorrect"));
    }

    let hash = password::hash_password(&new_password)?;
    state.db.set_password(user.id, &hash)?;
    let dropped = state.db.delete_other_sessions(user.id, &current.session_key)?;

    info!("User {} changed password, {} other sessions ended", user.id, dropped);
    Ok(Json(json!({})))
}
