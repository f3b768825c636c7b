use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use todolist_db::models::UserRow;

use crate::auth::{AppState, SESSION_COOKIE};
use crate::error::ApiError;

/// The authenticated user behind the request's session cookie.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserRow,
    pub session_key: String,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

/// Resolve the `sessionid` cookie to a live session and attach
/// [`CurrentUser`] to the request. Anonymous requests get a 403.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_key = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::NotAuthenticated)?;

    let user = state
        .db
        .get_session_user(&session_key, Utc::now())?
        .ok_or(ApiError::NotAuthenticated)?;

    req.extensions_mut().insert(CurrentUser { user, session_key });
    Ok(next.run(req).await)
}
