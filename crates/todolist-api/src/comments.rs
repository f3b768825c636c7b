use axum::{
    Extension, Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use todolist_db::models::{CommentFilter, CommentRow, OrderBy, SortKey};
use todolist_types::api::{CommentRequest, CommentResponse};

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::extract::JsonBody;
use crate::listing::{self, Pagination};
use crate::middleware::CurrentUser;
use crate::responses::comment_response;
use crate::validation;

const ORDERING_FIELDS: &[SortKey] = &[SortKey::Created, SortKey::Updated];
const DEFAULT_ORDERING: &[OrderBy] = &[OrderBy { key: SortKey::Created, descending: true }];

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub goal: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();

    let text = validation::text(&mut errors, "text", req.text, true);
    let goal = match req.goal {
        Some(id) => match state.db.get_visible_goal(id)? {
            Some(goal) if goal.user_id != current.id() => {
                warn!("User {} tried to comment on goal {} of user {}", current.id(), id, goal.user_id);
                return Err(ApiError::PermissionDenied);
            }
            Some(goal) => Some(goal),
            None => {
                errors.add("goal", validation::missing_object(id));
                None
            }
        },
        None => {
            errors.add("goal", validation::REQUIRED);
            None
        }
    };
    errors.into_result()?;

    let (Some(text), Some(goal)) = (text, goal) else {
        return Err(anyhow::anyhow!("validated comment fields missing").into());
    };

    let comment = state.db.create_comment(goal.id, current.id(), &text)?;
    info!("User {} commented on goal {}", current.id(), goal.id);
    Ok((StatusCode::CREATED, Json(comment_response(&comment))))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<CommentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let goal_id = match query.goal.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| ApiError::field("goal", "Enter a number."))?,
        ),
        None => None,
    };

    let pagination = Pagination::parse(query.limit.as_deref(), query.offset.as_deref());
    let filter = CommentFilter {
        user_id: current.id(),
        goal_id,
        ordering: listing::parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS, DEFAULT_ORDERING),
        window: pagination.window(),
    };

    let (count, rows) = state.db.list_comments(&filter)?;
    let results = rows.iter().map(comment_response).collect();
    Ok(pagination.respond(&uri, count, results))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.db.get_visible_comment(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(comment_response(&comment)))
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, true)
}

pub async fn put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, false)
}

/// Only `text` is writable; a comment never moves to another goal.
fn update(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
    req: CommentRequest,
    partial: bool,
) -> Result<Json<CommentResponse>, ApiError> {
    let mut comment = authored_comment(state, current, id)?;

    let mut errors = FieldErrors::default();
    let text = validation::text(&mut errors, "text", req.text, !partial);
    errors.into_result()?;

    if let Some(text) = text {
        comment = state.db.update_comment_text(id, &text)?;
    }
    Ok(Json(comment_response(&comment)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authored_comment(&state, &current, id)?;
    state.db.delete_comment(id)?;
    info!("User {} deleted comment {}", current.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

fn authored_comment(state: &AppState, current: &CurrentUser, id: i64) -> Result<CommentRow, ApiError> {
    let comment = state.db.get_visible_comment(id)?.ok_or(ApiError::NotFound)?;
    if comment.author.id != current.id() {
        warn!("User {} denied access to comment {}", current.id(), id);
        return Err(ApiError::PermissionDenied);
    }
    Ok(comment)
}
