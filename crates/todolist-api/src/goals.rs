use axum::{
    Extension, Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use todolist_db::models::{CategoryRow, GoalFilter, GoalRow, NewGoal, OrderBy, SortKey};
use todolist_types::api::{GoalRequest, GoalResponse};
use todolist_types::{Priority, Status};

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::extract::JsonBody;
use crate::listing::{self, Pagination};
use crate::middleware::CurrentUser;
use crate::responses::goal_response;
use crate::validation;

const ORDERING_FIELDS: &[SortKey] = &[
    SortKey::Title,
    SortKey::Created,
    SortKey::Updated,
    SortKey::DueDate,
    SortKey::Priority,
    SortKey::Status,
];
const DEFAULT_ORDERING: &[OrderBy] = &[
    OrderBy { key: SortKey::Priority, descending: true },
    OrderBy { key: SortKey::DueDate, descending: false },
];

#[derive(Debug, Default, Deserialize)]
pub struct GoalListQuery {
    #[serde(rename = "category__in")]
    pub category_in: Option<String>,
    #[serde(rename = "status__in")]
    pub status_in: Option<String>,
    #[serde(rename = "priority__in")]
    pub priority_in: Option<String>,
    #[serde(rename = "due_date__gte")]
    pub due_date_gte: Option<String>,
    #[serde(rename = "due_date__lte")]
    pub due_date_lte: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<GoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();

    let title = validation::title(&mut errors, req.title, true);
    let category = match req.category {
        Some(id) => checked_category(&state, &current, &mut errors, id)?,
        None => {
            errors.add("category", validation::REQUIRED);
            None
        }
    };
    let due_date = match req.due_date {
        Some(raw) => validation::datetime(&mut errors, "due_date", &raw),
        None => {
            errors.add("due_date", validation::REQUIRED);
            None
        }
    };
    let status = match req.status {
        Some(raw) => validation::choice(&mut errors, "status", &raw),
        None => Some(Status::default()),
    };
    let priority = match req.priority {
        Some(raw) => validation::choice(&mut errors, "priority", &raw),
        None => Some(Priority::default()),
    };
    errors.into_result()?;

    let (Some(title), Some(category), Some(due_date), Some(status), Some(priority)) =
        (title, category, due_date, status, priority)
    else {
        return Err(anyhow::anyhow!("validated goal fields missing").into());
    };

    let description = req.description.flatten();
    let goal = state.db.create_goal(&NewGoal {
        user_id: current.id(),
        category_id: category.id,
        title: &title,
        description: description.as_deref(),
        status,
        priority,
        due_date,
    })?;

    info!("User {} created goal {} in category {}", current.id(), goal.id, category.id);
    Ok((StatusCode::CREATED, Json(goal_response(&goal))))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<GoalListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();

    let category_ids = listing::parse_list(
        &mut errors,
        "category__in",
        query.category_in.as_deref(),
        "Enter a number.",
        |s| s.parse::<i64>().ok(),
    );
    let statuses = listing::parse_list(
        &mut errors,
        "status__in",
        query.status_in.as_deref(),
        "Select a valid choice.",
        |s| s.parse::<Status>().ok(),
    );
    let priorities = listing::parse_list(
        &mut errors,
        "priority__in",
        query.priority_in.as_deref(),
        "Select a valid choice.",
        |s| s.parse::<Priority>().ok(),
    );
    let due_from = due_bound(&mut errors, "due_date__gte", query.due_date_gte.as_deref());
    let due_until = due_bound(&mut errors, "due_date__lte", query.due_date_lte.as_deref());
    errors.into_result()?;

    let pagination = Pagination::parse(query.limit.as_deref(), query.offset.as_deref());
    let filter = GoalFilter {
        user_id: current.id(),
        category_ids,
        statuses,
        priorities,
        due_from,
        due_until,
        search: listing::search_term(query.search),
        ordering: listing::parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS, DEFAULT_ORDERING),
        window: pagination.window(),
    };

    let (count, rows) = state.db.list_goals(&filter)?;
    let results = rows.iter().map(goal_response).collect();
    Ok(pagination.respond(&uri, count, results))
}

fn due_bound(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = validation::parse_datetime(raw);
    if parsed.is_none() {
        errors.add(field, "Enter a valid date/time.");
    }
    parsed
}

/// Any authenticated user may read a visible goal.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let goal = state.db.get_visible_goal(id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(goal_response(&goal)))
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<GoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, true)
}

pub async fn put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<GoalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, false)
}

fn update(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
    req: GoalRequest,
    partial: bool,
) -> Result<Json<GoalResponse>, ApiError> {
    let mut goal = owned_goal(state, current, id)?;
    let mut errors = FieldErrors::default();

    if let Some(title) = validation::title(&mut errors, req.title, !partial) {
        goal.title = title;
    }
    match req.category {
        Some(category_id) => {
            if let Some(category) = checked_category(state, current, &mut errors, category_id)? {
                goal.category_id = category.id;
            }
        }
        None if !partial => errors.add("category", validation::REQUIRED),
        None => {}
    }
    match req.due_date {
        Some(raw) => {
            if let Some(due_date) = validation::datetime(&mut errors, "due_date", &raw) {
                goal.due_date = due_date;
            }
        }
        None if !partial => errors.add("due_date", validation::REQUIRED),
        None => {}
    }
    if let Some(raw) = req.status {
        if let Some(status) = validation::choice(&mut errors, "status", &raw) {
            goal.status = status;
        }
    }
    if let Some(raw) = req.priority {
        if let Some(priority) = validation::choice(&mut errors, "priority", &raw) {
            goal.priority = priority;
        }
    }
    if let Some(description) = req.description {
        goal.description = description;
    }
    errors.into_result()?;

    let Some(goal) = state.db.update_goal(&goal)? else {
        warn!("Goal {} or category {} went away during update", id, goal.category_id);
        return Err(ApiError::NotFound);
    };
    Ok(Json(goal_response(&goal)))
}

/// Deleting a goal archives it.
pub async fn destroy(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    owned_goal(&state, &current, id)?;
    state.db.archive_goal(id)?;
    info!("User {} archived goal {}", current.id(), id);
    Ok(StatusCode::NO_CONTENT)
}

fn owned_goal(state: &AppState, current: &CurrentUser, id: i64) -> Result<GoalRow, ApiError> {
    let goal = state.db.get_visible_goal(id)?.ok_or(ApiError::NotFound)?;
    if goal.user_id != current.id() {
        warn!("User {} denied access to goal {}", current.id(), id);
        return Err(ApiError::PermissionDenied);
    }
    Ok(goal)
}

/// Resolve a `category` reference. Missing or deleted categories are a
/// field error; someone else's category aborts with 403.
fn checked_category(
    state: &AppState,
    current: &CurrentUser,
    errors: &mut FieldErrors,
    id: i64,
) -> Result<Option<CategoryRow>, ApiError> {
    let Some(category) = state.db.get_active_category(id)? else {
        errors.add("category", validation::missing_object(id));
        return Ok(None);
    };
    if category.owner.id != current.id() {
        warn!("User {} tried to use category {} of user {}", current.id(), id, category.owner.id);
        return Err(ApiError::PermissionDenied);
    }
    Ok(Some(category))
}
