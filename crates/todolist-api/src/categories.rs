use axum::{
    Extension, Json,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use todolist_db::models::{CategoryFilter, CategoryRow, OrderBy, SortKey};
use todolist_types::api::{CategoryRequest, CategoryResponse};

use crate::auth::AppState;
use crate::error::{ApiError, FieldErrors};
use crate::extract::JsonBody;
use crate::listing::{self, Pagination};
use crate::middleware::CurrentUser;
use crate::responses::category_response;
use crate::validation;

const ORDERING_FIELDS: &[SortKey] = &[SortKey::Title, SortKey::Created, SortKey::Updated];
const DEFAULT_ORDERING: &[OrderBy] = &[OrderBy { key: SortKey::Title, descending: false }];

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::default();
    let title = validation::title(&mut errors, req.title, true);
    errors.into_result()?;
    let Some(title) = title else {
        return Err(anyhow::anyhow!("validated category title missing").into());
    };

    let category = state.db.create_category(current.id(), &title)?;
    info!("User {} created category {}", current.id(), category.id);
    Ok((StatusCode::CREATED, Json(category_response(&category))))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<CategoryListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pagination = Pagination::parse(query.limit.as_deref(), query.offset.as_deref());
    let filter = CategoryFilter {
        user_id: current.id(),
        search: listing::search_term(query.search),
        ordering: listing::parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS, DEFAULT_ORDERING),
        window: pagination.window(),
    };

    let (count, rows) = state.db.list_categories(&filter)?;
    let results = rows.iter().map(category_response).collect();
    Ok(pagination.respond(&uri, count, results))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let category = owned_category(&state, &current, id)?;
    Ok(Json(category_response(&category)))
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, true)
}

pub async fn put(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    update(&state, &current, id, req, false)
}

fn update(
    state: &AppState,
    current: &CurrentUser,
    id: i64,
    req: CategoryRequest,
    partial: bool,
) -> Result<Json<CategoryResponse>, ApiError> {
    let mut category = owned_category(state, current, id)?;

    let mut errors = FieldErrors::default();
    let title = validation::title(&mut errors, req.title, !partial);
    errors.into_result()?;

    if let Some(title) = title {
        category = state.db.update_category_title(id, &title)?;
    }
    Ok(Json(category_response(&category)))
}

/// Soft delete; every active goal in the category is archived with it.
pub async fn destroy(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    owned_category(&state, &current, id)?;
    let archived = state.db.soft_delete_category(id)?;
    info!("User {} deleted category {} ({} goals archived)", current.id(), id, archived);
    Ok(StatusCode::NO_CONTENT)
}

/// 404 for missing or soft-deleted categories, 403 for someone else's.
fn owned_category(state: &AppState, current: &CurrentUser, id: i64) -> Result<CategoryRow, ApiError> {
    let category = state.db.get_active_category(id)?.ok_or(ApiError::NotFound)?;
    if category.owner.id != current.id() {
        warn!("User {} denied access to category {}", current.id(), id);
        return Err(ApiError::PermissionDenied);
    }
    Ok(category)
}
