pub mod auth;
pub mod categories;
pub mod comments;
pub mod error;
pub mod extract;
pub mod goals;
pub mod health;
pub mod listing;
pub mod middleware;
pub mod password;
pub mod profile;
pub mod responses;
pub mod validation;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::auth::AppState;
use crate::middleware::require_session;

/// Every HTTP route of the service. `/ping` sits outside the trace layer.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/profile",
            get(profile::get_profile)
                .patch(profile::patch_profile)
                .put(profile::put_profile)
                .delete(profile::logout),
        )
        .route(
            "/update-password",
            patch(profile::update_password).put(profile::update_password),
        )
        .route("/goals/goal_category/create", post(categories::create))
        .route("/goals/goal_category/list", get(categories::list))
        .route(
            "/goals/goal_category/{id}",
            get(categories::retrieve)
                .patch(categories::patch)
                .put(categories::put)
                .delete(categories::destroy),
        )
        .route("/goals/goal/create", post(goals::create))
        .route("/goals/goal/list", get(goals::list))
        .route(
            "/goals/goal/{id}",
            get(goals::retrieve)
                .patch(goals::patch)
                .put(goals::put)
                .delete(goals::destroy),
        )
        .route("/goals/goal_comment/create", post(comments::create))
        .route("/goals/goal_comment/list", get(comments::list))
        .route(
            "/goals/goal_comment/{id}",
            get(comments::retrieve)
                .patch(comments::patch)
                .put(comments::put)
                .delete(comments::destroy),
        )
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .route("/ping", get(health::ping))
        .with_state(state)
}
