use axum::Json;

use todolist_types::api::HealthResponse;

pub async fn ping() -> Json<HealthResponse> {
    Json(HealthResponse { status: "Ok".into() })
}
