use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use super::open_session;
use crate::console::{Notification, SessionRegistry};
use crate::guards::Operator;
use crate::utils::{ApiError, ApiResponse};

/// Hands over and clears the operator's pending toasts.
#[openapi(tag = "Notifications")]
#[get("/notifications")]
pub async fn drain_notifications(
    operator: Operator,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let session = open_session(registry, &operator)?;
    let notifier = session.lock().await.notifier.clone();
    Ok(Json(ApiResponse::success(notifier.drain())))
}

/// The console was closed or navigated away from; stops all polling.
#[openapi(tag = "Notifications")]
#[post("/pages/leave")]
pub async fn leave_pages(
    operator: Operator,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let session = open_session(registry, &operator)?;
    session.lock().await.leave();
    Ok(Json(ApiResponse::success(())))
}
