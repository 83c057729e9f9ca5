use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use super::{list, open_session, read, settle_write, visit};
use crate::console::{ConfirmView, ListCommand, ListView, Page, SessionRegistry, Target};
use crate::guards::AdminGuard;
use crate::models::{
    ChartPeriod, DashboardCharts, DashboardStats, Membership, PlanInput, PlanStatus,
    StatusFilter, SubscriptionPlan, TrainerVerification, TrainingSession, User, UserStatus,
    VerificationStatus,
};
use crate::resources::{dashboard, sessions, subscriptions, users, verifications};
use crate::utils::{ApiError, ApiResponse};

/// The row a status change is requested for, as the operator saw it.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct RejectInput {
    #[validate(length(min = 3, max = 500, message = "Give a reason of at least 3 characters"))]
    pub reason: String,
}

fn parse_filter<S: StatusFilter>(value: &str) -> Result<S, ApiError> {
    S::parse(value).ok_or_else(|| ApiError::bad_request(format!("Unknown value: {}", value)))
}

// ---------------------------------------------------------------- users

#[openapi(tag = "Users")]
#[get("/admin/users")]
pub async fn get_users(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<User>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Users).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.users, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Users")]
#[post("/admin/users/controls", data = "<command>")]
pub async fn control_users(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<User>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Users).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.users, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Users")]
#[get("/admin/users/status")]
pub async fn get_user_status_dialog(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Users).await?;
    let s = session.lock().await;
    Ok(Json(ApiResponse::success(s.admin.user_toggle.view())))
}

#[openapi(tag = "Users")]
#[post("/admin/users/<id>/status/request", data = "<request>")]
pub async fn request_user_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
    request: Json<StatusChangeRequest>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let current: UserStatus = parse_filter(&request.status)?;
    let session = visit(registry, &guard.0, Page::Users).await?;
    let mut s = session.lock().await;
    let prompt = s
        .admin
        .user_toggle
        .request(Target::new(id, request.name.clone(), current))?;
    Ok(Json(ApiResponse::success_with_message(
        prompt,
        s.admin.user_toggle.view(),
    )))
}

#[openapi(tag = "Users")]
#[post("/admin/users/status/cancel")]
pub async fn cancel_user_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Users).await?;
    let mut s = session.lock().await;
    if s.admin.user_toggle.cancel() {
        s.notifier.info("Status change cancelled");
    }
    Ok(Json(ApiResponse::success(s.admin.user_toggle.view())))
}

/// Runs the confirmed change. The session is released while the write is in
/// flight, so a second confirm sees `Mutating` and is refused.
#[openapi(tag = "Users")]
#[post("/admin/users/status/confirm")]
pub async fn confirm_user_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Users).await?;
    let (target, mutation, notifier) = {
        let mut s = session.lock().await;
        let target = s.admin.user_toggle.confirm()?;
        (target, s.admin.user_status.clone(), s.notifier.clone())
    };

    let result = users::update_status(&mutation, &target.id, target.next()).await;

    let mut s = session.lock().await;
    s.admin.user_toggle.settle(&result, &notifier);
    result?;
    Ok(Json(ApiResponse::success_with_message(
        target.success_message(),
        s.admin.user_toggle.view(),
    )))
}

// -------------------------------------------------------- verifications

#[openapi(tag = "Verification")]
#[get("/admin/verifications")]
pub async fn get_verifications(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<TrainerVerification>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verifications).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.verifications, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Verification")]
#[post("/admin/verifications/controls", data = "<command>")]
pub async fn control_verifications(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<TrainerVerification>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verifications).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.verifications, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Verification")]
#[get("/admin/verifications/<id>")]
pub async fn get_verification(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
) -> Result<Json<ApiResponse<TrainerVerification>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verifications).await?;
    let mut s = session.lock().await;
    let verification = read(s.open_verification(&id)).await?;
    Ok(Json(ApiResponse::success(verification)))
}

/// Checks the decision against the status of the open review, when loaded.
async fn check_transition(
    registry: &SessionRegistry,
    guard: &AdminGuard,
    id: &str,
    next: VerificationStatus,
) -> Result<(), ApiError> {
    let session = open_session(registry, &guard.0)?;
    let s = session.lock().await;
    let current = s
        .admin
        .open_verification
        .as_ref()
        .filter(|q| q.key() == &verifications::detail_key(id))
        .and_then(|q| q.state().data)
        .map(|v| v.status);

    match current {
        Some(current) if !current.can_transition_to(next) => Err(ApiError::bad_request(format!(
            "A {} request cannot be marked {}",
            current.as_str(),
            next.as_str()
        ))),
        _ => Ok(()),
    }
}

#[openapi(tag = "Verification")]
#[post("/admin/verifications/<id>/approve")]
pub async fn approve_verification(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    check_transition(registry, &guard, &id, VerificationStatus::Verified).await?;
    let session = visit(registry, &guard.0, Page::Verifications).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.admin.reviews.clone(), s.notifier.clone())
    };

    let result = verifications::approve(&mutation, &id).await;
    let data = settle_write(&notifier, result, "Verification approved successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Verification approved successfully".to_string(),
        data,
    )))
}

#[openapi(tag = "Verification")]
#[post("/admin/verifications/<id>/reject", data = "<input>")]
pub async fn reject_verification(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
    input: Json<RejectInput>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    input.validate()?;
    check_transition(registry, &guard, &id, VerificationStatus::Rejected).await?;
    let session = visit(registry, &guard.0, Page::Verifications).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.admin.reviews.clone(), s.notifier.clone())
    };

    let result = verifications::reject(&mutation, &id, &input.reason).await;
    let data = settle_write(&notifier, result, "Verification rejected")?;
    Ok(Json(ApiResponse::success_with_message(
        "Verification rejected".to_string(),
        data,
    )))
}

// ---------------------------------------------------------------- plans

#[openapi(tag = "Subscription Plans")]
#[get("/admin/plans")]
pub async fn get_plans(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<SubscriptionPlan>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.plans, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Subscription Plans")]
#[post("/admin/plans/controls", data = "<command>")]
pub async fn control_plans(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<SubscriptionPlan>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.plans, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Subscription Plans")]
#[post("/admin/plans", data = "<input>")]
pub async fn create_plan(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    input: Json<PlanInput>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    input.validate()?;
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.admin.plan_writes.clone(), s.notifier.clone())
    };

    let message = format!("Plan {} created successfully", input.plan_name);
    let result = subscriptions::create(&mutation, &input).await;
    let data = settle_write(&notifier, result, message.clone())?;
    Ok(Json(ApiResponse::success_with_message(message, data)))
}

#[openapi(tag = "Subscription Plans")]
#[patch("/admin/plans/<id>", data = "<input>")]
pub async fn update_plan(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
    input: Json<PlanInput>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    input.validate()?;
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.admin.plan_writes.clone(), s.notifier.clone())
    };

    let message = format!("Plan {} updated successfully", input.plan_name);
    let result = subscriptions::update(&mutation, &id, &input).await;
    let data = settle_write(&notifier, result, message.clone())?;
    Ok(Json(ApiResponse::success_with_message(message, data)))
}

#[openapi(tag = "Subscription Plans")]
#[get("/admin/plans/status")]
pub async fn get_plan_status_dialog(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let s = session.lock().await;
    Ok(Json(ApiResponse::success(s.admin.plan_toggle.view())))
}

#[openapi(tag = "Subscription Plans")]
#[post("/admin/plans/<id>/status/request", data = "<request>")]
pub async fn request_plan_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
    request: Json<StatusChangeRequest>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let current: PlanStatus = parse_filter(&request.status)?;
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let mut s = session.lock().await;
    let prompt = s
        .admin
        .plan_toggle
        .request(Target::new(id, request.name.clone(), current))?;
    Ok(Json(ApiResponse::success_with_message(
        prompt,
        s.admin.plan_toggle.view(),
    )))
}

#[openapi(tag = "Subscription Plans")]
#[post("/admin/plans/status/cancel")]
pub async fn cancel_plan_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let mut s = session.lock().await;
    if s.admin.plan_toggle.cancel() {
        s.notifier.info("Status change cancelled");
    }
    Ok(Json(ApiResponse::success(s.admin.plan_toggle.view())))
}

#[openapi(tag = "Subscription Plans")]
#[post("/admin/plans/status/confirm")]
pub async fn confirm_plan_status(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ConfirmView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Plans).await?;
    let (target, mutation, notifier) = {
        let mut s = session.lock().await;
        let target = s.admin.plan_toggle.confirm()?;
        (target, s.admin.plan_writes.clone(), s.notifier.clone())
    };

    let result = subscriptions::update_status(&mutation, &target.id, target.next()).await;

    let mut s = session.lock().await;
    s.admin.plan_toggle.settle(&result, &notifier);
    result?;
    Ok(Json(ApiResponse::success_with_message(
        target.success_message(),
        s.admin.plan_toggle.view(),
    )))
}

// ---------------------------------------------------- memberships/sessions

#[openapi(tag = "Memberships")]
#[get("/admin/memberships")]
pub async fn get_memberships(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<Membership>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Memberships).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.memberships, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Memberships")]
#[post("/admin/memberships/controls", data = "<command>")]
pub async fn control_memberships(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<Membership>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Memberships).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.memberships, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Sessions")]
#[get("/admin/sessions")]
pub async fn get_sessions(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<TrainingSession>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Sessions).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.sessions, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Sessions")]
#[post("/admin/sessions/controls", data = "<command>")]
pub async fn control_sessions(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<TrainingSession>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Sessions).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.admin.sessions, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Sessions")]
#[get("/admin/sessions/<id>")]
pub async fn get_session(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    id: String,
) -> Result<Json<ApiResponse<TrainingSession>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Sessions).await?;
    let client = session.lock().await.client.clone();
    let detail = sessions::mount_detail(&client, &id);
    let data = read(&detail).await?;
    Ok(Json(ApiResponse::success(data)))
}

// ------------------------------------------------------------ dashboard

#[openapi(tag = "Dashboard")]
#[get("/admin/dashboard/stats")]
pub async fn get_dashboard_stats(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Dashboard).await?;
    let client = session.lock().await.client.clone();
    let stats = dashboard::mount_stats(&client);
    let data = read(&stats).await?;
    Ok(Json(ApiResponse::success(data)))
}

#[openapi(tag = "Dashboard")]
#[get("/admin/dashboard/charts?<period>")]
pub async fn get_dashboard_charts(
    guard: AdminGuard,
    registry: &State<SessionRegistry>,
    period: Option<String>,
) -> Result<Json<ApiResponse<DashboardCharts>>, ApiError> {
    let period = match period.as_deref() {
        Some(value) => parse_filter::<ChartPeriod>(value)?,
        None => ChartPeriod::default(),
    };
    let session = visit(registry, &guard.0, Page::Dashboard).await?;
    let mut s = session.lock().await;
    let charts = read(s.charts(period)).await?;
    Ok(Json(ApiResponse::success(charts)))
}
