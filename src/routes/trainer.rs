use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use serde_json::Value;
use validator::Validate;

use super::{list, read, settle_write, visit};
use crate::console::slots::{RecurringSlotForm, SingleSlotForm};
use crate::console::{DocumentsForm, ListCommand, ListView, Page, SessionRegistry, WizardView};
use crate::guards::TrainerGuard;
use crate::models::{
    ProfileUpdateInput, Slot, TrainerProfile, TrainerStats, TrainerVerification,
    TrainingSession, VerificationDetails, Wallet,
};
use crate::resources::trainer::ProfileChanges;
use crate::resources::{dashboard, slots, trainer};
use crate::utils::validation::UploadKind;
use crate::utils::{ApiError, ApiResponse};

// ---------------------------------------------------------------- slots

#[openapi(tag = "Slots")]
#[get("/trainer/slots")]
pub async fn get_slots(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<Slot>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.trainer.slots, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Slots")]
#[post("/trainer/slots/controls", data = "<command>")]
pub async fn control_slots(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<Slot>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.trainer.slots, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Slots")]
#[post("/trainer/slots", data = "<form>")]
pub async fn create_slot(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    form: Json<SingleSlotForm>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let payload = form.payload().map_err(ApiError::invalid_fields)?;
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.trainer.slot_writes.clone(), s.notifier.clone())
    };

    let result = slots::create(&mutation, &payload).await;
    let data = settle_write(&notifier, result, "Slot created successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Slot created successfully".to_string(),
        data,
    )))
}

#[openapi(tag = "Slots")]
#[post("/trainer/slots/recurring", data = "<form>")]
pub async fn create_recurring_slots(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    form: Json<RecurringSlotForm>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let payload = form.payload().map_err(ApiError::invalid_fields)?;
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.trainer.slot_writes.clone(), s.notifier.clone())
    };

    let result = slots::create_recurring(&mutation, &payload).await;
    let data = settle_write(&notifier, result, "Recurring slots created successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Recurring slots created successfully".to_string(),
        data,
    )))
}

#[openapi(tag = "Slots")]
#[delete("/trainer/slots/<id>")]
pub async fn delete_slot(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    id: String,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        let listed = s.trainer.slots.view().items.into_iter().find(|slot| slot.id == id);
        if listed.is_some_and(|slot| !slot.can_delete()) {
            return Err(ApiError::conflict(
                "Booked or cancelled slots cannot be deleted",
            ));
        }
        (s.trainer.slot_writes.clone(), s.notifier.clone())
    };

    let result = slots::delete(&mutation, &id).await;
    let data = settle_write(&notifier, result, "Slot deleted successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Slot deleted successfully".to_string(),
        data,
    )))
}

#[openapi(tag = "Slots")]
#[post("/trainer/slots/<id>/cancel")]
pub async fn cancel_slot(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    id: String,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Slots).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.trainer.slot_writes.clone(), s.notifier.clone())
    };

    let result = slots::cancel(&mutation, &id).await;
    let data = settle_write(&notifier, result, "Slot cancelled successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Slot cancelled successfully".to_string(),
        data,
    )))
}

// ------------------------------------------------------------- sessions

#[openapi(tag = "Trainer Sessions")]
#[get("/trainer/sessions")]
pub async fn get_trainer_sessions(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<ListView<TrainingSession>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::TrainerSessions).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.trainer.sessions, &s.client, None).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[openapi(tag = "Trainer Sessions")]
#[post("/trainer/sessions/controls", data = "<command>")]
pub async fn control_trainer_sessions(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    command: Json<ListCommand>,
) -> Result<Json<ApiResponse<ListView<TrainingSession>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::TrainerSessions).await?;
    let mut locked = session.lock().await;
    let s = &mut *locked;
    let view = list(&mut s.trainer.sessions, &s.client, Some(&command.0)).await?;
    Ok(Json(ApiResponse::success(view)))
}

// -------------------------------------------------------------- profile

#[openapi(tag = "Trainer Profile")]
#[get("/trainer/profile")]
pub async fn get_profile(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<TrainerProfile>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Profile).await?;
    let mut s = session.lock().await;
    let profile = read(s.profile()).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[openapi(tag = "Trainer Profile")]
#[patch("/trainer/profile", data = "<input>")]
pub async fn update_profile(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    input: Json<ProfileUpdateInput>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    input.validate()?;
    let input = input.into_inner();
    let image = match &input.image {
        Some(image) => Some(image.decode(UploadKind::Image).map_err(|message| {
            ApiError::invalid_fields([("image".to_string(), vec![message])].into())
        })?),
        None => None,
    };
    let changes = ProfileChanges {
        name: input.name.trim().to_string(),
        phone: input.phone.filter(|p| !p.trim().is_empty()),
        bio: input.bio,
        image,
    };

    let session = visit(registry, &guard.0, Page::Profile).await?;
    let (mutation, notifier) = {
        let s = session.lock().await;
        (s.trainer.profile_writes.clone(), s.notifier.clone())
    };

    let result = trainer::update_profile(&mutation, changes).await;
    let data = settle_write(&notifier, result, "Profile updated successfully")?;
    Ok(Json(ApiResponse::success_with_message(
        "Profile updated successfully".to_string(),
        data,
    )))
}

#[openapi(tag = "Trainer Profile")]
#[get("/trainer/wallet")]
pub async fn get_wallet(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<Wallet>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Wallet).await?;
    let client = session.lock().await.client.clone();
    let wallet = trainer::mount_wallet(&client);
    let data = read(&wallet).await?;
    Ok(Json(ApiResponse::success(data)))
}

#[openapi(tag = "Trainer Profile")]
#[get("/trainer/dashboard/stats")]
pub async fn get_trainer_stats(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<TrainerStats>>, ApiError> {
    let session = visit(registry, &guard.0, Page::TrainerDashboard).await?;
    let client = session.lock().await.client.clone();
    let stats = dashboard::mount_trainer_stats(&client);
    let data = read(&stats).await?;
    Ok(Json(ApiResponse::success(data)))
}

// --------------------------------------------------------- verification

/// Current verification request, polled while the trainer has it open.
#[openapi(tag = "Trainer Verification")]
#[get("/trainer/verification")]
pub async fn get_verification_status(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<Option<TrainerVerification>>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verification).await?;
    let mut s = session.lock().await;
    let status = read(s.verification_status()).await?;
    Ok(Json(ApiResponse::success(status)))
}

#[openapi(tag = "Trainer Verification")]
#[get("/trainer/verification/wizard")]
pub async fn get_wizard(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verification).await?;
    let s = session.lock().await;
    Ok(Json(ApiResponse::success(s.trainer.wizard.view())))
}

#[openapi(tag = "Trainer Verification")]
#[post("/trainer/verification/details", data = "<details>")]
pub async fn submit_details(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    details: Json<VerificationDetails>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verification).await?;
    let mut s = session.lock().await;
    s.trainer.wizard.submit_details(details.into_inner())?;
    Ok(Json(ApiResponse::success(s.trainer.wizard.view())))
}

#[openapi(tag = "Trainer Verification")]
#[post("/trainer/verification/back")]
pub async fn wizard_back(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verification).await?;
    let mut s = session.lock().await;
    s.trainer.wizard.back();
    Ok(Json(ApiResponse::success(s.trainer.wizard.view())))
}

#[openapi(tag = "Trainer Verification")]
#[post("/trainer/verification/documents", data = "<documents>")]
pub async fn submit_documents(
    guard: TrainerGuard,
    registry: &State<SessionRegistry>,
    documents: Json<DocumentsForm>,
) -> Result<Json<ApiResponse<WizardView>>, ApiError> {
    let session = visit(registry, &guard.0, Page::Verification).await?;
    let (submission, mutation, notifier) = {
        let mut s = session.lock().await;
        let submission = s.trainer.wizard.prepare(&documents)?;
        (submission, s.trainer.verification_writes.clone(), s.notifier.clone())
    };

    let result = trainer::submit_verification(&mutation, submission).await;

    let mut s = session.lock().await;
    s.trainer.wizard.settle(&result, &notifier);
    result?;
    Ok(Json(ApiResponse::success_with_message(
        "Verification submitted successfully".to_string(),
        s.trainer.wizard.view(),
    )))
}
