use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_schedule::SlotWindow;

use crate::models::{BookSlotRequest, CheckSlotRequest, ConsultationError, RescheduleRequest};
use crate::services::booking::BookingService;
use crate::services::lifecycle::LifecycleService;

fn map_consultation_error(e: ConsultationError) -> AppError {
    match e {
        ConsultationError::NotFound => AppError::NotFound("Consultation not found".to_string()),
        ConsultationError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        // A taken slot is an expected business outcome: conflict, retry with
        // a different slot.
        ConsultationError::SlotUnavailable => AppError::Conflict("Slot not available".to_string()),
        ConsultationError::MissingFee => {
            AppError::BadRequest("Doctor has no consultation fee configured".to_string())
        }
        ConsultationError::InvalidSlot(msg) => AppError::BadRequest(msg),
        // Payment failures stay distinguishable from conflicts and from
        // system errors: retry with a different payment method.
        ConsultationError::PaymentFailed => AppError::Payment("Payment failed".to_string()),
        ConsultationError::TooLateToReschedule => {
            AppError::Conflict("You have exceeded the time to reschedule".to_string())
        }
        ConsultationError::JoinWindowNotOpen => AppError::BadRequest(
            "You can only join 10 minutes before the consultation starts".to_string(),
        ),
        ConsultationError::Unauthorized => {
            AppError::Forbidden("Unauthorized access to consultation".to_string())
        }
        ConsultationError::Database(msg) => AppError::Database(msg),
        ConsultationError::Provider(msg) => AppError::ExternalService(msg),
    }
}

fn parse_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::BadRequest("Invalid user id".to_string()))
}

fn parse_window(slot: (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)) -> Result<SlotWindow, AppError> {
    SlotWindow::new(slot.0, slot.1).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Charge the patient and book the slot in one request.
#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_patient() {
        return Err(AppError::Forbidden("Only patients are authorized".to_string()));
    }
    let patient_id = parse_user_id(&user)?;
    let window = parse_window(request.slot)?;

    let booking_service = BookingService::new(&state);

    let consultation_id = booking_service
        .book_slot(patient_id, request.doctor_id, window, &request.source_id, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!({ "consultation_id": consultation_id })))
}

#[axum::debug_handler]
pub async fn check_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_patient() {
        return Err(AppError::Forbidden("Only patients are authorized".to_string()));
    }
    let patient_id = parse_user_id(&user)?;
    let window = parse_window(request.slot)?;

    let booking_service = BookingService::new(&state);

    let valid_slot = booking_service
        .check_slot(patient_id, request.doctor_id, window, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!({ "valid_slot": valid_slot })))
}

#[axum::debug_handler]
pub async fn reschedule_consultation(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_patient() {
        return Err(AppError::Forbidden("Only patients are authorized".to_string()));
    }
    let patient_id = parse_user_id(&user)?;
    let window = parse_window(request.slot)?;

    let booking_service = BookingService::new(&state);

    booking_service
        .reschedule(patient_id, request.consultation_id, window, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!({ "success": true })))
}

/// The caller's consultations, shaped for their role.
#[axum::debug_handler]
pub async fn list_consultations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let caller_id = parse_user_id(&user)?;

    let lifecycle_service = LifecycleService::new(&state);

    if user.is_doctor() {
        let list = lifecycle_service
            .list_for_doctor(caller_id, token)
            .await
            .map_err(map_consultation_error)?;
        Ok(Json(json!({ "list": list })))
    } else {
        let list = lifecycle_service
            .list_for_patient(caller_id, token)
            .await
            .map_err(map_consultation_error)?;
        Ok(Json(json!({ "list": list })))
    }
}

#[axum::debug_handler]
pub async fn get_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let caller_id = parse_user_id(&user)?;

    let lifecycle_service = LifecycleService::new(&state);

    let consultation = lifecycle_service
        .get_for_participant(caller_id, consultation_id, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!(consultation)))
}

#[axum::debug_handler]
pub async fn complete_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors are authorized".to_string()));
    }
    let doctor_id = parse_user_id(&user)?;

    let lifecycle_service = LifecycleService::new(&state);

    lifecycle_service
        .complete_consultation(doctor_id, consultation_id, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn join_consultation(
    State(state): State<Arc<AppConfig>>,
    Path(consultation_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let caller_id = parse_user_id(&user)?;

    let lifecycle_service = LifecycleService::new(&state);

    let join_info = lifecycle_service
        .join_consultation(caller_id, consultation_id, token)
        .await
        .map_err(map_consultation_error)?;

    Ok(Json(json!(join_info)))
}
