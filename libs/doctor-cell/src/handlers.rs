use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_schedule::SlotWindow;

use crate::models::{CreateDoctorRequest, DoctorError, DoctorFilterQuery, UpdateDoctorRequest};
use crate::services::discovery::DoctorDiscoveryService;
use crate::services::doctor::DoctorService;

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub specialty: Option<String>,
    pub fee_min: Option<i64>,
    pub fee_max: Option<i64>,
    pub name: Option<String>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoveryQuery {
    pub specialty: String,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityUpdate {
    pub available: bool,
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::AlreadyExists => {
            AppError::Conflict("Doctor with this phone already exists".to_string())
        }
        DoctorError::AvailabilityLocked => AppError::Conflict(
            "Doctor has pending consultations - availability can't be changed".to_string(),
        ),
        DoctorError::Validation(msg) => AppError::BadRequest(msg),
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn register_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors are authorized".to_string()));
    }

    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .register_doctor(user_id, request, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .get_doctor(doctor_id, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let doctor_service = DoctorService::new(&state);

    let filter = DoctorFilterQuery {
        specialty: query.specialty,
        fee_min: query.fee_min,
        fee_max: query.fee_max,
        name: query.name,
        available: query.available,
    };

    let doctors = doctor_service
        .list_doctors(filter, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "list": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.id != doctor_id.to_string() {
        return Err(AppError::Forbidden(
            "Not authorized to update this doctor profile".to_string(),
        ));
    }

    let doctor_service = DoctorService::new(&state);

    let doctor = doctor_service
        .update_doctor(doctor_id, request, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AvailabilityUpdate>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_doctor() {
        return Err(AppError::Forbidden("Only doctors are authorized".to_string()));
    }

    let doctor_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    let doctor_service = DoctorService::new(&state);

    doctor_service
        .set_availability(doctor_id, request.available, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({ "success": true })))
}

#[axum::debug_handler]
pub async fn find_available_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DiscoveryQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_patient() {
        return Err(AppError::Forbidden("Only patients are authorized".to_string()));
    }

    let window = SlotWindow::new(query.slot_start, query.slot_end)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let discovery_service = DoctorDiscoveryService::new(&state);

    let doctors = discovery_service
        .find_available_doctors(&query.specialty, window, token)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "list": doctors,
        "total": doctors.len()
    })))
}
