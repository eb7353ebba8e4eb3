use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, CallRecord, PracticeConfig};
use crate::services::appointments::{self, BookingRequest};
use crate::services::calendar::CalendarSlot;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn parse_date_time(s: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        AppError::BadRequest("date_time must be formatted as YYYY-MM-DD HH:MM:SS".to_string())
    })
}

// POST /api/practices
pub async fn upsert_practice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(practice): Json<PracticeConfig>,
) -> Result<Json<PracticeConfig>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if practice.id.trim().is_empty() {
        return Err(AppError::BadRequest("practice id is required".to_string()));
    }

    let db = state.db.lock().unwrap();
    queries::create_practice(&db, &practice)?;
    tracing::info!(practice_id = %practice.id, "practice saved");
    Ok(Json(practice))
}

// GET /api/practices/:id
pub async fn get_practice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PracticeConfig>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let practice = queries::get_practice(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("practice {id} not found")))?;
    Ok(Json(practice))
}

// GET /api/calls?limit=N
#[derive(Deserialize)]
pub struct CallsQuery {
    pub limit: Option<u32>,
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Vec<CallRecord>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).min(500);
    let db = state.db.lock().unwrap();
    let calls = queries::recent_calls(&db, limit)?;
    Ok(Json(calls))
}

// GET /api/practices/:id/availability?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<CalendarSlot>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let slots = state
        .calendar
        .check_availability(&id, &query.date)
        .await
        .map_err(|e| AppError::Calendar(format!("{e:#}")))?;
    Ok(Json(slots))
}

// POST /api/appointments
#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub practice_id: String,
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub service: Option<String>,
    pub date_time: String,
    pub duration_minutes: Option<i32>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if request.caller_phone.trim().is_empty() {
        return Err(AppError::BadRequest("caller_phone is required".to_string()));
    }
    let date_time = parse_date_time(&request.date_time)?;

    let appointment = appointments::book(
        &state,
        BookingRequest {
            practice_id: request.practice_id,
            caller_phone: request.caller_phone,
            caller_name: request.caller_name,
            service: request.service,
            date_time,
            duration_minutes: request.duration_minutes.unwrap_or(60),
        },
    )
    .await?;
    Ok(Json(appointment))
}

// POST /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let appointment = appointments::cancel(&state, &id).await?;
    Ok(Json(appointment))
}

// POST /api/appointments/:id/reschedule
#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub date_time: String,
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let new_time = parse_date_time(&request.date_time)?;
    let appointment = appointments::reschedule(&state, &id, new_time).await?;
    Ok(Json(appointment))
}
