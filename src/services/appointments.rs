use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus};
use crate::state::AppState;

pub struct BookingRequest {
    pub practice_id: String,
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub service: Option<String>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i32,
}

/// Creates the calendar event first, then records the appointment. A failure
/// on the calendar side leaves nothing behind in the store.
pub async fn book(state: &AppState, request: BookingRequest) -> Result<Appointment, AppError> {
    let now = Utc::now().naive_utc();
    let mut appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        practice_id: request.practice_id,
        caller_phone: request.caller_phone,
        caller_name: request.caller_name,
        service: request.service,
        date_time: request.date_time,
        duration_minutes: request.duration_minutes,
        status: AppointmentStatus::Confirmed,
        calendar_event_id: None,
        created_at: now,
        updated_at: now,
    };

    let event_id = state
        .calendar
        .create_event(&appointment)
        .await
        .map_err(|e| AppError::Calendar(format!("{e:#}")))?;
    appointment.calendar_event_id = Some(event_id);

    {
        let db = state.db.lock().unwrap();
        queries::create_appointment(&db, &appointment)?;
    }

    tracing::info!(
        appointment_id = %appointment.id,
        practice_id = %appointment.practice_id,
        "appointment booked"
    );
    Ok(appointment)
}

pub async fn cancel(state: &AppState, appointment_id: &str) -> Result<Appointment, AppError> {
    let appointment = {
        let db = state.db.lock().unwrap();
        queries::get_appointment(&db, appointment_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("appointment {appointment_id} not found")))?;

    if appointment.status == AppointmentStatus::Cancelled {
        return Err(AppError::BadRequest(
            "appointment is already cancelled".to_string(),
        ));
    }

    if let Some(event_id) = &appointment.calendar_event_id {
        state
            .calendar
            .cancel_event(event_id)
            .await
            .map_err(|e| AppError::Calendar(format!("{e:#}")))?;
    }

    let db = state.db.lock().unwrap();
    queries::update_appointment_status(&db, appointment_id, &AppointmentStatus::Cancelled)?;
    let updated = queries::get_appointment(&db, appointment_id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {appointment_id} not found")))?;

    tracing::info!(appointment_id = %appointment_id, "appointment cancelled");
    Ok(updated)
}

pub async fn reschedule(
    state: &AppState,
    appointment_id: &str,
    new_time: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let mut appointment = {
        let db = state.db.lock().unwrap();
        queries::get_appointment(&db, appointment_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("appointment {appointment_id} not found")))?;

    if appointment.status == AppointmentStatus::Cancelled {
        return Err(AppError::BadRequest(
            "cannot reschedule a cancelled appointment".to_string(),
        ));
    }

    appointment.date_time = new_time;
    if let Some(event_id) = &appointment.calendar_event_id {
        state
            .calendar
            .update_event(event_id, &appointment)
            .await
            .map_err(|e| AppError::Calendar(format!("{e:#}")))?;
    }

    let db = state.db.lock().unwrap();
    queries::update_appointment_time(&db, appointment_id, &new_time)?;
    let updated = queries::get_appointment(&db, appointment_id)?
        .ok_or_else(|| AppError::NotFound(format!("appointment {appointment_id} not found")))?;

    tracing::info!(appointment_id = %appointment_id, new_time = %new_time, "appointment rescheduled");
    Ok(updated)
}
