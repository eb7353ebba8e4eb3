use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Appointment, AppointmentStatus, CallRecord, CallStatus, Intent, PracticeConfig,
};
use crate::services::booking::{BookingSession, BookingStep};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Practices ──

pub fn create_practice(conn: &Connection, practice: &PracticeConfig) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO practices (id, name, phone_number, hours_json, insurances_json, faq_json, services_json, location_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           phone_number = excluded.phone_number,
           hours_json = excluded.hours_json,
           insurances_json = excluded.insurances_json,
           faq_json = excluded.faq_json,
           services_json = excluded.services_json,
           location_json = excluded.location_json",
        params![
            practice.id,
            practice.name,
            practice.phone_number,
            serde_json::to_string(&practice.hours)?,
            serde_json::to_string(&practice.insurances)?,
            serde_json::to_string(&practice.faq)?,
            serde_json::to_string(&practice.services)?,
            serde_json::to_string(&practice.location)?,
        ],
    )?;
    Ok(())
}

fn practice_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PracticeConfig> {
    let hours_json: String = row.get(3)?;
    let insurances_json: String = row.get(4)?;
    let faq_json: String = row.get(5)?;
    let services_json: String = row.get(6)?;
    let location_json: String = row.get(7)?;

    // Malformed stored JSON degrades to empty collections rather than
    // failing the call.
    Ok(PracticeConfig {
        id: row.get(0)?,
        name: row.get(1)?,
        phone_number: row.get(2)?,
        hours: serde_json::from_str(&hours_json).unwrap_or_default(),
        insurances: serde_json::from_str(&insurances_json).unwrap_or_default(),
        faq: serde_json::from_str(&faq_json).unwrap_or_default(),
        services: serde_json::from_str(&services_json).unwrap_or_default(),
        location: serde_json::from_str(&location_json).unwrap_or_default(),
    })
}

const PRACTICE_COLUMNS: &str =
    "id, name, phone_number, hours_json, insurances_json, faq_json, services_json, location_json";

pub fn get_practice(conn: &Connection, id: &str) -> anyhow::Result<Option<PracticeConfig>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRACTICE_COLUMNS} FROM practices WHERE id = ?1"
    ))?;
    match stmt.query_row(params![id], practice_from_row) {
        Ok(practice) => Ok(Some(practice)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_practice_by_phone(
    conn: &Connection,
    phone: &str,
) -> anyhow::Result<Option<PracticeConfig>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRACTICE_COLUMNS} FROM practices WHERE phone_number = ?1"
    ))?;
    match stmt.query_row(params![phone], practice_from_row) {
        Ok(practice) => Ok(Some(practice)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Single-tenant fallback: the oldest registered practice, if any.
pub fn get_default_practice(conn: &Connection) -> anyhow::Result<Option<PracticeConfig>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRACTICE_COLUMNS} FROM practices ORDER BY created_at ASC, id ASC LIMIT 1"
    ))?;
    match stmt.query_row([], practice_from_row) {
        Ok(practice) => Ok(Some(practice)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Calls ──

pub fn insert_call(conn: &Connection, call: &CallRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO calls (id, practice_id, caller_number, status, transcript, intent, intent_confidence, faq_matched, response_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            call.id,
            call.practice_id,
            call.caller_number,
            call.status.as_str(),
            call.transcript,
            call.intent.as_str(),
            call.intent_confidence,
            call.faq_matched,
            call.response_text,
            call.created_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

fn call_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallRecord> {
    let status_str: String = row.get(3)?;
    let intent_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;

    Ok(CallRecord {
        id: row.get(0)?,
        practice_id: row.get(1)?,
        caller_number: row.get(2)?,
        status: CallStatus::from_str(&status_str),
        transcript: row.get(4)?,
        intent: Intent::parse(&intent_str),
        intent_confidence: row.get(6)?,
        faq_matched: row.get(7)?,
        response_text: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}

pub fn recent_calls(conn: &Connection, limit: u32) -> anyhow::Result<Vec<CallRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, practice_id, caller_number, status, transcript, intent, intent_confidence, faq_matched, response_text, created_at
         FROM calls ORDER BY created_at DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], call_from_row)?;
    let mut calls = vec![];
    for row in rows {
        calls.push(row?);
    }
    Ok(calls)
}

// ── Appointments ──

pub fn create_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, practice_id, caller_phone, caller_name, service, date_time, duration_minutes, status, calendar_event_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.id,
            appt.practice_id,
            appt.caller_phone,
            appt.caller_name,
            appt.service,
            appt.date_time.format(DATETIME_FMT).to_string(),
            appt.duration_minutes,
            appt.status.as_str(),
            appt.calendar_event_id,
            appt.created_at.format(DATETIME_FMT).to_string(),
            appt.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

fn appointment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Appointment> {
    let date_time_str: String = row.get(5)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    Ok(Appointment {
        id: row.get(0)?,
        practice_id: row.get(1)?,
        caller_phone: row.get(2)?,
        caller_name: row.get(3)?,
        service: row.get(4)?,
        date_time: parse_datetime(&date_time_str),
        duration_minutes: row.get(6)?,
        status: AppointmentStatus::from_str(&status_str),
        calendar_event_id: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

const APPOINTMENT_COLUMNS: &str = "id, practice_id, caller_phone, caller_name, service, date_time, duration_minutes, status, calendar_event_id, created_at, updated_at";

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;
    match stmt.query_row(params![id], appointment_from_row) {
        Ok(appt) => Ok(Some(appt)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn appointments_for_phone(conn: &Connection, phone: &str) -> anyhow::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE caller_phone = ?1 ORDER BY date_time ASC"
    ))?;
    let rows = stmt.query_map(params![phone], appointment_from_row)?;
    let mut appointments = vec![];
    for row in rows {
        appointments.push(row?);
    }
    Ok(appointments)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: &AppointmentStatus,
) -> anyhow::Result<()> {
    let updated_at = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), updated_at, id],
    )?;
    Ok(())
}

pub fn update_appointment_time(
    conn: &Connection,
    id: &str,
    date_time: &NaiveDateTime,
) -> anyhow::Result<()> {
    let updated_at = Utc::now().naive_utc().format(DATETIME_FMT).to_string();
    conn.execute(
        "UPDATE appointments SET date_time = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            date_time.format(DATETIME_FMT).to_string(),
            AppointmentStatus::Pending.as_str(),
            updated_at,
            id
        ],
    )?;
    Ok(())
}

// ── Booking sessions ──

pub fn get_booking_session(
    conn: &Connection,
    call_id: &str,
) -> anyhow::Result<Option<BookingSession>> {
    let mut stmt = conn.prepare(
        "SELECT call_id, practice_id, step, data, created_at, updated_at
         FROM booking_sessions WHERE call_id = ?1",
    )?;

    let result = stmt.query_row(params![call_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    });

    match result {
        Ok((call_id, practice_id, step_str, data_json, created_at_str, updated_at_str)) => {
            let data: serde_json::Value =
                serde_json::from_str(&data_json).unwrap_or(serde_json::json!({}));
            let field = |name: &str| {
                data.get(name)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            };

            Ok(Some(BookingSession {
                call_id,
                practice_id,
                step: BookingStep::parse(&step_str),
                customer_name: field("customer_name"),
                customer_phone: field("customer_phone"),
                service: field("service"),
                created_at: parse_datetime(&created_at_str),
                updated_at: parse_datetime(&updated_at_str),
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_booking_session(conn: &Connection, session: &BookingSession) -> anyhow::Result<()> {
    let data = serde_json::json!({
        "customer_name": session.customer_name,
        "customer_phone": session.customer_phone,
        "service": session.service,
    });
    conn.execute(
        "INSERT INTO booking_sessions (call_id, practice_id, step, data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(call_id) DO UPDATE SET
           practice_id = excluded.practice_id,
           step = excluded.step,
           data = excluded.data,
           updated_at = excluded.updated_at",
        params![
            session.call_id,
            session.practice_id,
            session.step.as_str(),
            serde_json::to_string(&data)?,
            session.created_at.format(DATETIME_FMT).to_string(),
            session.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn delete_booking_session(conn: &Connection, call_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "DELETE FROM booking_sessions WHERE call_id = ?1",
        params![call_id],
    )?;
    Ok(())
}
