use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::webhook::{extract_call_event, identify_practice};
use crate::models::{CallEvent, CallRecord, CallStatus, Intent, PracticeConfig};
use crate::services::booking::{self, BookingSession};
use crate::state::AppState;

const MAX_STORED_RESPONSE: usize = 1000;

// Intermediate platform chatter that never needs a response from us.
const SKIPPED_EVENTS: [&str; 3] = ["conversation-update", "speech-update", "status-update"];

pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    // Validate shared webhook secret (skip if unset — dev mode).
    if !state.config.voice_secret.is_empty() {
        let secret = headers
            .get("x-voice-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if secret != state.config.voice_secret {
            tracing::warn!("webhook secret mismatch");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "invalid webhook secret" })),
            )
                .into_response();
        }
    }

    let event = extract_call_event(&payload);
    tracing::info!(
        call_id = %event.call_id,
        event_type = %event.event_type,
        "incoming voice webhook"
    );

    let practice = resolve_practice(&state, &payload);

    match event.event_type.as_str() {
        "function-call" => handle_function_call(&state, &event, practice).await,
        "end-of-call-report" => handle_call_report(&state, &event, practice),
        t if SKIPPED_EVENTS.contains(&t) => Json(json!({
            "status": "skipped",
            "call_id": event.call_id,
            "event_type": event.event_type,
            "processed": false,
        }))
        .into_response(),
        _ => handle_other_event(&state, &event, practice),
    }
}

/// Resolves the tenant for a webhook payload: explicit key first (called
/// number or assistant/metadata id), then the default practice. Lookup
/// failures are logged and degrade to no practice; the call is still served
/// with generic responses.
fn resolve_practice(state: &AppState, payload: &Value) -> Option<PracticeConfig> {
    let db = state.db.lock().unwrap();

    if let Some(key) = identify_practice(payload) {
        let phone_like = key.starts_with('+') || key.chars().all(|c| c.is_ascii_digit());
        let result = if phone_like {
            queries::get_practice_by_phone(&db, &key)
        } else {
            queries::get_practice(&db, &key)
        };
        match result {
            Ok(Some(practice)) => return Some(practice),
            Ok(None) => {}
            Err(e) => tracing::error!(error = %e, key = %key, "practice lookup failed"),
        }
    }

    match queries::get_default_practice(&db) {
        Ok(practice) => practice,
        Err(e) => {
            tracing::error!(error = %e, "default practice lookup failed");
            None
        }
    }
}

/// Live tool invocation from the assistant mid-call. The platform is waiting
/// on this response to speak, so internal failures degrade to an apology
/// result instead of an error status.
async fn handle_function_call(
    state: &AppState,
    event: &CallEvent,
    practice: Option<PracticeConfig>,
) -> Response {
    if event.transcript.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "function call without a query" })),
        )
            .into_response();
    }

    let practice = practice.unwrap_or_default();
    let analysis = state.matcher.analyze(&event.transcript, &practice);
    let mut response_text = analysis.suggested_response.clone();

    // An active booking session owns the conversation until it completes;
    // emergencies always interrupt it.
    let session = {
        let db = state.db.lock().unwrap();
        queries::get_booking_session(&db, &event.call_id).unwrap_or_else(|e| {
            tracing::error!(error = %e, "booking session lookup failed");
            None
        })
    };
    let in_flow = session.is_some();

    if analysis.intent != Intent::Emergency
        && (in_flow || analysis.intent == Intent::AppointmentBooking)
    {
        let mut session = session
            .unwrap_or_else(|| BookingSession::new(&event.call_id, Some(practice.id.clone())));
        let reply = in_flow.then_some(event.transcript.as_str());
        let prompt = booking::advance(&mut session, reply);

        // A prompt that expects no reply ends the flow; the session row goes
        // with it.
        let db = state.db.lock().unwrap();
        let saved = if prompt.requires_response {
            queries::save_booking_session(&db, &session)
        } else {
            queries::delete_booking_session(&db, &event.call_id)
        };
        if let Err(e) = saved {
            tracing::error!(error = %e, "failed to persist booking session");
        }
        response_text = prompt.question;
    }

    let record = CallRecord {
        id: Uuid::new_v4().to_string(),
        practice_id: non_empty(&practice.id),
        caller_number: event.caller_number.clone(),
        status: CallStatus::InProgress,
        transcript: event.transcript.clone(),
        intent: analysis.intent,
        intent_confidence: analysis.confidence,
        faq_matched: analysis.faq_matched.clone(),
        response_text: truncate(&response_text, MAX_STORED_RESPONSE),
        created_at: Utc::now().naive_utc(),
    };
    {
        let db = state.db.lock().unwrap();
        if let Err(e) = queries::insert_call(&db, &record) {
            tracing::error!(error = %e, "failed to store call record");
        }
    }

    tool_result_response(event, &response_text)
}

fn handle_call_report(
    state: &AppState,
    event: &CallEvent,
    practice: Option<PracticeConfig>,
) -> Response {
    if event.caller_number.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "call report without a caller number" })),
        )
            .into_response();
    }

    let practice = practice.unwrap_or_default();
    let analysis = state.matcher.analyze(&event.transcript, &practice);
    store_completed_call(state, event, &practice, &analysis);

    Json(json!({
        "status": "logged",
        "call_id": event.call_id,
        "event_type": event.event_type,
        "processed": true,
    }))
    .into_response()
}

/// Unrecognized event types are still logged when they carry enough to
/// analyze; anything else is acknowledged and dropped.
fn handle_other_event(
    state: &AppState,
    event: &CallEvent,
    practice: Option<PracticeConfig>,
) -> Response {
    if event.caller_number.is_some() && !event.transcript.trim().is_empty() {
        let practice = practice.unwrap_or_default();
        let analysis = state.matcher.analyze(&event.transcript, &practice);
        store_completed_call(state, event, &practice, &analysis);
        return Json(json!({
            "status": "logged",
            "call_id": event.call_id,
            "event_type": event.event_type,
            "processed": true,
        }))
        .into_response();
    }

    Json(json!({
        "status": "skipped",
        "call_id": event.call_id,
        "event_type": event.event_type,
        "processed": false,
    }))
    .into_response()
}

fn store_completed_call(
    state: &AppState,
    event: &CallEvent,
    practice: &PracticeConfig,
    analysis: &crate::models::IntentResult,
) {
    let record = CallRecord {
        id: Uuid::new_v4().to_string(),
        practice_id: non_empty(&practice.id),
        caller_number: event.caller_number.clone(),
        status: CallStatus::Completed,
        transcript: event.transcript.clone(),
        intent: analysis.intent,
        intent_confidence: analysis.confidence,
        faq_matched: analysis.faq_matched.clone(),
        response_text: truncate(&analysis.suggested_response, MAX_STORED_RESPONSE),
        created_at: Utc::now().naive_utc(),
    };
    let db = state.db.lock().unwrap();
    if let Err(e) = queries::insert_call(&db, &record) {
        tracing::error!(error = %e, "failed to store call record");
    }
}

/// Tool results are spoken by the assistant verbatim; newlines come out as
/// awkward pauses, so the text is flattened to one line.
fn tool_result_response(event: &CallEvent, text: &str) -> Response {
    let result = text.replace('\n', " ");
    Json(json!({
        "results": [{
            "toolCallId": event.tool_call_id.as_deref().unwrap_or("unknown"),
            "result": result,
        }]
    }))
    .into_response()
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text[..end].to_string()
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ── Direct analysis endpoint ──

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub transcript: String,
    pub practice_id: Option<String>,
}

/// Runs the matcher against a transcript without going through the voice
/// platform. Used for testing FAQ content and tuning practice data.
pub async fn analyze_transcript(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, AppError> {
    if request.transcript.trim().is_empty() {
        return Err(AppError::BadRequest("transcript is required".to_string()));
    }

    let practice = {
        let db = state.db.lock().unwrap();
        match &request.practice_id {
            Some(id) => queries::get_practice(&db, id)?
                .ok_or_else(|| AppError::NotFound(format!("practice {id} not found")))?,
            None => queries::get_default_practice(&db)?.unwrap_or_default(),
        }
    };

    let analysis = state.matcher.analyze(&request.transcript, &practice);
    let response = analysis.suggested_response.clone();
    Ok(Json(json!({
        "intent_analysis": analysis,
        "response": response,
        "practice_info": { "id": practice.id, "name": practice.name },
    })))
}
