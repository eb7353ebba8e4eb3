use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use chairside::config::AppConfig;
use chairside::db::{self, queries};
use chairside::handlers;
use chairside::models::{Appointment, PracticeConfig};
use chairside::services::calendar::{CalendarProvider, CalendarSlot};
use chairside::services::matcher::DentalMatcher;
use chairside::state::AppState;

// ── Mock calendar ──

#[derive(Clone, Default)]
struct MockCalendar {
    created: Arc<Mutex<Vec<String>>>,
    cancelled: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl CalendarProvider for MockCalendar {
    async fn check_availability(
        &self,
        _practice_id: &str,
        _date: &str,
    ) -> anyhow::Result<Vec<CalendarSlot>> {
        Ok(vec![CalendarSlot {
            start: "2026-09-15 14:00".to_string(),
            end: "2026-09-15 15:00".to_string(),
        }])
    }

    async fn create_event(&self, appointment: &Appointment) -> anyhow::Result<String> {
        self.created.lock().unwrap().push(appointment.id.clone());
        Ok(format!("evt-{}", appointment.id))
    }

    async fn update_event(&self, _event_id: &str, _appointment: &Appointment) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cancel_event(&self, event_id: &str) -> anyhow::Result<()> {
        self.cancelled.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        voice_secret: "".to_string(), // empty = skip secret validation
        calendar_api_url: "http://localhost:8080".to_string(),
        calendar_api_key: "".to_string(),
    }
}

fn state_with(config: AppConfig, calendar: MockCalendar) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config,
        matcher: DentalMatcher::with_defaults(),
        calendar: Box::new(calendar),
    })
}

fn test_state() -> Arc<AppState> {
    state_with(test_config(), MockCalendar::default())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/voice", post(handlers::webhook::voice_webhook))
        .route(
            "/webhook/analyze",
            post(handlers::webhook::analyze_transcript),
        )
        .route("/api/practices", post(handlers::admin::upsert_practice))
        .route("/api/practices/:id", get(handlers::admin::get_practice))
        .route(
            "/api/practices/:id/availability",
            get(handlers::admin::check_availability),
        )
        .route("/api/calls", get(handlers::admin::list_calls))
        .route(
            "/api/appointments",
            post(handlers::admin::create_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::admin::cancel_appointment),
        )
        .with_state(state)
}

fn seed_practice(state: &AppState) {
    let mut faq = BTreeMap::new();
    faq.insert(
        "What are your hours?".to_string(),
        "We're open 9 to 5 Monday through Friday.".to_string(),
    );
    let practice = PracticeConfig {
        id: "bright-smile".to_string(),
        name: "Bright Smile Dental".to_string(),
        phone_number: Some("+15551112222".to_string()),
        faq,
        insurances: vec!["Delta Dental".to_string(), "Aetna".to_string()],
        services: vec!["cleaning".to_string(), "checkup".to_string()],
        ..Default::default()
    };
    let db = state.db.lock().unwrap();
    queries::create_practice(&db, &practice).unwrap();
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", "Bearer test-token")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Tests ──

#[tokio::test]
async fn test_health() {
    let response = app(test_state())
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_end_of_call_report_is_logged() {
    let state = test_state();
    seed_practice(&state);

    let payload = json!({
        "message": {
            "type": "end-of-call-report",
            "transcript": "what are your hours",
            "call": { "id": "call-1", "phoneNumber": "+15551112222" },
            "customer": { "number": "+15550009999" }
        }
    });
    let response = app(Arc::clone(&state))
        .oneshot(json_post("/webhook/voice", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "logged");
    assert_eq!(body["processed"], true);

    let db = state.db.lock().unwrap();
    let calls = queries::recent_calls(&db, 10).unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].practice_id.as_deref(), Some("bright-smile"));
    assert_eq!(calls[0].intent_confidence, 1.0);
}

#[tokio::test]
async fn test_end_of_call_report_requires_caller() {
    let payload = json!({
        "message": {
            "type": "end-of-call-report",
            "transcript": "hello",
            "call": { "id": "call-1" }
        }
    });
    let response = app(test_state())
        .oneshot(json_post("/webhook/voice", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_function_call_returns_tool_result() {
    let state = test_state();
    seed_practice(&state);

    let payload = json!({
        "id": "tc-1",
        "function": {
            "name": "lookup",
            "arguments": "{\"query\":\"what are your hours\"}"
        }
    });
    let response = app(state)
        .oneshot(json_post("/webhook/voice", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["results"][0]["toolCallId"], "tc-1");
    let result = body["results"][0]["result"].as_str().unwrap();
    assert_eq!(result, "We're open 9 to 5 Monday through Friday.");
    assert!(!result.contains('\n'));
}

#[tokio::test]
async fn test_function_call_requires_query() {
    let payload = json!({ "query": "", "call_id": "c-1" });
    let response = app(test_state())
        .oneshot(json_post("/webhook/voice", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_flow_across_function_calls() {
    let state = test_state();
    seed_practice(&state);

    let first = json!({
        "call_id": "call-7",
        "id": "tc-1",
        "function": {
            "name": "lookup",
            "arguments": "{\"query\":\"I want to book an appointment\"}"
        }
    });
    let response = app(Arc::clone(&state)).oneshot(json_post("/webhook/voice", first)).await.unwrap();
    let body = response_json(response).await;
    let question = body["results"][0]["result"].as_str().unwrap();
    assert!(question.contains("What's your name"), "got: {question}");

    // Same call id continues the session with the caller's reply.
    let second = json!({
        "call_id": "call-7",
        "id": "tc-2",
        "function": {
            "name": "lookup",
            "arguments": "{\"query\":\"Jane Doe\"}"
        }
    });
    let response = app(Arc::clone(&state)).oneshot(json_post("/webhook/voice", second)).await.unwrap();
    let body = response_json(response).await;
    let question = body["results"][0]["result"].as_str().unwrap();
    assert!(question.contains("Jane Doe"), "got: {question}");
    assert!(question.contains("phone number"), "got: {question}");
}

#[tokio::test]
async fn test_booking_flow_completion_clears_session() {
    let state = test_state();
    seed_practice(&state);

    let replies = [
        "I want to book an appointment",
        "Jane Doe",
        "5551234567",
        "a cleaning please",
        "yes that's right",
    ];
    let mut last = String::new();
    for (i, reply) in replies.iter().enumerate() {
        let payload = json!({
            "call_id": "call-8",
            "id": format!("tc-{i}"),
            "function": {
                "name": "lookup",
                "arguments": json!({ "query": reply }).to_string()
            }
        });
        let response = app(Arc::clone(&state))
            .oneshot(json_post("/webhook/voice", payload))
            .await
            .unwrap();
        let body = response_json(response).await;
        last = body["results"][0]["result"].as_str().unwrap().to_string();

        // The session row lives exactly as long as a reply is still expected.
        let db = state.db.lock().unwrap();
        let session = queries::get_booking_session(&db, "call-8").unwrap();
        if i < replies.len() - 1 {
            assert!(session.is_some(), "session missing after step {i}");
        } else {
            assert!(session.is_none(), "session not cleared after confirmation");
        }
    }
    assert!(last.contains("available appointment times"), "got: {last}");
}

#[tokio::test]
async fn test_intermediate_events_are_skipped() {
    let payload = json!({
        "message": {
            "type": "speech-update",
            "call": { "id": "call-2" }
        }
    });
    let response = app(test_state())
        .oneshot(json_post("/webhook/voice", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "skipped");
    assert_eq!(body["processed"], false);
}

#[tokio::test]
async fn test_webhook_secret_enforced() {
    let mut config = test_config();
    config.voice_secret = "s3cret".to_string();
    let state = state_with(config, MockCalendar::default());

    let payload = json!({ "message": { "type": "status-update" } });
    let response = app(Arc::clone(&state))
        .oneshot(json_post("/webhook/voice", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("POST")
        .uri("/webhook/voice")
        .header("content-type", "application/json")
        .header("x-voice-secret", "s3cret")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analyze_endpoint() {
    let state = test_state();
    seed_practice(&state);

    let response = app(Arc::clone(&state))
        .oneshot(json_post(
            "/webhook/analyze",
            json!({ "transcript": "what are your hours" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["intent_analysis"]["confidence"], 1.0);
    assert_eq!(body["intent_analysis"]["tenant_specific"], true);
    assert_eq!(body["practice_info"]["name"], "Bright Smile Dental");
    assert_eq!(body["response"], "We're open 9 to 5 Monday through Friday.");
}

#[tokio::test]
async fn test_analyze_requires_transcript() {
    let response = app(test_state())
        .oneshot(json_post("/webhook/analyze", json!({ "transcript": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_requires_auth() {
    let response = app(test_state())
        .oneshot(
            Request::builder()
                .uri("/api/calls")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_practice_roundtrip() {
    let state = test_state();

    let practice = json!({
        "id": "p-1",
        "name": "Downtown Dental",
        "faq": { "Do you offer whitening?": "Yes, we do." }
    });
    let response = app(Arc::clone(&state))
        .oneshot(authed_json_post("/api/practices", practice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/api/practices/p-1")
        .header("authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap();
    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["name"], "Downtown Dental");
}

#[tokio::test]
async fn test_appointment_book_and_cancel() {
    let calendar = MockCalendar::default();
    let state = state_with(test_config(), calendar.clone());
    seed_practice(&state);

    let response = app(Arc::clone(&state))
        .oneshot(authed_json_post(
            "/api/appointments",
            json!({
                "practice_id": "bright-smile",
                "caller_phone": "(555) 000-1111",
                "caller_name": "Jane Doe",
                "service": "cleaning",
                "date_time": "2026-09-15 14:00:00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], "confirmed");
    assert_eq!(calendar.created.lock().unwrap().len(), 1);

    let response = app(Arc::clone(&state))
        .oneshot(authed_json_post(
            &format!("/api/appointments/{id}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "cancelled");
    assert_eq!(
        calendar.cancelled.lock().unwrap().as_slice(),
        &[format!("evt-{id}")]
    );
}

#[tokio::test]
async fn test_availability_proxied_to_calendar() {
    let state = test_state();
    seed_practice(&state);

    let request = Request::builder()
        .uri("/api/practices/bright-smile/availability?date=2026-09-15")
        .header("authorization", "Bearer test-token")
        .body(Body::empty())
        .unwrap();
    let response = app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body[0]["start"], "2026-09-15 14:00");
}

#[tokio::test]
async fn test_cancel_unknown_appointment_is_404() {
    let response = app(test_state())
        .oneshot(authed_json_post("/api/appointments/nope/cancel", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
