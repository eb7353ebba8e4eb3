use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Steps of the conversational booking flow, walked one caller reply at a
/// time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    GatherName,
    GatherPhone,
    GatherService,
    ConfirmDetails,
    CheckAvailability,
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::GatherName => "gather_name",
            BookingStep::GatherPhone => "gather_phone",
            BookingStep::GatherService => "gather_service",
            BookingStep::ConfirmDetails => "confirm_details",
            BookingStep::CheckAvailability => "check_availability",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "gather_phone" => BookingStep::GatherPhone,
            "gather_service" => BookingStep::GatherService,
            "confirm_details" => BookingStep::ConfirmDetails,
            "check_availability" => BookingStep::CheckAvailability,
            _ => BookingStep::GatherName,
        }
    }
}

/// One in-flight booking conversation, keyed by the platform call id and
/// persisted between webhook events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSession {
    pub call_id: String,
    pub practice_id: Option<String>,
    pub step: BookingStep,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BookingSession {
    pub fn new(call_id: &str, practice_id: Option<String>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            call_id: call_id.to_string(),
            practice_id,
            step: BookingStep::GatherName,
            customer_name: None,
            customer_phone: None,
            service: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepPrompt {
    pub question: String,
    pub step: BookingStep,
    pub requires_response: bool,
}

fn prompt(question: impl Into<String>, step: BookingStep) -> StepPrompt {
    StepPrompt {
        question: question.into(),
        step,
        requires_response: step != BookingStep::CheckAvailability,
    }
}

/// Consumes the caller's reply for the current step (if any) and produces the
/// next question. Pure with respect to everything except the session itself;
/// persistence is the caller's job.
pub fn advance(session: &mut BookingSession, reply: Option<&str>) -> StepPrompt {
    if let Some(reply) = reply.map(str::trim).filter(|r| !r.is_empty()) {
        match session.step {
            BookingStep::GatherName => {
                session.customer_name = Some(reply.to_string());
                session.step = BookingStep::GatherPhone;
            }
            BookingStep::GatherPhone => {
                session.customer_phone = Some(clean_phone_number(reply));
                session.step = BookingStep::GatherService;
            }
            BookingStep::GatherService => {
                session.service = Some(normalize_service(reply));
                session.step = BookingStep::ConfirmDetails;
            }
            BookingStep::ConfirmDetails => {
                if is_positive(reply) {
                    session.step = BookingStep::CheckAvailability;
                } else {
                    rewind_for_change(session, reply);
                }
            }
            BookingStep::CheckAvailability => {}
        }
    }
    session.updated_at = Utc::now().naive_utc();

    match session.step {
        BookingStep::GatherName => prompt(
            "Great! I'd be happy to help you schedule an appointment. What's your name?",
            BookingStep::GatherName,
        ),
        BookingStep::GatherPhone => {
            let name = session.customer_name.as_deref().unwrap_or("");
            prompt(
                format!("Thank you, {name}. What's the best phone number to reach you?"),
                BookingStep::GatherPhone,
            )
        }
        BookingStep::GatherService => prompt(
            "What type of appointment do you need? For example: cleaning, checkup, \
             consultation, or something specific?",
            BookingStep::GatherService,
        ),
        BookingStep::ConfirmDetails => prompt(
            format!(
                "Let me confirm your details. Name: {}. Phone: {}. Service: {}. Is this \
                 correct? Please say yes to confirm or no if you need to change anything.",
                session.customer_name.as_deref().unwrap_or("unknown"),
                session.customer_phone.as_deref().unwrap_or("unknown"),
                session.service.as_deref().unwrap_or("unknown"),
            ),
            BookingStep::ConfirmDetails,
        ),
        BookingStep::CheckAvailability => prompt(
            "Perfect! Let me check our available appointment times.",
            BookingStep::CheckAvailability,
        ),
    }
}

fn rewind_for_change(session: &mut BookingSession, reply: &str) {
    let lower = reply.to_lowercase();
    if lower.contains("name") {
        session.customer_name = None;
        session.step = BookingStep::GatherName;
    } else if lower.contains("phone") || lower.contains("number") {
        session.customer_phone = None;
        session.step = BookingStep::GatherPhone;
    } else if lower.contains("service") || lower.contains("appointment") {
        session.service = None;
        session.step = BookingStep::GatherService;
    }
    // Anything else re-asks the confirmation question.
}

fn is_positive(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    ["yes", "yeah", "yep", "correct", "right", "sounds good"]
        .iter()
        .any(|w| lower.contains(w))
}

/// Formats 10- and 11-digit North American numbers as (xxx) xxx-xxxx;
/// anything else passes through untouched.
pub fn clean_phone_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        _ => raw.trim().to_string(),
    }
}

/// Maps free-text service descriptions onto the standard categories; unmapped
/// input passes through as spoken.
pub fn normalize_service(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mapping: [(&str, &[&str]); 10] = [
        ("cleaning", &["cleaning", "hygiene", "prophylaxis"]),
        ("checkup", &["checkup", "check up", "exam", "consultation", "evaluation"]),
        ("emergency", &["emergency", "urgent", "pain", "broken"]),
        ("filling", &["filling", "cavity", "decay"]),
        ("crown", &["crown", "cap", "restoration"]),
        ("root canal", &["root canal", "endodontic", "nerve treatment"]),
        ("extraction", &["extraction", "pull tooth", "remove tooth", "take out"]),
        ("whitening", &["whitening", "bleaching", "brighten"]),
        ("braces", &["braces", "orthodontic", "straighten", "alignment"]),
        ("implant", &["implant", "replacement tooth"]),
    ];

    for (standard, variations) in mapping {
        if variations.iter().any(|v| lower.contains(v)) {
            return standard.to_string();
        }
    }
    raw.trim().to_string()
}
