use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Intent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub practice_id: Option<String>,
    pub caller_number: Option<String>,
    pub status: CallStatus,
    pub transcript: String,
    pub intent: Intent,
    pub intent_confidence: f64,
    pub faq_matched: Option<String>,
    pub response_text: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    InProgress,
    Completed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => CallStatus::Completed,
            _ => CallStatus::InProgress,
        }
    }
}
