use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub practice_id: String,
    pub caller_phone: String,
    pub caller_name: Option<String>,
    pub service: Option<String>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub calendar_event_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "confirmed" => AppointmentStatus::Confirmed,
            "cancelled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Pending,
        }
    }
}
