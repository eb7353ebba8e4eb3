use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Closed set of caller intents the matcher can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AppointmentBooking,
    AppointmentCancel,
    AppointmentReschedule,
    HoursInquiry,
    InsuranceInquiry,
    ServicesInquiry,
    LocationInquiry,
    Emergency,
    PaymentInquiry,
    GeneralFaq,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AppointmentBooking => "appointment_booking",
            Intent::AppointmentCancel => "appointment_cancel",
            Intent::AppointmentReschedule => "appointment_reschedule",
            Intent::HoursInquiry => "hours_inquiry",
            Intent::InsuranceInquiry => "insurance_inquiry",
            Intent::ServicesInquiry => "services_inquiry",
            Intent::LocationInquiry => "location_inquiry",
            Intent::Emergency => "emergency",
            Intent::PaymentInquiry => "payment_inquiry",
            Intent::GeneralFaq => "general_faq",
            Intent::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "appointment_booking" => Intent::AppointmentBooking,
            "appointment_cancel" => Intent::AppointmentCancel,
            "appointment_reschedule" => Intent::AppointmentReschedule,
            "hours_inquiry" => Intent::HoursInquiry,
            "insurance_inquiry" => Intent::InsuranceInquiry,
            "services_inquiry" => Intent::ServicesInquiry,
            "location_inquiry" => Intent::LocationInquiry,
            "emergency" => Intent::Emergency,
            "payment_inquiry" => Intent::PaymentInquiry,
            "general_faq" => Intent::GeneralFaq,
            _ => Intent::Unknown,
        }
    }
}

/// Entity kinds extracted from a transcript, independent of the intent outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Time,
    Day,
    Date,
    InsuranceName,
    ServiceName,
    PainLevel,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Time => "time",
            EntityType::Day => "day",
            EntityType::Date => "date",
            EntityType::InsuranceName => "insurance_name",
            EntityType::ServiceName => "service_name",
            EntityType::PainLevel => "pain_level",
        }
    }
}

/// One classification outcome. Constructed fresh per call, never persisted by
/// the matcher itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
    pub extracted_entities: BTreeMap<EntityType, String>,
    pub suggested_response: String,
    pub tenant_specific: bool,
    pub faq_matched: Option<String>,
}

impl IntentResult {
    /// Result for input that matched nothing.
    pub fn unknown(response: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.0,
            matched_keywords: vec![],
            extracted_entities: BTreeMap::new(),
            suggested_response: response.into(),
            tenant_specific: false,
            faq_matched: None,
        }
    }
}
