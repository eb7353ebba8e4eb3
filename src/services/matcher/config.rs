use std::collections::HashMap;

use regex::Regex;

use crate::models::Intent;

/// Stage acceptance thresholds. Exact match is implicitly 1.0; the substring,
/// keyword-overlap and semantic values double as the confidence reported by
/// the stage that accepted the match.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub substring: f64,
    pub keyword_overlap: f64,
    pub semantic: f64,
    pub unknown_floor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            substring: 0.85,
            keyword_overlap: 0.75,
            semantic: 0.70,
            unknown_floor: 0.30,
        }
    }
}

/// Keyword set, regex patterns and base response for one intent. Patterns run
/// against normalized text, so they contain no punctuation.
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub intent: Intent,
    pub keywords: Vec<String>,
    pub patterns: Vec<Regex>,
    pub response: String,
}

/// Compiled extraction patterns, applied to the normalized transcript.
#[derive(Debug, Clone)]
pub struct EntityPatterns {
    pub time: Regex,
    pub day: Regex,
    pub date: Regex,
    pub pain_level: Regex,
    /// Pain-level adjectives are only reported when one of these
    /// emergency-adjacent words is also present.
    pub pain_context: Regex,
    /// Consulted when the practice config carries no insurer/service lists.
    pub fallback_insurers: Vec<String>,
    pub fallback_services: Vec<String>,
}

/// Immutable matcher configuration, built once at startup and shared by every
/// request. All tables and thresholds can be overridden per deployment.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub thresholds: Thresholds,
    pub abbreviations: HashMap<String, String>,
    pub intents: Vec<IntentPattern>,
    pub entities: EntityPatterns,
    pub empty_transcript_response: String,
    pub fallback_response: String,
}

// Patterns are compile-time constants; a failure here is a programming error
// caught by the unit tests, not a runtime condition.
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid built-in pattern")
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn default_abbreviations() -> HashMap<String, String> {
    [
        ("appt", "appointment"),
        ("appts", "appointments"),
        ("hr", "hours"),
        ("hrs", "hours"),
        ("u", "you"),
        ("ur", "your"),
        ("r", "are"),
        ("doc", "doctor"),
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("tues", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("thur", "thursday"),
        ("thurs", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
        ("sun", "sunday"),
        ("tmrw", "tomorrow"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Intent table in tie-break priority order: emergency first, then the
/// appointment intents, then the informational ones. The cascade keeps the
/// earlier entry when scores are equal.
fn default_intents() -> Vec<IntentPattern> {
    vec![
        IntentPattern {
            intent: Intent::Emergency,
            keywords: keywords(&[
                "emergency", "pain", "urgent", "toothache", "swollen", "bleeding", "broke",
                "broken",
            ]),
            patterns: vec![
                re(r"(dental\s+)?emergency"),
                re(r"(severe|bad|terrible|unbearable)\s+(tooth\s+)?(pain|toothache)"),
                re(r"(broke|broken|lost|chipped|knocked)\s+(my\s+|a\s+)?(tooth|teeth|filling|crown)"),
            ],
            response: "I understand this is urgent. For dental emergencies, please call our \
                       emergency line or visit the nearest hospital if severe. Can you describe \
                       what happened?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::AppointmentBooking,
            keywords: keywords(&[
                "schedule",
                "book",
                "appointment",
                "visit",
                "see doctor",
                "make appointment",
                "need appointment",
                "available times",
                "next available",
                "checkup",
                "consultation",
            ]),
            patterns: vec![
                re(r"(schedule|book|make)\s+(an?\s+)?appointment"),
                re(r"(need|want)\s+(to\s+)?(schedule|book)"),
                re(r"available\s+(times?|slots?|appointments?)"),
                re(r"next\s+(available|open)\s+(slot|time|appointment)"),
                re(r"(when|what time)\s+can\s+i\s+(come|visit|see)"),
            ],
            response: "I'd be happy to help you schedule an appointment. Let me gather some \
                       information to find the best time for you."
                .to_string(),
        },
        IntentPattern {
            intent: Intent::AppointmentCancel,
            keywords: keywords(&["cancel", "cancellation", "cant make it", "need to cancel"]),
            patterns: vec![
                re(r"(need\s+to\s+|want\s+to\s+)?cancel"),
                re(r"cant\s+make\s+(it|my\s+appointment)"),
            ],
            response: "I can help you cancel your appointment. May I have your name and \
                       appointment date to locate your booking?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::AppointmentReschedule,
            keywords: keywords(&[
                "reschedule",
                "change appointment",
                "move appointment",
                "different time",
            ]),
            patterns: vec![
                re(r"(reschedule|change|move)\s+(my\s+)?appointment"),
                re(r"different\s+(time|day|date)"),
            ],
            response: "I can help you reschedule your appointment. What would be a better time \
                       for you?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::HoursInquiry,
            keywords: keywords(&[
                "hours",
                "open",
                "close",
                "operating hours",
                "office hours",
                "what time",
            ]),
            patterns: vec![
                re(r"(office|operating|business)\s+hours"),
                re(r"what\s+time\s+(do\s+you\s+)?(open|close)"),
                re(r"are\s+you\s+open"),
            ],
            response: "Our office hours vary by day. Is there a specific day you'd like to visit?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::InsuranceInquiry,
            keywords: keywords(&[
                "insurance", "coverage", "accept", "covered", "plan", "benefits",
            ]),
            patterns: vec![
                re(r"(do\s+you\s+)?(accept|take)\s+(my\s+)?insurance"),
                re(r"insurance\s+(coverage|plans?|benefits)"),
            ],
            response: "We work with most major insurance plans. What insurance provider do you \
                       have? I can verify your coverage."
                .to_string(),
        },
        IntentPattern {
            intent: Intent::ServicesInquiry,
            keywords: keywords(&[
                "services", "treatment", "procedure", "cleaning", "filling", "crown",
            ]),
            patterns: vec![
                re(r"what\s+(services|treatments?|procedures?)"),
                re(r"do\s+you\s+(do|offer|provide)"),
                re(r"(cleaning|filling|crown|root\s+canal|whitening)"),
            ],
            response: "We offer comprehensive dental services including cleanings, fillings, \
                       crowns, and more. What specific treatment are you interested in?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::LocationInquiry,
            keywords: keywords(&["location", "address", "where", "directions", "parking"]),
            patterns: vec![
                re(r"where\s+(are\s+you\s+)?(located|at)"),
                re(r"(your\s+)?(address|location)"),
                re(r"directions\s+to"),
            ],
            response: "We're conveniently located with easy access and parking. Would you like \
                       our address and directions?"
                .to_string(),
        },
        IntentPattern {
            intent: Intent::PaymentInquiry,
            keywords: keywords(&[
                "payment",
                "cost",
                "price",
                "how much",
                "financing",
                "payment plan",
            ]),
            patterns: vec![
                re(r"(how\s+much|what\s+(does|is)\s+the\s+cost)"),
                re(r"payment\s+(plans?|options?)"),
                re(r"(financing|credit|payment)\s+available"),
            ],
            response: "We offer flexible payment options and financing plans. Costs vary by \
                       treatment. Would you like information about a specific procedure?"
                .to_string(),
        },
    ]
}

fn default_entities() -> EntityPatterns {
    EntityPatterns {
        // Normalization strips the colon out of clock times, so "2:30 pm"
        // arrives here as "230 pm".
        time: re(r"\b(\d{1,2})(\d{2})?\s*(am|pm)\b"),
        day: re(
            r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow)\b",
        ),
        date: re(
            r"\b\d{1,2}(st|nd|rd|th)?\s+(january|february|march|april|may|june|july|august|september|october|november|december)\b",
        ),
        pain_level: re(r"\b(severe|terrible|unbearable|intense|moderate|mild)\b"),
        pain_context: re(
            r"\b(pain|ache|aching|hurts|hurting|toothache|emergency|urgent|swollen|bleeding)\b",
        ),
        fallback_insurers: keywords(&[
            "delta dental",
            "delta",
            "aetna",
            "cigna",
            "blue cross",
            "humana",
            "metlife",
            "united",
            "anthem",
        ]),
        fallback_services: keywords(&[
            "root canal",
            "teeth whitening",
            "cleaning",
            "whitening",
            "filling",
            "crown",
            "extraction",
            "braces",
            "implants",
            "checkup",
        ]),
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            abbreviations: default_abbreviations(),
            intents: default_intents(),
            entities: default_entities(),
            empty_transcript_response:
                "I didn't catch that. Could you please repeat your question?".to_string(),
            fallback_response:
                "I'm not sure I understand. Could you please tell me how I can help you today?"
                    .to_string(),
        }
    }
}
