use std::collections::BTreeMap;

use crate::models::{EntityType, Intent, PracticeConfig};
use crate::services::matcher::config::MatcherConfig;

/// Drafts the reply for a generic (non-FAQ) intent: the intent's base
/// template, personalized with practice data where it exists, then enhanced
/// with anything the entity extractors found. Drafting only — no booking or
/// lookup happens here.
pub fn generate(
    intent: Intent,
    entities: &BTreeMap<EntityType, String>,
    practice: &PracticeConfig,
    config: &MatcherConfig,
) -> String {
    let base = config
        .intents
        .iter()
        .find(|p| p.intent == intent)
        .map(|p| p.response.clone())
        .unwrap_or_else(|| config.fallback_response.clone());

    let mut response = personalize(intent, entities, practice).unwrap_or(base);
    enhance_with_entities(&mut response, intent, entities);
    response
}

/// Reply for transcripts that matched nothing, mentioning a few of the
/// practice's services when we know them.
pub fn unknown_response(practice: &PracticeConfig, config: &MatcherConfig) -> String {
    let base = &config.fallback_response;
    if practice.services.is_empty() {
        format!(
            "{base} I can assist with appointments, insurance questions, office hours, or other inquiries."
        )
    } else {
        let top: Vec<&str> = practice
            .services
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        format!(
            "{base} I can assist with appointments, {}, and other inquiries.",
            top.join(", ")
        )
    }
}

fn personalize(
    intent: Intent,
    entities: &BTreeMap<EntityType, String>,
    practice: &PracticeConfig,
) -> Option<String> {
    match intent {
        Intent::HoursInquiry if !practice.hours.is_empty() => {
            // A concrete weekday gets that day's hours; otherwise summarize
            // the whole week.
            if let Some(day) = entities.get(&EntityType::Day) {
                if let Some(intervals) = practice.hours_for_day(day) {
                    let day_name = capitalize(day);
                    return Some(format!(
                        "On {day_name} we're open {}. Would you like to come in then?",
                        intervals.join(" and ")
                    ));
                }
            }
            Some(format!(
                "Our office hours are {}. Is there a specific day you'd like to visit?",
                practice.hours_summary()
            ))
        }
        Intent::InsuranceInquiry if !practice.insurances.is_empty() => Some(format!(
            "We accept {} insurance plans. What insurance do you have?",
            join_list(&practice.insurances)
        )),
        Intent::ServicesInquiry if !practice.services.is_empty() => Some(format!(
            "We offer {}. What specific treatment are you interested in?",
            join_list(&practice.services)
        )),
        Intent::LocationInquiry => {
            let address = practice.location.address.as_deref()?;
            Some(format!(
                "We're located at {address}. Would you like detailed directions?"
            ))
        }
        _ => None,
    }
}

fn enhance_with_entities(
    response: &mut String,
    intent: Intent,
    entities: &BTreeMap<EntityType, String>,
) {
    if matches!(
        intent,
        Intent::AppointmentBooking | Intent::AppointmentReschedule
    ) {
        if let Some(day) = entities.get(&EntityType::Day) {
            let day = if day == "today" || day == "tomorrow" {
                day.clone()
            } else {
                capitalize(day)
            };
            response.push_str(&format!(" For {day}, let me check our availability."));
        }
        if let Some(time) = entities.get(&EntityType::Time) {
            response.push_str(&format!(" You mentioned {time}."));
        }
    }

    if intent == Intent::InsuranceInquiry {
        if let Some(provider) = entities.get(&EntityType::InsuranceName) {
            response.push_str(&format!(" I see you have {} insurance.", capitalize(provider)));
        }
    }

    if intent == Intent::ServicesInquiry {
        if let Some(service) = entities.get(&EntityType::ServiceName) {
            response.push_str(&format!(" You're asking about {service} services."));
        }
    }

    if intent == Intent::Emergency {
        if let Some(level) = entities.get(&EntityType::PainLevel) {
            response.push_str(&format!(" I understand you're experiencing {level} pain."));
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + chars.as_str(),
    }
}

/// "a", "a and b", or "a, b, and c".
fn join_list(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        2 => format!("{} and {}", items[0], items[1]),
        _ => {
            let head = &items[..items.len() - 1];
            format!("{}, and {}", head.join(", "), items[items.len() - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;

    fn practice() -> PracticeConfig {
        let mut hours = Map::new();
        hours.insert("mon".to_string(), vec!["9am to 5pm".to_string()]);
        hours.insert("fri".to_string(), vec!["9am to 3pm".to_string()]);
        PracticeConfig {
            id: "t1".to_string(),
            name: "Bright Smile Dental".to_string(),
            hours,
            insurances: vec!["Delta Dental".to_string(), "Aetna".to_string()],
            services: vec![
                "cleanings".to_string(),
                "fillings".to_string(),
                "crowns".to_string(),
            ],
            location: crate::models::PracticeLocation {
                address: Some("12 Main St".to_string()),
                parking: None,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_hours_with_day_entity() {
        let config = MatcherConfig::default();
        let mut entities = BTreeMap::new();
        entities.insert(EntityType::Day, "friday".to_string());
        let reply = generate(Intent::HoursInquiry, &entities, &practice(), &config);
        assert!(reply.contains("On Friday we're open 9am to 3pm"));
    }

    #[test]
    fn test_hours_without_day_summarizes_week() {
        let config = MatcherConfig::default();
        let reply = generate(Intent::HoursInquiry, &BTreeMap::new(), &practice(), &config);
        assert!(reply.contains("Monday 9am to 5pm"));
        assert!(reply.contains("Friday 9am to 3pm"));
    }

    #[test]
    fn test_insurance_list_join() {
        let config = MatcherConfig::default();
        let reply = generate(
            Intent::InsuranceInquiry,
            &BTreeMap::new(),
            &practice(),
            &config,
        );
        assert!(reply.contains("Delta Dental and Aetna"));
    }

    #[test]
    fn test_services_oxford_join() {
        let config = MatcherConfig::default();
        let reply = generate(
            Intent::ServicesInquiry,
            &BTreeMap::new(),
            &practice(),
            &config,
        );
        assert!(reply.contains("cleanings, fillings, and crowns"));
    }

    #[test]
    fn test_booking_echoes_day_and_time() {
        let config = MatcherConfig::default();
        let mut entities = BTreeMap::new();
        entities.insert(EntityType::Day, "tomorrow".to_string());
        entities.insert(EntityType::Time, "2:30 pm".to_string());
        let reply = generate(
            Intent::AppointmentBooking,
            &entities,
            &PracticeConfig::default(),
            &config,
        );
        assert!(reply.contains("For tomorrow, let me check our availability."));
        assert!(reply.contains("You mentioned 2:30 pm."));
    }

    #[test]
    fn test_unknown_mentions_services() {
        let config = MatcherConfig::default();
        let reply = unknown_response(&practice(), &config);
        assert!(reply.contains("cleanings, fillings, crowns"));

        let generic = unknown_response(&PracticeConfig::default(), &config);
        assert!(generic.contains("office hours"));
    }

    #[test]
    fn test_location_without_address_uses_base() {
        let config = MatcherConfig::default();
        let reply = generate(
            Intent::LocationInquiry,
            &BTreeMap::new(),
            &PracticeConfig::default(),
            &config,
        );
        assert!(reply.contains("conveniently located"));
    }
}
