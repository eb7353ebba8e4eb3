use std::collections::BTreeMap;

use crate::models::{EntityType, PracticeConfig};
use crate::services::matcher::config::EntityPatterns;
use crate::services::matcher::normalizer::TextNormalizer;

/// Extracts typed entities from a normalized transcript. Every extractor is
/// independent; an absent pattern simply yields no entry. Insurer and service
/// matching consults the practice's own lists first and falls back to the
/// built-in tables when the practice has none.
pub fn extract_entities(
    normalized: &str,
    patterns: &EntityPatterns,
    practice: &PracticeConfig,
    normalizer: &TextNormalizer,
) -> BTreeMap<EntityType, String> {
    let mut entities = BTreeMap::new();

    if let Some(caps) = patterns.time.captures(normalized) {
        let hour = caps.get(1).map(|m| m.as_str()).unwrap_or("0");
        let minutes = caps.get(2).map(|m| m.as_str()).unwrap_or("00");
        let meridiem = caps.get(3).map(|m| m.as_str()).unwrap_or("am");
        entities.insert(EntityType::Time, format!("{hour}:{minutes} {meridiem}"));
    }

    if let Some(m) = patterns.day.find(normalized) {
        entities.insert(EntityType::Day, m.as_str().to_string());
    }

    if let Some(m) = patterns.date.find(normalized) {
        entities.insert(EntityType::Date, m.as_str().to_string());
    }

    if let Some(name) = match_known_name(normalized, &practice.insurances, normalizer)
        .or_else(|| match_fallback(normalized, &patterns.fallback_insurers))
    {
        entities.insert(EntityType::InsuranceName, name);
    }

    if let Some(name) = match_known_name(normalized, &practice.services, normalizer)
        .or_else(|| match_fallback(normalized, &patterns.fallback_services))
    {
        entities.insert(EntityType::ServiceName, name);
    }

    if patterns.pain_context.is_match(normalized) {
        if let Some(m) = patterns.pain_level.find(normalized) {
            entities.insert(EntityType::PainLevel, m.as_str().to_string());
        }
    }

    entities
}

/// Finds the first practice-configured name whose normalized form appears in
/// the transcript, returning it as the practice wrote it.
fn match_known_name(
    normalized: &str,
    names: &[String],
    normalizer: &TextNormalizer,
) -> Option<String> {
    let padded = format!(" {normalized} ");
    names.iter().find_map(|name| {
        let needle = normalizer.normalize(name);
        if !needle.is_empty() && padded.contains(&format!(" {needle} ")) {
            Some(name.clone())
        } else {
            None
        }
    })
}

fn match_fallback(normalized: &str, table: &[String]) -> Option<String> {
    let padded = format!(" {normalized} ");
    table
        .iter()
        .find(|name| padded.contains(&format!(" {name} ")))
        .cloned()
}
