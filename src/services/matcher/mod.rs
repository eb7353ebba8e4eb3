pub mod config;
pub mod entities;
pub mod normalizer;
pub mod responses;

use std::collections::HashSet;

use crate::models::{Intent, IntentResult, PracticeConfig};

pub use config::{MatcherConfig, Thresholds};
use normalizer::TextNormalizer;

/// FAQ matching and intent recognition for dental practice calls.
///
/// `analyze` is a pure function of the transcript and the practice config:
/// no I/O, no shared mutable state, safe to call from any number of in-flight
/// requests. It never fails — unmatched or malformed input degrades to the
/// unknown intent at confidence 0.0 instead of erroring.
pub struct DentalMatcher {
    config: MatcherConfig,
    normalizer: TextNormalizer,
}

struct FaqEntry<'a> {
    normalized: String,
    question: &'a str,
    answer: &'a str,
}

impl DentalMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        let normalizer = TextNormalizer::new(config.abbreviations.clone());
        Self { config, normalizer }
    }

    pub fn with_defaults() -> Self {
        Self::new(MatcherConfig::default())
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Classifies a transcript against the practice's FAQ set and the generic
    /// intent taxonomy. The FAQ cascade runs first (exact, substring, keyword
    /// overlap, lexical similarity); only when no FAQ key qualifies does the
    /// generic classification run. Entity extraction happens regardless of
    /// which path produces the result.
    pub fn analyze(&self, transcript: &str, practice: &PracticeConfig) -> IntentResult {
        let normalized = self.normalizer.normalize(transcript);
        if normalized.is_empty() {
            return IntentResult::unknown(self.config.empty_transcript_response.clone());
        }

        let extracted = entities::extract_entities(
            &normalized,
            &self.config.entities,
            practice,
            &self.normalizer,
        );

        if let Some(mut result) = self.match_faq(&normalized, practice) {
            result.extracted_entities = extracted;
            return result;
        }

        let mut best: Option<(f64, Intent, Vec<String>)> = None;
        for pattern in &self.config.intents {
            let (score, matched) = score_intent(&normalized, pattern);
            // Strictly-greater keeps the earlier table entry on ties; the
            // table is ordered emergency > appointment intents > informational.
            if score > best.as_ref().map(|(s, _, _)| *s).unwrap_or(0.0) {
                best = Some((score, pattern.intent, matched));
            }
        }

        match best {
            Some((score, intent, matched)) if score >= self.config.thresholds.unknown_floor => {
                IntentResult {
                    intent,
                    confidence: score,
                    matched_keywords: matched,
                    suggested_response: responses::generate(
                        intent,
                        &extracted,
                        practice,
                        &self.config,
                    ),
                    extracted_entities: extracted,
                    tenant_specific: false,
                    faq_matched: None,
                }
            }
            _ => {
                let mut result =
                    IntentResult::unknown(responses::unknown_response(practice, &self.config));
                result.extracted_entities = extracted;
                result
            }
        }
    }

    fn match_faq(&self, normalized: &str, practice: &PracticeConfig) -> Option<IntentResult> {
        let entries: Vec<FaqEntry> = practice
            .faq
            .iter()
            .filter_map(|(question, answer)| {
                let n = self.normalizer.normalize(question);
                if n.is_empty() {
                    None
                } else {
                    Some(FaqEntry {
                        normalized: n,
                        question,
                        answer,
                    })
                }
            })
            .collect();
        if entries.is_empty() {
            return None;
        }
        let thresholds = &self.config.thresholds;

        // Stage 1: exact match on normalized text.
        if let Some(entry) = entries.iter().find(|e| e.normalized == normalized) {
            return Some(faq_result(entry, 1.0, vec![]));
        }

        // Stage 2: containment either direction; the longest (most specific)
        // key wins. Keys shorter than four characters are too ambiguous to
        // match by containment.
        if let Some(entry) = entries
            .iter()
            .filter(|e| {
                e.normalized.len() >= 4
                    && (normalized.contains(&e.normalized) || e.normalized.contains(normalized))
            })
            .max_by_key(|e| e.normalized.len())
        {
            return Some(faq_result(entry, thresholds.substring, vec![]));
        }

        let tokens: Vec<&str> = normalized.split(' ').collect();
        let transcript_words: HashSet<&str> = tokens.iter().copied().collect();

        // Stage 3: keyword overlap relative to the transcript's word set.
        let mut best: Option<(f64, &FaqEntry, Vec<String>)> = None;
        for entry in &entries {
            let key_words: HashSet<&str> = entry.normalized.split(' ').collect();
            let common = common_words(&tokens, &key_words);
            let ratio = common.len() as f64 / transcript_words.len() as f64;
            if is_better(ratio, entry, &best) {
                best = Some((ratio, entry, common));
            }
        }
        if let Some((ratio, entry, common)) = &best {
            if *ratio >= thresholds.keyword_overlap {
                return Some(faq_result(entry, thresholds.keyword_overlap, common.clone()));
            }
        }

        // Stage 4: Jaccard similarity over token sets. Deliberately a lexical
        // measure, not an embedding model — the documented thresholds are
        // calibrated for it.
        let mut best: Option<(f64, &FaqEntry, Vec<String>)> = None;
        for entry in &entries {
            let key_words: HashSet<&str> = entry.normalized.split(' ').collect();
            let common = common_words(&tokens, &key_words);
            let union = transcript_words.union(&key_words).count();
            let similarity = if union == 0 {
                0.0
            } else {
                common.len() as f64 / union as f64
            };
            if is_better(similarity, entry, &best) {
                best = Some((similarity, entry, common));
            }
        }
        if let Some((similarity, entry, common)) = &best {
            if *similarity >= thresholds.semantic {
                return Some(faq_result(entry, thresholds.semantic, common.clone()));
            }
        }

        None
    }
}

/// Words shared with the key, in transcript order, deduplicated.
fn common_words(tokens: &[&str], key_words: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .iter()
        .filter(|w| key_words.contains(**w) && seen.insert(**w))
        .map(|w| w.to_string())
        .collect()
}

/// Higher score wins; equal scores go to the longer (more specific) key.
fn is_better(score: f64, entry: &FaqEntry, best: &Option<(f64, &FaqEntry, Vec<String>)>) -> bool {
    match best {
        None => score > 0.0,
        Some((best_score, best_entry, _)) => {
            score > *best_score + 1e-9
                || ((score - *best_score).abs() <= 1e-9
                    && entry.normalized.len() > best_entry.normalized.len())
        }
    }
}

fn faq_result(entry: &FaqEntry, confidence: f64, matched_keywords: Vec<String>) -> IntentResult {
    IntentResult {
        intent: Intent::GeneralFaq,
        confidence,
        matched_keywords,
        extracted_entities: Default::default(),
        suggested_response: entry.answer.to_string(),
        tenant_specific: true,
        faq_matched: Some(entry.question.to_string()),
    }
}

fn score_intent(normalized: &str, pattern: &config::IntentPattern) -> (f64, Vec<String>) {
    let padded = format!(" {normalized} ");
    let matched: Vec<String> = pattern
        .keywords
        .iter()
        .filter(|kw| padded.contains(&format!(" {kw} ")))
        .cloned()
        .collect();

    let mut score = if matched.is_empty() {
        0.0
    } else {
        (0.3 + 0.15 * matched.len() as f64).min(0.75)
    };

    if pattern.patterns.iter().any(|re| re.is_match(normalized)) {
        score = score.max(0.8);
    }

    // False negatives here are safety-critical, so any emergency signal is
    // pushed toward the top of the confidence range.
    if score > 0.0 && pattern.intent == Intent::Emergency {
        score = score.max(0.9);
    }

    (score, matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;
    use std::collections::BTreeMap;

    fn matcher() -> DentalMatcher {
        DentalMatcher::with_defaults()
    }

    fn practice_with_faq(pairs: &[(&str, &str)]) -> PracticeConfig {
        let faq: BTreeMap<String, String> = pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect();
        PracticeConfig {
            id: "t1".to_string(),
            name: "Bright Smile Dental".to_string(),
            faq,
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_faq_self_consistency() {
        let m = matcher();
        let practice = practice_with_faq(&[
            ("Do you do teeth whitening?", "Yes, we offer professional whitening."),
            ("What insurances do you accept?", "We accept Delta Dental and Aetna."),
        ]);

        for question in practice.faq.keys() {
            let result = m.analyze(question, &practice);
            assert_eq!(result.confidence, 1.0, "key: {question}");
            assert_eq!(result.faq_matched.as_deref(), Some(question.as_str()));
            assert!(result.tenant_specific);
            assert_eq!(result.intent, Intent::GeneralFaq);
        }
    }

    #[test]
    fn test_friday_hours_end_to_end() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "what are your friday hours",
            "We are open 9am to 3pm on Friday.",
        )]);

        let result = m.analyze("What are your Friday hours?", &practice);
        assert_eq!(result.intent, Intent::GeneralFaq);
        assert_eq!(result.confidence, 1.0);
        assert!(result.tenant_specific);
        assert_eq!(result.suggested_response, "We are open 9am to 3pm on Friday.");
    }

    #[test]
    fn test_substring_match() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "Do you do teeth whitening?",
            "Yes, we offer professional whitening.",
        )]);

        let result = m.analyze("Hey, do you do teeth whitening at your office?", &practice);
        assert_eq!(result.confidence, 0.85);
        assert!(result.tenant_specific);
        assert_eq!(
            result.faq_matched.as_deref(),
            Some("Do you do teeth whitening?")
        );
    }

    #[test]
    fn test_substring_prefers_longest_key() {
        let m = matcher();
        let practice = practice_with_faq(&[
            ("teeth whitening", "Short answer."),
            ("do you do teeth whitening", "Long answer."),
        ]);

        let result = m.analyze("hey do you do teeth whitening today", &practice);
        assert_eq!(result.suggested_response, "Long answer.");
    }

    #[test]
    fn test_keyword_overlap_match() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "What insurances do you accept?",
            "We accept Delta Dental and Aetna.",
        )]);

        // 4 of 5 transcript words appear in the key; neither string contains
        // the other.
        let result = m.analyze("what insurances do you take", &practice);
        assert_eq!(result.confidence, 0.75);
        assert!(result.tenant_specific);
        assert!(result
            .matched_keywords
            .contains(&"insurances".to_string()));
    }

    #[test]
    fn test_semantic_similarity_match() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "insurance plans do you accept",
            "We accept most major plans.",
        )]);

        // Shares all five key words across seven transcript words, not
        // contiguously: Jaccard 5/7 ≈ 0.714, keyword ratio 5/7 < 0.75.
        let result = m.analyze("do you currently accept my insurance plans", &practice);
        assert_eq!(result.confidence, 0.70);
        assert!(result.tenant_specific);
    }

    #[test]
    fn test_stage_confidence_ordering() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "do you do teeth whitening",
            "Yes, we offer professional whitening.",
        )]);

        let exact = m.analyze("do you do teeth whitening", &practice);
        let substring = m.analyze("hey do you do teeth whitening for me", &practice);
        assert!(exact.confidence > substring.confidence);
        assert!(substring.confidence > m.config.thresholds.keyword_overlap);
        assert!(m.config.thresholds.keyword_overlap > m.config.thresholds.semantic);
    }

    #[test]
    fn test_empty_transcript() {
        let m = matcher();
        let result = m.analyze("", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.tenant_specific);
        assert!(!result.suggested_response.is_empty());
    }

    #[test]
    fn test_punctuation_only_transcript() {
        let m = matcher();
        let result = m.analyze("?!... ¿¡", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_gibberish_is_unknown() {
        let m = matcher();
        let result = m.analyze("xyzzy plugh", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::Unknown);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_cancel_with_day_entity() {
        let m = matcher();
        let result = m.analyze(
            "I need to cancel my appointment for tomorrow",
            &PracticeConfig::default(),
        );
        assert_eq!(result.intent, Intent::AppointmentCancel);
        assert!(result.confidence > 0.3 && result.confidence < 1.0);
        assert_eq!(
            result.extracted_entities.get(&EntityType::Day).unwrap(),
            "tomorrow"
        );
        assert!(!result.tenant_specific);
    }

    #[test]
    fn test_emergency_confidence_boost() {
        let m = matcher();
        let result = m.analyze("I have severe tooth pain", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::Emergency);
        assert!(result.confidence >= 0.8);
        assert_eq!(
            result.extracted_entities.get(&EntityType::PainLevel).unwrap(),
            "severe"
        );
    }

    #[test]
    fn test_emergency_outranks_hours_on_shared_words() {
        let m = matcher();
        // "what time" also hits the hours intent, but the emergency signal
        // must win.
        let result = m.analyze(
            "I have severe pain, what time is it",
            &PracticeConfig::default(),
        );
        assert_eq!(result.intent, Intent::Emergency);
        assert_eq!(
            result.extracted_entities.get(&EntityType::PainLevel).unwrap(),
            "severe"
        );
    }

    #[test]
    fn test_booking_intent() {
        let m = matcher();
        let result = m.analyze(
            "I'd like to book an appointment for Friday at 2:30 pm",
            &PracticeConfig::default(),
        );
        assert_eq!(result.intent, Intent::AppointmentBooking);
        assert!(result.confidence >= 0.8);
        assert_eq!(
            result.extracted_entities.get(&EntityType::Day).unwrap(),
            "friday"
        );
        assert_eq!(
            result.extracted_entities.get(&EntityType::Time).unwrap(),
            "2:30 pm"
        );
    }

    #[test]
    fn test_hours_intent_generic() {
        let m = matcher();
        let result = m.analyze("what time do you open", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::HoursInquiry);
        assert!(!result.tenant_specific);
    }

    #[test]
    fn test_entities_present_on_faq_match() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "what are your friday hours",
            "We are open 9am to 3pm on Friday.",
        )]);
        let result = m.analyze("what are your friday hours", &practice);
        assert_eq!(
            result.extracted_entities.get(&EntityType::Day).unwrap(),
            "friday"
        );
    }

    #[test]
    fn test_abbreviated_transcript_matches_faq() {
        let m = matcher();
        let practice = practice_with_faq(&[(
            "what are your friday hours",
            "We are open 9am to 3pm on Friday.",
        )]);
        let result = m.analyze("what r ur fri hrs", &practice);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_malformed_practice_treated_as_empty() {
        let m = matcher();
        // Default config: no faq, no services, no hours. Must degrade, not
        // fail.
        let result = m.analyze("do you take my insurance", &PracticeConfig::default());
        assert_eq!(result.intent, Intent::InsuranceInquiry);
        assert!(!result.tenant_specific);
    }
}
