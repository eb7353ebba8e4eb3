use std::collections::HashMap;

/// Canonicalizes transcript text before any matching: lowercase, drop
/// punctuation, collapse whitespace, expand domain abbreviations.
///
/// Punctuation is removed outright rather than replaced with a space, so
/// "What's" and "whats" normalize identically. Expansions only ever produce
/// words that are not themselves abbreviation keys, which keeps the whole
/// transform idempotent.
pub struct TextNormalizer {
    abbreviations: HashMap<String, String>,
}

impl TextNormalizer {
    pub fn new(abbreviations: HashMap<String, String>) -> Self {
        Self { abbreviations }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut cleaned = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if ch.is_alphanumeric() {
                // Lowercasing can expand to extra marks (İ yields a combining
                // dot); those are stripped here too, or a second pass would
                // produce a different string.
                cleaned.extend(ch.to_lowercase().filter(|c| c.is_alphanumeric()));
            } else if ch.is_whitespace() {
                cleaned.push(' ');
            }
        }

        cleaned
            .split_whitespace()
            .map(|token| {
                self.abbreviations
                    .get(token)
                    .map(String::as_str)
                    .unwrap_or(token)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matcher::config::MatcherConfig;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(MatcherConfig::default().abbreviations)
    }

    #[test]
    fn test_lowercase_and_punctuation() {
        let n = normalizer();
        assert_eq!(
            n.normalize("What's your HOURS??"),
            n.normalize("whats your hours")
        );
        assert_eq!(n.normalize("İstanbul"), "istanbul");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let n = normalizer();
        assert_eq!(n.normalize("  hello   there \t world "), "hello there world");
    }

    #[test]
    fn test_abbreviations_expanded() {
        let n = normalizer();
        assert_eq!(n.normalize("need an appt on fri"), "need an appointment on friday");
        assert_eq!(n.normalize("what are ur hrs"), "what are your hours");
    }

    #[test]
    fn test_idempotent() {
        let n = normalizer();
        for input in [
            "What's your HOURS??",
            "Book an appt for Mon at 2:30 PM!",
            "   ",
            "¿¡!?",
            "severe tooth pain!!!",
            // Dotted capital I lowercases to "i" plus a combining mark.
            "İstanbul ağrı",
        ] {
            let once = n.normalize(input);
            assert_eq!(n.normalize(&once), once);
        }
    }

    #[test]
    fn test_punctuation_only_becomes_empty() {
        let n = normalizer();
        assert_eq!(n.normalize("?!...,;:"), "");
        assert_eq!(n.normalize(""), "");
    }
}
