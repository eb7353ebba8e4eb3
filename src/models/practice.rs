use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PracticeLocation {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub parking: Option<String>,
}

/// Per-tenant configuration fetched fresh for every call. FAQ keys are
/// practice-authored free text; the matcher normalizes them itself.
/// Missing or malformed collections are treated as empty, never as a fault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Weekday ("mon".."sun" or full names) to open-interval strings.
    #[serde(default)]
    pub hours: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub insurances: Vec<String>,
    #[serde(default)]
    pub faq: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub location: PracticeLocation,
}

const DAY_ORDER: [(&str, &str); 7] = [
    ("mon", "Monday"),
    ("tue", "Tuesday"),
    ("wed", "Wednesday"),
    ("thu", "Thursday"),
    ("fri", "Friday"),
    ("sat", "Saturday"),
    ("sun", "Sunday"),
];

impl PracticeConfig {
    /// Open intervals for a weekday given by full name, e.g. "friday".
    /// Hours keys may be abbreviated or full, in any case.
    pub fn hours_for_day(&self, day: &str) -> Option<&Vec<String>> {
        let want = day.to_lowercase();
        self.hours.iter().find_map(|(key, intervals)| {
            let k = key.to_lowercase();
            if want.starts_with(&k) || k.starts_with(&want) {
                Some(intervals)
            } else {
                None
            }
        })
    }

    /// Weekly hours in a speakable form, Monday through Sunday.
    pub fn hours_summary(&self) -> String {
        let mut parts = vec![];
        for (abbr, full) in DAY_ORDER {
            if let Some(intervals) = self.hours_for_day(abbr) {
                if let Some(first) = intervals.first() {
                    parts.push(format!("{full} {first}"));
                }
            }
        }
        if parts.is_empty() {
            "available upon request".to_string()
        } else {
            parts.join(", ")
        }
    }
}
