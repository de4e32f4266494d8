//! Mapping from legacy survey records to the canonical schema.
//!
//! Older clients stored surveys with PascalCase field names, a flat set of
//! FTND answer fields and PascalCase motivation values. The canonical
//! routes never read those names; legacy payloads go through the explicit
//! import route, which converts them here once.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{FtndAnswers, SurveySubmission, lenient_number};

/// A survey record in the legacy PascalCase layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacySurveyRecord {
    #[serde(deserialize_with = "lenient_number")]
    pub cigarettes_per_day: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub smoking_years: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub age: f64,
    /// e.g. "VeryHigh", "Medium".
    pub motivation: String,
    #[serde(deserialize_with = "lenient_number")]
    pub pack_price: f64,
    pub time_to_first_cigarette: Option<String>,
    pub hard_to_refrain: Option<String>,
    pub hardest_to_give_up: Option<String>,
    pub ftnd_cigarettes_per_day: Option<String>,
    pub morning_smoking: Option<String>,
    pub smoke_when_ill: Option<String>,
}

impl From<LegacySurveyRecord> for SurveySubmission {
    fn from(legacy: LegacySurveyRecord) -> Self {
        let ftnd_fields = [
            ("timeToFirstCigarette", legacy.time_to_first_cigarette),
            ("hardToRefrain", legacy.hard_to_refrain),
            ("hardestToGiveUp", legacy.hardest_to_give_up),
            ("cigarettesPerDay", legacy.ftnd_cigarettes_per_day),
            ("morningSmoking", legacy.morning_smoking),
            ("smokeWhenIll", legacy.smoke_when_ill),
        ];

        let ftnd_answers: FtndAnswers = ftnd_fields
            .into_iter()
            .filter_map(|(id, value)| value.map(|v| (id.to_string(), v)))
            .collect();

        SurveySubmission {
            cigarettes_per_day: legacy.cigarettes_per_day,
            years_smoked: legacy.smoking_years,
            age: legacy.age,
            motivation: Value::String(normalize_motivation(&legacy.motivation)),
            package_price_vnd: legacy.pack_price,
            ftnd_answers,
        }
    }
}

/// Convert a PascalCase or spaced motivation value to its snake_case form.
///
/// "VeryHigh", "Very High" and "very_high" all become "very_high".
pub fn normalize_motivation(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);

    for ch in value.trim().chars() {
        if ch == ' ' || ch == '-' || ch == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else if ch.is_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }

    out
}
