//! Data models for Smokefree.
//!
//! All wire types use one canonical camelCase schema. Survey input is read
//! leniently: numbers of the wrong sign or shape, non-string motivations and
//! non-string FTND answers are accepted here and neutralised when the
//! profile is built, so a submission is never rejected for its values.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::tables::{FtndQuestion, PriceTier};

/// FTND answers keyed by question id, valued by the chosen answer value.
pub type FtndAnswers = BTreeMap<String, String>;

/// Self-reported motivation to quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motivation {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Motivation {
    /// Parse a wire value, returning `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "very_low" => Some(Motivation::VeryLow),
            "low" => Some(Motivation::Low),
            "medium" => Some(Motivation::Medium),
            "high" => Some(Motivation::High),
            "very_high" => Some(Motivation::VeryHigh),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Motivation::VeryLow => "very_low",
            Motivation::Low => "low",
            Motivation::Medium => "medium",
            Motivation::High => "high",
            Motivation::VeryHigh => "very_high",
        }
    }
}

/// Nicotine dependence level derived from the FTND score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddictionLevel {
    #[serde(rename = "Rất nhẹ")]
    VeryMild,
    #[serde(rename = "Nhẹ")]
    Mild,
    #[serde(rename = "Trung bình")]
    Moderate,
    #[serde(rename = "Nặng")]
    Severe,
    #[serde(rename = "Rất nặng")]
    VerySevere,
}

impl AddictionLevel {
    /// Classify an FTND score.
    ///
    /// # Thresholds
    ///
    /// - 0-2: `Rất nhẹ` (rank 1)
    /// - 3-4: `Nhẹ` (rank 2)
    /// - 5-6: `Trung bình` (rank 3)
    /// - 7: `Nặng` (rank 4)
    /// - 8-10: `Rất nặng` (rank 5)
    ///
    /// Scores above 10 are treated as 10.
    pub fn from_ftnd_score(score: u8) -> Self {
        match score {
            0..=2 => AddictionLevel::VeryMild,
            3..=4 => AddictionLevel::Mild,
            5..=6 => AddictionLevel::Moderate,
            7 => AddictionLevel::Severe,
            _ => AddictionLevel::VerySevere,
        }
    }

    /// Severity rank from 1 (very mild) to 5 (very severe).
    pub fn severity_rank(&self) -> u8 {
        match self {
            AddictionLevel::VeryMild => 1,
            AddictionLevel::Mild => 2,
            AddictionLevel::Moderate => 3,
            AddictionLevel::Severe => 4,
            AddictionLevel::VerySevere => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AddictionLevel::VeryMild => "Rất nhẹ",
            AddictionLevel::Mild => "Nhẹ",
            AddictionLevel::Moderate => "Trung bình",
            AddictionLevel::Severe => "Nặng",
            AddictionLevel::VerySevere => "Rất nặng",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            AddictionLevel::VeryMild,
            AddictionLevel::Mild,
            AddictionLevel::Moderate,
            AddictionLevel::Severe,
            AddictionLevel::VerySevere,
        ]
        .into_iter()
        .find(|level| level.label() == label)
    }
}

/// Calculator input: a user's smoking history as declared in the survey.
///
/// Built from a [`SurveySubmission`] by [`SmokingProfile::from_submission`],
/// which applies the clamping rules so every field here is already in range.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokingProfile {
    pub cigarettes_per_day: u32,
    pub years_smoked: f64,
    pub age: u32,
    pub motivation: Option<Motivation>,
    pub package_price_vnd: u32,
    pub ftnd_answers: FtndAnswers,
}

/// Request body for POST /survey/:user_id.
///
/// Numeric fields hold whatever number the client sent (strings holding a
/// number are accepted too; anything else reads as 0). Clamping to valid
/// ranges happens in [`SmokingProfile::from_submission`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySubmission {
    #[serde(default, deserialize_with = "lenient_number")]
    pub cigarettes_per_day: f64,

    #[serde(default, deserialize_with = "lenient_number")]
    pub years_smoked: f64,

    #[serde(default, deserialize_with = "lenient_number")]
    pub age: f64,

    /// One of very_low, low, medium, high, very_high. Other values, including
    /// non-strings, score neutrally.
    #[serde(default)]
    pub motivation: Value,

    #[serde(default, deserialize_with = "lenient_number")]
    pub package_price_vnd: f64,

    #[serde(default, deserialize_with = "lenient_answers")]
    pub ftnd_answers: FtndAnswers,
}

/// Read any JSON value as a number, treating non-numbers as 0.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// Keep only string-valued answers; anything else counts as unanswered.
fn lenient_answers<'de, D>(deserializer: D) -> Result<FtndAnswers, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(id, answer)| match answer {
                Value::String(s) => Some((id, s)),
                _ => None,
            })
            .collect(),
        _ => FtndAnswers::new(),
    })
}

/// Projected savings in VND if the user stops smoking entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Savings {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
    pub quarterly: f64,
    pub yearly: f64,
}

/// The metrics snapshot computed once per survey submission.
///
/// Stored as-is and redisplayed by every read view. A newer submission
/// replaces it rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CessationMetrics {
    pub pack_year: f64,
    pub ftnd_score: u8,
    pub addiction_level: AddictionLevel,
    pub severity_rank: u8,
    /// Heuristic quit-success estimate, always within [5, 95].
    pub success_probability: u8,
    pub savings: Savings,
    pub submitted_at: DateTime<Utc>,
}

/// A stored survey: the (clamped) answers plus the metrics computed from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyRecord {
    pub user_id: String,
    pub cigarettes_per_day: u32,
    pub years_smoked: f64,
    pub age: u32,
    pub motivation: Option<Motivation>,
    pub package_price_vnd: u32,
    /// Key of the price tier the package price falls into.
    pub price_tier: Option<String>,
    pub ftnd_answers: FtndAnswers,
    pub metrics: CessationMetrics,
}

/// One day of the progress log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub date: NaiveDate,
    pub cigarettes_smoked: u32,
    /// Self-rated craving, 1 (none) to 10 (overwhelming).
    pub craving_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ProgressEntry {
    pub fn is_smoke_free(&self) -> bool {
        self.cigarettes_smoked == 0
    }
}

/// Request body for POST /progress/:user_id.
///
/// The date defaults to today (UTC) when omitted. Counts are read like
/// survey numbers; the craving level is range-checked by the handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntryRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub cigarettes_smoked: f64,

    #[serde(default, deserialize_with = "lenient_number")]
    pub craving_level: f64,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Query parameters for GET /progress/:user_id.
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Query parameters for GET /health-timeline.
#[derive(Debug, Deserialize)]
pub struct HealthTimelineQuery {
    #[serde(default)]
    pub days: f64,
}

/// A health milestone annotated with whether the user has reached it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMilestoneStatus {
    pub threshold_days: f64,
    pub label: String,
    pub description: String,
    pub achieved: bool,
}

/// Response for GET /health-timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthTimelineResponse {
    pub smoke_free_days: f64,
    pub milestones: Vec<HealthMilestoneStatus>,
}

/// Which consumption baseline the progress money figure was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSource {
    /// The user's own survey snapshot.
    Survey,
    /// The configured fallback for users without a survey.
    Fallback,
}

/// Progress dashboard figures derived from the daily log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_days_logged: u32,
    pub smoke_free_days: u32,
    pub smoke_free_percentage: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub cigarettes_avoided: u64,
    pub money_saved_vnd: f64,
    pub baseline_source: BaselineSource,
    pub average_craving: Option<f64>,
    pub achievement_score: u32,
    pub health_timeline: Vec<HealthMilestoneStatus>,
}

/// Response for GET /survey/questions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestionsResponse {
    pub ftnd_questions: Vec<FtndQuestion>,
    pub price_tiers: Vec<PriceTier>,
}

/// Response for GET /coach/members/:user_id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachMemberView {
    pub user_id: String,
    pub survey: Option<SurveyRecord>,
    pub progress: ProgressSummary,
    pub recent_entries: Vec<ProgressEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addiction_level_thresholds() {
        let expected = [
            (0, AddictionLevel::VeryMild, 1),
            (2, AddictionLevel::VeryMild, 1),
            (3, AddictionLevel::Mild, 2),
            (4, AddictionLevel::Mild, 2),
            (5, AddictionLevel::Moderate, 3),
            (6, AddictionLevel::Moderate, 3),
            (7, AddictionLevel::Severe, 4),
            (8, AddictionLevel::VerySevere, 5),
            (10, AddictionLevel::VerySevere, 5),
        ];

        for (score, level, rank) in expected {
            let classified = AddictionLevel::from_ftnd_score(score);
            assert_eq!(classified, level, "score {score}");
            assert_eq!(classified.severity_rank(), rank, "score {score}");
        }
    }

    #[test]
    fn test_addiction_level_serializes_to_label() {
        let json = serde_json::to_value(AddictionLevel::Moderate).unwrap();
        assert_eq!(json, "Trung bình");
        assert_eq!(
            AddictionLevel::from_label("Rất nặng"),
            Some(AddictionLevel::VerySevere)
        );
        assert_eq!(AddictionLevel::from_label("unknown"), None);
    }

    #[test]
    fn test_motivation_parse_is_lenient() {
        assert_eq!(Motivation::parse("very_high"), Some(Motivation::VeryHigh));
        assert_eq!(Motivation::parse(" low "), Some(Motivation::Low));
        assert_eq!(Motivation::parse("extreme"), None);
        assert_eq!(Motivation::parse(""), None);
    }

    #[test]
    fn test_survey_submission_defaults_missing_fields() {
        let submission: SurveySubmission =
            serde_json::from_str(r#"{ "cigarettesPerDay": 12 }"#).unwrap();

        assert_eq!(submission.cigarettes_per_day, 12.0);
        assert_eq!(submission.years_smoked, 0.0);
        assert!(submission.motivation.is_null());
        assert!(submission.ftnd_answers.is_empty());
    }

    #[test]
    fn test_survey_submission_reads_bad_values_leniently() {
        let submission: SurveySubmission = serde_json::from_str(
            r#"{
                "cigarettesPerDay": -2,
                "yearsSmoked": null,
                "age": "41",
                "motivation": 5,
                "packagePriceVnd": "cheap",
                "ftndAnswers": { "hardToRefrain": "yes", "smokeWhenIll": true }
            }"#,
        )
        .unwrap();

        assert_eq!(submission.cigarettes_per_day, -2.0);
        assert_eq!(submission.years_smoked, 0.0);
        assert_eq!(submission.age, 41.0);
        assert_eq!(submission.motivation, serde_json::json!(5));
        assert_eq!(submission.package_price_vnd, 0.0);
        assert_eq!(submission.ftnd_answers.len(), 1);
        assert_eq!(
            submission.ftnd_answers.get("hardToRefrain").map(String::as_str),
            Some("yes")
        );
    }

    #[test]
    fn test_progress_request_reads_numbers_leniently() {
        let request: ProgressEntryRequest =
            serde_json::from_str(r#"{ "cigarettesSmoked": -1, "cravingLevel": "4" }"#).unwrap();

        assert_eq!(request.cigarettes_smoked, -1.0);
        assert_eq!(request.craving_level, 4.0);
        assert!(request.date.is_none());
    }
}
