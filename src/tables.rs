//! Scoring tables for the cessation calculator.
//!
//! Every heuristic constant the calculator uses lives here as data: the
//! success-probability adjustment brackets, the FTND questionnaire, the
//! cigarette price tiers and the health milestones. The calculator never
//! reaches for a global; callers hand it a [`ScoringTables`] value.
//!
//! [`ScoringTables::default`] carries the standard tables. A JSON file can
//! override any subset of fields, which lets the heuristics be revised
//! without touching calculator code.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::model::Motivation;

/// One bucket of a threshold table.
///
/// A value falls into the first bracket whose `below` bound it is strictly
/// less than. The last bracket usually leaves `below` unset to catch
/// everything above the previous bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    /// Exclusive upper bound, or `None` for the open-ended bucket.
    #[serde(default)]
    pub below: Option<f64>,

    /// Points added to the base success rate.
    pub points: i32,
}

impl Bracket {
    const fn new(below: f64, points: i32) -> Self {
        Self {
            below: Some(below),
            points,
        }
    }

    const fn open(points: i32) -> Self {
        Self { below: None, points }
    }
}

/// Look up the adjustment for `value` in an ordered bracket table.
///
/// Values matching no bracket (only possible with a table that has no
/// open-ended bucket) contribute 0.
pub fn bracket_points(brackets: &[Bracket], value: f64) -> i32 {
    brackets
        .iter()
        .find(|b| b.below.is_none_or(|limit| value < limit))
        .map(|b| b.points)
        .unwrap_or(0)
}

/// A selectable answer to an FTND question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtndAnswerOption {
    /// Wire value submitted by the client.
    pub value: String,
    pub label: String,
    pub points: u8,
}

/// A single FTND question and its scored answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtndQuestion {
    pub id: String,
    pub prompt: String,
    pub answers: Vec<FtndAnswerOption>,
}

impl FtndQuestion {
    /// Points for the given answer value, if it is one of this question's options.
    pub fn points_for(&self, value: &str) -> Option<u8> {
        self.answers
            .iter()
            .find(|a| a.value == value)
            .map(|a| a.points)
    }
}

/// A price band for a pack of cigarettes, in VND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub key: String,
    pub label: String,
    pub min_vnd: u32,
    pub max_vnd: u32,
    /// Price suggested to users who pick the tier rather than typing a price.
    pub typical_vnd: u32,
}

/// A physiological recovery milestone after the last cigarette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMilestone {
    /// Smoke-free days required, fractional for sub-day milestones.
    pub threshold_days: f64,
    pub label: String,
    pub description: String,
}

/// Consumption assumed when a user has no survey snapshot to compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressBaseline {
    pub cigarettes_per_day: u32,
    pub price_per_cigarette_vnd: f64,
}

/// The full set of tables driving the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringTables {
    pub cigarettes_per_pack: u32,
    pub base_success_rate: i32,
    pub success_floor: u8,
    pub success_ceiling: u8,
    pub age_adjustments: Vec<Bracket>,
    pub ftnd_adjustments: Vec<Bracket>,
    pub pack_year_adjustments: Vec<Bracket>,
    pub motivation_adjustments: BTreeMap<Motivation, i32>,
    pub ftnd_questions: Vec<FtndQuestion>,
    pub price_tiers: Vec<PriceTier>,
    pub health_milestones: Vec<HealthMilestone>,
    pub progress_baseline: ProgressBaseline,
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            cigarettes_per_pack: 20,
            base_success_rate: 30,
            success_floor: 5,
            success_ceiling: 95,
            age_adjustments: vec![
                Bracket::new(25.0, 20),
                Bracket::new(35.0, 15),
                Bracket::new(45.0, 10),
                Bracket::new(55.0, 5),
                Bracket::new(65.0, 0),
                Bracket::open(-10),
            ],
            ftnd_adjustments: vec![
                Bracket::new(3.0, 25),
                Bracket::new(5.0, 15),
                Bracket::new(7.0, 0),
                Bracket::new(8.0, -15),
                Bracket::open(-25),
            ],
            pack_year_adjustments: vec![
                Bracket::new(5.0, 10),
                Bracket::new(10.0, 5),
                Bracket::new(20.0, 0),
                Bracket::new(30.0, -5),
                Bracket::open(-10),
            ],
            motivation_adjustments: BTreeMap::from([
                (Motivation::VeryLow, -20),
                (Motivation::Low, -10),
                (Motivation::Medium, 5),
                (Motivation::High, 15),
                (Motivation::VeryHigh, 20),
            ]),
            ftnd_questions: default_ftnd_questions(),
            price_tiers: default_price_tiers(),
            health_milestones: default_health_milestones(),
            progress_baseline: ProgressBaseline {
                cigarettes_per_day: 10,
                price_per_cigarette_vnd: 1500.0,
            },
        }
    }
}

impl ScoringTables {
    /// Load tables from a JSON file. Fields absent from the file keep their
    /// default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scoring tables from {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("parsing scoring tables from {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Clamp a package price into the range covered by the price tiers.
    ///
    /// With no tiers configured the price passes through unchanged.
    pub fn bound_package_price(&self, price_vnd: u32) -> u32 {
        let min = self.price_tiers.iter().map(|t| t.min_vnd).min();
        let max = self.price_tiers.iter().map(|t| t.max_vnd).max();
        match (min, max) {
            (Some(min), Some(max)) if min <= max => price_vnd.clamp(min, max),
            _ => price_vnd,
        }
    }

    /// The tier a (bounded) package price falls into.
    pub fn price_tier_for(&self, price_vnd: u32) -> Option<&PriceTier> {
        let price = self.bound_package_price(price_vnd);
        self.price_tiers
            .iter()
            .find(|t| price >= t.min_vnd && price <= t.max_vnd)
    }

    /// Motivation adjustment; unknown or missing motivation is neutral.
    pub fn motivation_points(&self, motivation: Option<Motivation>) -> i32 {
        motivation
            .and_then(|m| self.motivation_adjustments.get(&m).copied())
            .unwrap_or(0)
    }
}

fn answer(value: &str, label: &str, points: u8) -> FtndAnswerOption {
    FtndAnswerOption {
        value: value.to_string(),
        label: label.to_string(),
        points,
    }
}

fn question(id: &str, prompt: &str, answers: Vec<FtndAnswerOption>) -> FtndQuestion {
    FtndQuestion {
        id: id.to_string(),
        prompt: prompt.to_string(),
        answers,
    }
}

fn default_ftnd_questions() -> Vec<FtndQuestion> {
    vec![
        question(
            "timeToFirstCigarette",
            "Bao lâu sau khi thức dậy bạn hút điếu thuốc đầu tiên?",
            vec![
                answer("within5Minutes", "Trong vòng 5 phút", 3),
                answer("6To30Minutes", "6 - 30 phút", 2),
                answer("31To60Minutes", "31 - 60 phút", 1),
                answer("after60Minutes", "Sau 60 phút", 0),
            ],
        ),
        question(
            "hardToRefrain",
            "Bạn có thấy khó nhịn hút thuốc ở những nơi bị cấm không?",
            vec![answer("yes", "Có", 1), answer("no", "Không", 0)],
        ),
        question(
            "hardestToGiveUp",
            "Điếu thuốc nào bạn thấy khó bỏ nhất?",
            vec![
                answer("firstInMorning", "Điếu đầu tiên buổi sáng", 1),
                answer("anyOther", "Bất kỳ điếu nào khác", 0),
            ],
        ),
        question(
            "cigarettesPerDay",
            "Mỗi ngày bạn hút bao nhiêu điếu thuốc?",
            vec![
                answer("10OrLess", "10 điếu trở xuống", 0),
                answer("11To20", "11 - 20 điếu", 1),
                answer("21To30", "21 - 30 điếu", 2),
                answer("31OrMore", "31 điếu trở lên", 3),
            ],
        ),
        question(
            "morningSmoking",
            "Bạn có hút nhiều hơn trong những giờ đầu sau khi thức dậy không?",
            vec![answer("yes", "Có", 1), answer("no", "Không", 0)],
        ),
        question(
            "smokeWhenIll",
            "Bạn có hút thuốc cả khi bị ốm phải nằm trên giường không?",
            vec![answer("yes", "Có", 1), answer("no", "Không", 0)],
        ),
    ]
}

fn tier(key: &str, label: &str, min_vnd: u32, max_vnd: u32, typical_vnd: u32) -> PriceTier {
    PriceTier {
        key: key.to_string(),
        label: label.to_string(),
        min_vnd,
        max_vnd,
        typical_vnd,
    }
}

fn default_price_tiers() -> Vec<PriceTier> {
    vec![
        tier("budget", "Bình dân", 5_000, 15_000, 10_000),
        tier("standard", "Phổ thông", 15_001, 30_000, 20_000),
        tier("premium", "Cao cấp", 30_001, 60_000, 40_000),
        tier("imported", "Nhập khẩu", 60_001, 150_000, 80_000),
    ]
}

fn milestone(threshold_days: f64, label: &str, description: &str) -> HealthMilestone {
    HealthMilestone {
        threshold_days,
        label: label.to_string(),
        description: description.to_string(),
    }
}

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;

fn default_health_milestones() -> Vec<HealthMilestone> {
    vec![
        milestone(
            20.0 / MINUTES_PER_DAY,
            "20 phút",
            "Nhịp tim và huyết áp bắt đầu trở về mức bình thường.",
        ),
        milestone(
            0.5,
            "12 giờ",
            "Lượng khí CO trong máu giảm về mức bình thường.",
        ),
        milestone(
            2.0,
            "2 ngày",
            "Các đầu dây thần kinh hồi phục, vị giác và khứu giác được cải thiện.",
        ),
        milestone(
            14.0,
            "2 tuần",
            "Tuần hoàn máu cải thiện và chức năng phổi tăng lên.",
        ),
        milestone(
            30.0,
            "1 tháng",
            "Ho và khó thở giảm, lông mao trong phổi bắt đầu hồi phục.",
        ),
        milestone(
            365.0,
            "1 năm",
            "Nguy cơ mắc bệnh mạch vành giảm còn một nửa so với người hút thuốc.",
        ),
        milestone(
            5.0 * 365.0,
            "5 năm",
            "Nguy cơ đột quỵ giảm xuống gần bằng người không hút thuốc.",
        ),
        milestone(
            10.0 * 365.0,
            "10 năm",
            "Nguy cơ tử vong do ung thư phổi giảm khoảng một nửa.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_points_boundaries() {
        let tables = ScoringTables::default();

        assert_eq!(bracket_points(&tables.age_adjustments, 24.0), 20);
        assert_eq!(bracket_points(&tables.age_adjustments, 25.0), 15);
        assert_eq!(bracket_points(&tables.age_adjustments, 64.0), 0);
        assert_eq!(bracket_points(&tables.age_adjustments, 65.0), -10);

        assert_eq!(bracket_points(&tables.ftnd_adjustments, 2.0), 25);
        assert_eq!(bracket_points(&tables.ftnd_adjustments, 7.0), -15);
        assert_eq!(bracket_points(&tables.ftnd_adjustments, 10.0), -25);

        assert_eq!(bracket_points(&tables.pack_year_adjustments, 4.99), 10);
        assert_eq!(bracket_points(&tables.pack_year_adjustments, 9.5), 5);
        assert_eq!(bracket_points(&tables.pack_year_adjustments, 30.0), -10);
    }

    #[test]
    fn test_bracket_points_without_open_bucket() {
        let brackets = vec![Bracket::new(10.0, 3)];
        assert_eq!(bracket_points(&brackets, 5.0), 3);
        assert_eq!(bracket_points(&brackets, 50.0), 0);
    }

    #[test]
    fn test_default_ftnd_maximum_is_ten() {
        let tables = ScoringTables::default();
        let max: u32 = tables
            .ftnd_questions
            .iter()
            .map(|q| q.answers.iter().map(|a| u32::from(a.points)).max().unwrap_or(0))
            .sum();

        assert_eq!(tables.ftnd_questions.len(), 6);
        assert_eq!(max, 10);
    }

    #[test]
    fn test_bound_package_price() {
        let tables = ScoringTables::default();

        assert_eq!(tables.bound_package_price(0), 5_000);
        assert_eq!(tables.bound_package_price(20_000), 20_000);
        assert_eq!(tables.bound_package_price(1_000_000), 150_000);
        assert_eq!(
            tables.price_tier_for(20_000).map(|t| t.key.as_str()),
            Some("standard")
        );
    }

    #[test]
    fn test_bound_package_price_without_tiers() {
        let tables = ScoringTables {
            price_tiers: vec![],
            ..ScoringTables::default()
        };
        assert_eq!(tables.bound_package_price(1), 1);
        assert!(tables.price_tier_for(1).is_none());
    }

    #[test]
    fn test_partial_json_override_keeps_defaults() {
        let tables = ScoringTables::from_json_str(
            r#"{ "baseSuccessRate": 40, "motivationAdjustments": { "very_high": 30 } }"#,
        )
        .unwrap();

        assert_eq!(tables.base_success_rate, 40);
        assert_eq!(tables.motivation_points(Some(Motivation::VeryHigh)), 30);
        assert_eq!(tables.motivation_points(Some(Motivation::Low)), 0);
        assert_eq!(tables.cigarettes_per_pack, 20);
        assert_eq!(tables.ftnd_questions.len(), 6);
    }

    #[test]
    fn test_health_milestones_are_ordered() {
        let tables = ScoringTables::default();
        let thresholds: Vec<f64> = tables
            .health_milestones
            .iter()
            .map(|m| m.threshold_days)
            .collect();

        assert!(thresholds.windows(2).all(|w| w[0] < w[1]));
    }
}
