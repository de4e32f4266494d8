//! The cessation metrics calculator.
//!
//! Pure functions from a [`SmokingProfile`] to the derived metrics shown on
//! the results dashboard, the coach view and the progress tracker. Nothing
//! here performs I/O or fails: out-of-range inputs are clamped and unknown
//! answers score as zero, so every call produces a number.
//!
//! All heuristic constants come from the [`ScoringTables`] argument.

use chrono::{DateTime, Utc};

use crate::model::{
    AddictionLevel, CessationMetrics, FtndAnswers, HealthMilestoneStatus, Motivation, Savings,
    SmokingProfile, SurveySubmission,
};
use crate::tables::{ScoringTables, bracket_points};

/// Cigarettes in a pack for pack-year purposes.
const PACK_YEAR_CIGARETTES: f64 = 20.0;

/// Highest possible FTND total.
pub const MAX_FTND_SCORE: u8 = 10;

// Achievement score term caps.
const ACHIEVEMENT_DAYS_CAP: f64 = 40.0;
const ACHIEVEMENT_STREAK_CAP: f64 = 30.0;
const ACHIEVEMENT_PERCENTAGE_WEIGHT: f64 = 20.0;
const ACHIEVEMENT_MONEY_CAP: f64 = 10.0;
const ACHIEVEMENT_MONEY_UNIT_VND: f64 = 100_000.0;

impl SmokingProfile {
    /// Build a calculator profile from raw survey answers.
    ///
    /// Negative or non-finite numbers become 0 and counts are rounded to
    /// whole numbers. The package price is then bounded by the price-tier
    /// table, and a missing, unrecognized or non-string motivation becomes
    /// `None`.
    pub fn from_submission(submission: &SurveySubmission, tables: &ScoringTables) -> Self {
        Self {
            cigarettes_per_day: to_count(submission.cigarettes_per_day),
            years_smoked: non_negative(submission.years_smoked),
            age: to_count(submission.age),
            motivation: submission.motivation.as_str().and_then(Motivation::parse),
            package_price_vnd: tables.bound_package_price(to_count(submission.package_price_vnd)),
            ftnd_answers: submission.ftnd_answers.clone(),
        }
    }
}

/// `value` if it is finite and positive, otherwise 0.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Round a client-supplied number to a whole count, saturating at 0 and
/// `u32::MAX`.
pub fn to_count(value: f64) -> u32 {
    // Float-to-int `as` saturates.
    non_negative(value).round() as u32
}

/// Pack-years of exposure: `(cigarettes_per_day / 20) * years_smoked`.
pub fn compute_pack_year(cigarettes_per_day: u32, years_smoked: f64) -> f64 {
    f64::from(cigarettes_per_day) / PACK_YEAR_CIGARETTES * non_negative(years_smoked)
}

/// Sum the FTND points for the given answers.
///
/// Unanswered questions and answer values not in the question table
/// contribute 0. The total never exceeds [`MAX_FTND_SCORE`].
pub fn compute_ftnd_score(tables: &ScoringTables, answers: &FtndAnswers) -> u8 {
    let total: u32 = tables
        .ftnd_questions
        .iter()
        .filter_map(|q| answers.get(&q.id).and_then(|value| q.points_for(value)))
        .map(u32::from)
        .sum();

    total.min(u32::from(MAX_FTND_SCORE)) as u8
}

/// Classify an FTND score into an addiction level.
pub fn classify_addiction_level(ftnd_score: u8) -> AddictionLevel {
    AddictionLevel::from_ftnd_score(ftnd_score)
}

/// Heuristic probability (in percent) that the user quits successfully.
///
/// Starts from the base rate and adds the age, FTND, pack-year and
/// motivation adjustments. The result is rounded and clamped to the
/// configured floor and ceiling (5 and 95 by default).
pub fn compute_success_probability(
    tables: &ScoringTables,
    profile: &SmokingProfile,
    pack_year: f64,
    ftnd_score: u8,
) -> u8 {
    let adjustments = bracket_points(&tables.age_adjustments, f64::from(profile.age))
        + bracket_points(&tables.ftnd_adjustments, f64::from(ftnd_score))
        + bracket_points(&tables.pack_year_adjustments, non_negative(pack_year))
        + tables.motivation_points(profile.motivation);

    let raw = f64::from(tables.base_success_rate + adjustments).round();
    let floor = f64::from(tables.success_floor);
    let ceiling = f64::from(tables.success_ceiling).max(floor);

    raw.clamp(floor, ceiling) as u8
}

/// Money saved by not smoking, per period. Values are not rounded.
pub fn compute_savings(
    tables: &ScoringTables,
    cigarettes_per_day: u32,
    package_price_vnd: u32,
) -> Savings {
    let per_pack = f64::from(tables.cigarettes_per_pack.max(1));
    let packs_per_day = f64::from(cigarettes_per_day) / per_pack;
    let daily = packs_per_day * f64::from(package_price_vnd);

    Savings {
        daily,
        weekly: daily * 7.0,
        monthly: daily * 30.0,
        quarterly: daily * 90.0,
        yearly: daily * 365.0,
    }
}

/// Annotate the health milestones with whether `smoke_free_days` reaches them.
pub fn build_health_timeline(
    tables: &ScoringTables,
    smoke_free_days: f64,
) -> Vec<HealthMilestoneStatus> {
    let days = non_negative(smoke_free_days);

    tables
        .health_milestones
        .iter()
        .map(|m| HealthMilestoneStatus {
            threshold_days: m.threshold_days,
            label: m.label.clone(),
            description: m.description.clone(),
            achieved: days >= m.threshold_days,
        })
        .collect()
}

/// Composite progress score in [0, 100].
///
/// # Terms
///
/// - `min(40, smoke_free_days * 0.5)`
/// - `min(30, current_streak)`
/// - `smoke_free_percentage / 100 * 20`, percentage bounded to [0, 100]
/// - `min(10, total_money_saved / 100_000)`
pub fn compute_achievement_score(
    smoke_free_days: u32,
    total_money_saved: f64,
    current_streak: u32,
    smoke_free_percentage: f64,
) -> u32 {
    let days = (f64::from(smoke_free_days) * 0.5).min(ACHIEVEMENT_DAYS_CAP);
    let streak = f64::from(current_streak).min(ACHIEVEMENT_STREAK_CAP);
    let percentage = non_negative(smoke_free_percentage).min(100.0) / 100.0
        * ACHIEVEMENT_PERCENTAGE_WEIGHT;
    let money = (non_negative(total_money_saved) / ACHIEVEMENT_MONEY_UNIT_VND)
        .min(ACHIEVEMENT_MONEY_CAP);

    (days + streak + percentage + money).round() as u32
}

/// Compute the full metrics snapshot for a profile.
pub fn evaluate_profile(
    tables: &ScoringTables,
    profile: &SmokingProfile,
    now: DateTime<Utc>,
) -> CessationMetrics {
    let pack_year = compute_pack_year(profile.cigarettes_per_day, profile.years_smoked);
    let ftnd_score = compute_ftnd_score(tables, &profile.ftnd_answers);
    let addiction_level = classify_addiction_level(ftnd_score);
    let success_probability = compute_success_probability(tables, profile, pack_year, ftnd_score);
    let savings = compute_savings(tables, profile.cigarettes_per_day, profile.package_price_vnd);

    CessationMetrics {
        pack_year,
        ftnd_score,
        addiction_level,
        severity_rank: addiction_level.severity_rank(),
        success_probability,
        savings,
        submitted_at: now,
    }
}
