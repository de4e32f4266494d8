//! Progress tracking derived from the daily log.
//!
//! Streaks, smoke-free percentage and money saved are recomputed from the
//! stored entries on every read; nothing here is persisted.
//!
//! Money saved is measured against the user's own survey snapshot when one
//! exists (their declared cigarettes per day and package price). Users who
//! never submitted a survey are measured against the fallback baseline from
//! the scoring tables. The summary reports which baseline was used so the
//! figure can be reconciled with the survey's savings projection.

use std::ops::RangeInclusive;

use chrono::NaiveDate;

use crate::calculator::{build_health_timeline, compute_achievement_score};
use crate::model::{BaselineSource, ProgressEntry, ProgressSummary, SurveyRecord};
use crate::tables::ScoringTables;

/// Accepted craving levels.
pub const CRAVING_RANGE: RangeInclusive<u8> = 1..=10;

/// Daily consumption that logged days are compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub cigarettes_per_day: u32,
    pub price_per_cigarette_vnd: f64,
    pub source: BaselineSource,
}

impl Baseline {
    /// Use the survey snapshot if present, otherwise the configured fallback.
    pub fn resolve(tables: &ScoringTables, survey: Option<&SurveyRecord>) -> Self {
        match survey {
            Some(record) => Self {
                cigarettes_per_day: record.cigarettes_per_day,
                price_per_cigarette_vnd: f64::from(record.package_price_vnd)
                    / f64::from(tables.cigarettes_per_pack.max(1)),
                source: BaselineSource::Survey,
            },
            None => Self {
                cigarettes_per_day: tables.progress_baseline.cigarettes_per_day,
                price_per_cigarette_vnd: tables.progress_baseline.price_per_cigarette_vnd,
                source: BaselineSource::Fallback,
            },
        }
    }

    /// Cigarettes not smoked on a logged day relative to the baseline.
    pub fn cigarettes_avoided(&self, entry: &ProgressEntry) -> u32 {
        self.cigarettes_per_day
            .saturating_sub(entry.cigarettes_smoked)
    }
}

/// Current and longest smoke-free streaks, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    /// Run of consecutive smoke-free dates ending at the latest logged date.
    pub current: u32,
    pub longest: u32,
}

/// Compute streaks from entries in any order.
///
/// A streak is broken by a day with cigarettes or by a gap in the log.
pub fn compute_streaks(entries: &[ProgressEntry]) -> Streaks {
    let mut dates: Vec<(NaiveDate, bool)> = entries
        .iter()
        .map(|e| (e.date, e.is_smoke_free()))
        .collect();
    dates.sort_by_key(|(date, _)| *date);
    dates.dedup_by_key(|(date, _)| *date);

    let mut streaks = Streaks::default();
    let mut run = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for (date, smoke_free) in dates {
        let consecutive = previous.and_then(|p| p.succ_opt()) == Some(date);

        run = match (smoke_free, consecutive) {
            (false, _) => 0,
            (true, true) => run + 1,
            (true, false) => 1,
        };
        streaks.longest = streaks.longest.max(run);
        previous = Some(date);
    }

    streaks.current = run;
    streaks
}

/// Build the progress dashboard figures for a user's log.
pub fn summarize_progress(
    tables: &ScoringTables,
    entries: &[ProgressEntry],
    survey: Option<&SurveyRecord>,
) -> ProgressSummary {
    let baseline = Baseline::resolve(tables, survey);
    let streaks = compute_streaks(entries);

    let total_days_logged = entries.len() as u32;
    let smoke_free_days = entries.iter().filter(|e| e.is_smoke_free()).count() as u32;
    let smoke_free_percentage = if total_days_logged == 0 {
        0.0
    } else {
        f64::from(smoke_free_days) / f64::from(total_days_logged) * 100.0
    };

    let cigarettes_avoided: u64 = entries
        .iter()
        .map(|e| u64::from(baseline.cigarettes_avoided(e)))
        .sum();
    let money_saved_vnd = cigarettes_avoided as f64 * baseline.price_per_cigarette_vnd;

    let average_craving = if entries.is_empty() {
        None
    } else {
        let total: u32 = entries.iter().map(|e| u32::from(e.craving_level)).sum();
        Some(f64::from(total) / entries.len() as f64)
    };

    let achievement_score = compute_achievement_score(
        smoke_free_days,
        money_saved_vnd,
        streaks.current,
        smoke_free_percentage,
    );

    ProgressSummary {
        total_days_logged,
        smoke_free_days,
        smoke_free_percentage,
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        cigarettes_avoided,
        money_saved_vnd,
        baseline_source: baseline.source,
        average_craving,
        achievement_score,
        health_timeline: build_health_timeline(tables, f64::from(streaks.current)),
    }
}
