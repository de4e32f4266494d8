//! SQLite storage layer for Smokefree.
//!
//! Two tables:
//!
//! - `surveys`: one row per user holding the latest survey answers and the
//!   metrics snapshot computed from them. A new submission replaces the row.
//! - `progress_entries`: the daily log, at most one row per user per date.
//!
//! Dates are stored as ISO-8601 text and timestamps as Unix milliseconds.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::calculator::classify_addiction_level;
use crate::model::{
    AddictionLevel, CessationMetrics, FtndAnswers, Motivation, ProgressEntry, Savings,
    SurveyRecord,
};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:smokefree.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS surveys (
                user_id TEXT PRIMARY KEY,
                cigarettes_per_day INTEGER NOT NULL,
                years_smoked REAL NOT NULL,
                age INTEGER NOT NULL,
                motivation TEXT,
                package_price_vnd INTEGER NOT NULL,
                price_tier TEXT,
                ftnd_answers TEXT NOT NULL,
                pack_year REAL NOT NULL,
                ftnd_score INTEGER NOT NULL,
                addiction_level TEXT NOT NULL,
                severity_rank INTEGER NOT NULL,
                success_probability INTEGER NOT NULL,
                daily_savings REAL NOT NULL,
                weekly_savings REAL NOT NULL,
                monthly_savings REAL NOT NULL,
                quarterly_savings REAL NOT NULL,
                yearly_savings REAL NOT NULL,
                submitted_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS progress_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                entry_date TEXT NOT NULL,
                cigarettes_smoked INTEGER NOT NULL,
                craving_level INTEGER NOT NULL,
                notes TEXT,
                UNIQUE (user_id, entry_date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a survey, replacing any previous survey for the same user.
    pub async fn upsert_survey(&self, record: &SurveyRecord) -> anyhow::Result<()> {
        let answers = serde_json::to_string(&record.ftnd_answers)?;
        let metrics = &record.metrics;

        sqlx::query(
            r#"
            INSERT INTO surveys (
                user_id, cigarettes_per_day, years_smoked, age, motivation,
                package_price_vnd, price_tier, ftnd_answers, pack_year,
                ftnd_score, addiction_level, severity_rank, success_probability,
                daily_savings, weekly_savings, monthly_savings,
                quarterly_savings, yearly_savings, submitted_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                cigarettes_per_day = excluded.cigarettes_per_day,
                years_smoked = excluded.years_smoked,
                age = excluded.age,
                motivation = excluded.motivation,
                package_price_vnd = excluded.package_price_vnd,
                price_tier = excluded.price_tier,
                ftnd_answers = excluded.ftnd_answers,
                pack_year = excluded.pack_year,
                ftnd_score = excluded.ftnd_score,
                addiction_level = excluded.addiction_level,
                severity_rank = excluded.severity_rank,
                success_probability = excluded.success_probability,
                daily_savings = excluded.daily_savings,
                weekly_savings = excluded.weekly_savings,
                monthly_savings = excluded.monthly_savings,
                quarterly_savings = excluded.quarterly_savings,
                yearly_savings = excluded.yearly_savings,
                submitted_at = excluded.submitted_at
            "#,
        )
        .bind(&record.user_id)
        .bind(i64::from(record.cigarettes_per_day))
        .bind(record.years_smoked)
        .bind(i64::from(record.age))
        .bind(record.motivation.map(|m| m.as_str()))
        .bind(i64::from(record.package_price_vnd))
        .bind(record.price_tier.as_deref())
        .bind(answers)
        .bind(metrics.pack_year)
        .bind(i64::from(metrics.ftnd_score))
        .bind(metrics.addiction_level.label())
        .bind(i64::from(metrics.severity_rank))
        .bind(i64::from(metrics.success_probability))
        .bind(metrics.savings.daily)
        .bind(metrics.savings.weekly)
        .bind(metrics.savings.monthly)
        .bind(metrics.savings.quarterly)
        .bind(metrics.savings.yearly)
        .bind(metrics.submitted_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the stored survey for a user, if any.
    pub async fn get_survey(&self, user_id: &str) -> anyhow::Result<Option<SurveyRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM surveys WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| survey_from_row(&r)).transpose()
    }

    /// Insert a progress entry.
    ///
    /// Returns `false` without writing when the user already has an entry
    /// for that date.
    pub async fn insert_progress_entry(
        &self,
        user_id: &str,
        entry: &ProgressEntry,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO progress_entries
                (user_id, entry_date, cigarettes_smoked, craving_level, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(entry.date.to_string())
        .bind(i64::from(entry.cigarettes_smoked))
        .bind(i64::from(entry.craving_level))
        .bind(entry.notes.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List a user's progress entries in date order, optionally bounded
    /// (inclusive) by `from` and `to`.
    pub async fn list_progress_entries(
        &self,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> anyhow::Result<Vec<ProgressEntry>> {
        let from = from.map(|d| d.to_string());
        let to = to.map(|d| d.to_string());

        let rows = sqlx::query(
            r#"
            SELECT entry_date, cigarettes_smoked, craving_level, notes
            FROM progress_entries
            WHERE user_id = ?
              AND (? IS NULL OR entry_date >= ?)
              AND (? IS NULL OR entry_date <= ?)
            ORDER BY entry_date ASC
            "#,
        )
        .bind(user_id)
        .bind(from.as_deref())
        .bind(from.as_deref())
        .bind(to.as_deref())
        .bind(to.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(progress_entry_from_row).collect()
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_u8(value: i64) -> u8 {
    u8::try_from(value).unwrap_or(0)
}

fn survey_from_row(row: &SqliteRow) -> anyhow::Result<SurveyRecord> {
    let answers: String = row.get("ftnd_answers");
    let ftnd_answers: FtndAnswers =
        serde_json::from_str(&answers).context("decoding stored FTND answers")?;

    let motivation: Option<String> = row.get("motivation");
    let ftnd_score = to_u8(row.get("ftnd_score"));
    let level: String = row.get("addiction_level");
    let addiction_level: AddictionLevel =
        AddictionLevel::from_label(&level).unwrap_or_else(|| classify_addiction_level(ftnd_score));

    let submitted_ms: i64 = row.get("submitted_at");
    let submitted_at: DateTime<Utc> = Utc
        .timestamp_millis_opt(submitted_ms)
        .single()
        .with_context(|| format!("invalid submission timestamp {submitted_ms}"))?;

    Ok(SurveyRecord {
        user_id: row.get("user_id"),
        cigarettes_per_day: to_u32(row.get("cigarettes_per_day")),
        years_smoked: row.get("years_smoked"),
        age: to_u32(row.get("age")),
        motivation: motivation.as_deref().and_then(Motivation::parse),
        package_price_vnd: to_u32(row.get("package_price_vnd")),
        price_tier: row.get("price_tier"),
        ftnd_answers,
        metrics: CessationMetrics {
            pack_year: row.get("pack_year"),
            ftnd_score,
            addiction_level,
            severity_rank: to_u8(row.get("severity_rank")),
            success_probability: to_u8(row.get("success_probability")),
            savings: Savings {
                daily: row.get("daily_savings"),
                weekly: row.get("weekly_savings"),
                monthly: row.get("monthly_savings"),
                quarterly: row.get("quarterly_savings"),
                yearly: row.get("yearly_savings"),
            },
            submitted_at,
        },
    })
}

fn progress_entry_from_row(row: &SqliteRow) -> anyhow::Result<ProgressEntry> {
    let date: String = row.get("entry_date");

    Ok(ProgressEntry {
        date: date
            .parse()
            .with_context(|| format!("invalid stored entry date '{date}'"))?,
        cigarettes_smoked: to_u32(row.get("cigarettes_smoked")),
        craving_level: to_u8(row.get("craving_level")),
        notes: row.get("notes"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::evaluate_profile;
    use crate::model::SmokingProfile;
    use crate::tables::ScoringTables;
    use tokio_test::assert_ok;

    async fn setup_test_storage() -> Storage {
        Storage::new("sqlite::memory:").await.unwrap()
    }

    fn record(user_id: &str, cigarettes_per_day: u32) -> SurveyRecord {
        let tables = ScoringTables::default();
        let mut ftnd_answers = FtndAnswers::new();
        ftnd_answers.insert("hardToRefrain".to_string(), "yes".to_string());

        let profile = SmokingProfile {
            cigarettes_per_day,
            years_smoked: 8.5,
            age: 41,
            motivation: Some(Motivation::High),
            package_price_vnd: 25_000,
            ftnd_answers: ftnd_answers.clone(),
        };
        let submitted_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        SurveyRecord {
            user_id: user_id.to_string(),
            cigarettes_per_day,
            years_smoked: profile.years_smoked,
            age: profile.age,
            motivation: profile.motivation,
            package_price_vnd: profile.package_price_vnd,
            price_tier: tables
                .price_tier_for(profile.package_price_vnd)
                .map(|t| t.key.clone()),
            ftnd_answers,
            metrics: evaluate_profile(&tables, &profile, submitted_at),
        }
    }

    fn entry(day: u32, cigarettes_smoked: u32) -> ProgressEntry {
        ProgressEntry {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            cigarettes_smoked,
            craving_level: 4,
            notes: Some("walked after lunch".to_string()),
        }
    }

    #[tokio::test]
    async fn test_survey_missing() {
        let storage = setup_test_storage().await;
        let survey = storage.get_survey("nobody").await.unwrap();
        assert!(survey.is_none());
    }

    #[tokio::test]
    async fn test_survey_stored_verbatim() {
        let storage = setup_test_storage().await;
        let original = record("user-1", 12);

        assert_ok!(storage.upsert_survey(&original).await);
        let stored = storage.get_survey("user-1").await.unwrap().unwrap();

        assert_eq!(stored, original);
        assert_eq!(stored.price_tier.as_deref(), Some("standard"));
    }

    #[tokio::test]
    async fn test_new_submission_replaces_snapshot() {
        let storage = setup_test_storage().await;

        storage.upsert_survey(&record("user-1", 12)).await.unwrap();
        storage.upsert_survey(&record("user-1", 30)).await.unwrap();
        storage.upsert_survey(&record("user-2", 5)).await.unwrap();

        let stored = storage.get_survey("user-1").await.unwrap().unwrap();
        assert_eq!(stored.cigarettes_per_day, 30);
        assert_eq!(stored.metrics.savings.daily, 37_500.0);

        let other = storage.get_survey("user-2").await.unwrap().unwrap();
        assert_eq!(other.cigarettes_per_day, 5);
    }

    #[tokio::test]
    async fn test_progress_entry_once_per_day() {
        let storage = setup_test_storage().await;

        assert!(storage.insert_progress_entry("user-1", &entry(1, 0)).await.unwrap());
        assert!(!storage.insert_progress_entry("user-1", &entry(1, 3)).await.unwrap());
        // Same date for another user is fine.
        assert!(storage.insert_progress_entry("user-2", &entry(1, 3)).await.unwrap());

        let entries = storage
            .list_progress_entries("user-1", None, None)
            .await
            .unwrap();
        assert_eq!(entries, vec![entry(1, 0)]);
    }

    #[tokio::test]
    async fn test_list_progress_entries_ordered_and_bounded() {
        let storage = setup_test_storage().await;

        for (day, smoked) in [(5, 0), (2, 1), (9, 0), (12, 2)] {
            storage
                .insert_progress_entry("user-1", &entry(day, smoked))
                .await
                .unwrap();
        }

        let all = storage
            .list_progress_entries("user-1", None, None)
            .await
            .unwrap();
        let days: Vec<String> = all.iter().map(|e| e.date.to_string()).collect();
        assert_eq!(days, vec!["2024-05-02", "2024-05-05", "2024-05-09", "2024-05-12"]);

        let bounded = storage
            .list_progress_entries(
                "user-1",
                NaiveDate::from_ymd_opt(2024, 5, 5),
                NaiveDate::from_ymd_opt(2024, 5, 9),
            )
            .await
            .unwrap();
        assert_eq!(bounded, vec![entry(5, 0), entry(9, 0)]);
    }
}
