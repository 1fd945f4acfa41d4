/// Dynamic moderation rules
///
/// Rules are data, not code: each carries a keyword set, a regex set, a
/// weight, and an optional country/category scope. Staff add rules at
/// runtime; the scoring engine interprets them per evaluation.
use crate::error::{ModError, ModResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Upper bound on rules consulted per evaluation. Keeps rule lookup a
/// bounded page rather than an unbounded scan.
const ACTIVE_RULE_PAGE: i64 = 200;

/// Upper bound on rules returned by the staff listing endpoint
const LIST_RULE_PAGE: i64 = 200;

/// A staff-configured moderation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRule {
    pub id: i64,
    pub name: String,
    /// None means the rule applies to every country
    pub country: Option<String>,
    /// None means the rule applies to every category
    pub category_slug: Option<String>,
    /// Lowercase substrings matched against normalized text
    pub keywords: Vec<String>,
    /// Pattern strings, compiled case-insensitively at evaluation time
    pub regexes: Vec<String>,
    pub weight: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a rule
#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub country: Option<String>,
    pub category_slug: Option<String>,
    pub keywords: Vec<String>,
    pub regexes: Vec<String>,
    pub weight: Option<i64>,
    pub is_active: bool,
}

/// Rule store
#[derive(Clone)]
pub struct RuleStore {
    db: SqlitePool,
}

impl RuleStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a rule. Keywords are lowercased on write; weight defaults
    /// to 10 and must be positive.
    pub async fn create_rule(&self, new: NewRule) -> ModResult<ModerationRule> {
        let weight = new.weight.unwrap_or(10);
        if weight <= 0 {
            return Err(ModError::Validation(
                "Rule weight must be a positive integer".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(ModError::Validation("Rule name cannot be empty".to_string()));
        }

        let keywords: Vec<String> = new
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let regexes: Vec<String> = new
            .regexes
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO moderation_rule
            (name, country, category_slug, keywords, regexes, weight, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.country)
        .bind(&new.category_slug)
        .bind(serde_json::to_string(&keywords).map_err(|e| ModError::Internal(e.to_string()))?)
        .bind(serde_json::to_string(&regexes).map_err(|e| ModError::Internal(e.to_string()))?)
        .bind(weight)
        .bind(new.is_active)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(ModerationRule {
            id: result.last_insert_rowid(),
            name: new.name,
            country: new.country,
            category_slug: new.category_slug,
            keywords,
            regexes,
            weight,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Active rules matching the given submission scope.
    ///
    /// A rule matches when each of its scope fields is either null or equal
    /// to the submission's corresponding field, so a rule scoped to
    /// (country, null) applies to every category in that country, and a rule
    /// scoped to (null, null) applies everywhere.
    ///
    /// Failures here are dependency failures: scoring cannot proceed without
    /// knowing the dynamic rules.
    pub async fn active_rules(
        &self,
        country: Option<&str>,
        category_slug: Option<&str>,
    ) -> ModResult<Vec<ModerationRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, country, category_slug, keywords, regexes,
                   weight, is_active, created_at, updated_at
            FROM moderation_rule
            WHERE is_active = 1
              AND (country IS NULL OR country = ?)
              AND (category_slug IS NULL OR category_slug = ?)
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(country)
        .bind(category_slug)
        .bind(ACTIVE_RULE_PAGE)
        .fetch_all(&self.db)
        .await
        .map_err(|e| ModError::Dependency(format!("rule store: {}", e)))?;

        rows.into_iter().map(parse_rule).collect()
    }

    /// List rules for staff tooling, newest first
    pub async fn list_rules(&self, limit: Option<i64>) -> ModResult<Vec<ModerationRule>> {
        let limit = limit.unwrap_or(50).clamp(1, LIST_RULE_PAGE);

        let rows = sqlx::query(
            r#"
            SELECT id, name, country, category_slug, keywords, regexes,
                   weight, is_active, created_at, updated_at
            FROM moderation_rule
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_rule).collect()
    }
}

fn parse_rule(row: sqlx::sqlite::SqliteRow) -> ModResult<ModerationRule> {
    let keywords_json: String = row.get("keywords");
    let keywords: Vec<String> = serde_json::from_str(&keywords_json)
        .map_err(|e| ModError::Internal(format!("Invalid rule keywords: {}", e)))?;

    let regexes_json: String = row.get("regexes");
    let regexes: Vec<String> = serde_json::from_str(&regexes_json)
        .map_err(|e| ModError::Internal(format!("Invalid rule regexes: {}", e)))?;

    Ok(ModerationRule {
        id: row.get("id"),
        name: row.get("name"),
        country: row.get("country"),
        category_slug: row.get("category_slug"),
        keywords,
        regexes,
        weight: row.get("weight"),
        is_active: row.get("is_active"),
        created_at: parse_timestamp(&row, "created_at")?,
        updated_at: parse_timestamp(&row, "updated_at")?,
    })
}

pub(crate) fn parse_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> ModResult<DateTime<Utc>> {
    let value: String = row.get(column);
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ModError::Internal(format!("Invalid timestamp in {}: {}", column, e)))
}
