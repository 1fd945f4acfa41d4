/// Review case lifecycle and staff decision log
///
/// One case per listing, enforced by a unique key on `ad_id` plus an atomic
/// upsert. Staff decisions transition the case and the referenced listing
/// together, inside one transaction, and always append to an immutable
/// decision log.
use crate::{
    error::{ModError, ModResult},
    listings::{ListingStatus, ListingStore},
    metrics,
    moderation::rules::parse_timestamp,
    moderation::score::ScoreResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Upper bound on cases returned per staff listing request
const LIST_CASE_PAGE: i64 = 200;

/// Review case status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Open,
    Escalated,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Escalated => "escalated",
            CaseStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(CaseStatus::Open),
            "escalated" => Ok(CaseStatus::Escalated),
            "closed" => Ok(CaseStatus::Closed),
            _ => Err(ModError::Validation(format!("Invalid case status: {}", s))),
        }
    }

    /// Status applied when a listing is re-evaluated above the review
    /// threshold. Always Open today, even over an escalated or closed
    /// case; this is the single place to change if escalation should
    /// survive re-evaluation.
    pub fn reopened() -> Self {
        CaseStatus::Open
    }
}

/// Staff decision actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Reject,
    Escalate,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Reject => "reject",
            DecisionAction::Escalate => "escalate",
        }
    }

    pub fn from_str(s: &str) -> ModResult<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(DecisionAction::Approve),
            "reject" => Ok(DecisionAction::Reject),
            "escalate" => Ok(DecisionAction::Escalate),
            _ => Err(ModError::InvalidAction(s.to_string())),
        }
    }
}

/// A moderation case tracking one listing through review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationCase {
    pub id: i64,
    pub ad_id: String,
    pub user_id: Option<String>,
    pub country: Option<String>,
    pub category_slug: Option<String>,
    pub score: i64,
    /// Snapshot of the evaluation that opened or refreshed the case
    pub reasons: serde_json::Value,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable staff decision. Never updated or deleted after insert;
/// this is the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub id: i64,
    pub case_id: i64,
    pub staff_user_id: String,
    pub action: DecisionAction,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A case together with its ordered decision history
#[derive(Debug, Clone, Serialize)]
pub struct CaseDetail {
    pub case: ModerationCase,
    pub decisions: Vec<ModerationDecision>,
}

/// Case manager
#[derive(Clone)]
pub struct CaseManager {
    db: SqlitePool,
}

impl CaseManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open a case for a listing, or refresh the existing one.
    ///
    /// Upserts by `ad_id`: the unique key plus the atomic upsert guarantee
    /// that two concurrent evaluations of the same listing never produce
    /// two case rows. A refresh overwrites score, reasons, and scope, and
    /// forces the status back to `CaseStatus::reopened()` whatever it was.
    pub async fn open_or_refresh(
        &self,
        ad_id: &str,
        user_id: Option<&str>,
        country: Option<&str>,
        category_slug: Option<&str>,
        snapshot: &ScoreResult,
    ) -> ModResult<ModerationCase> {
        let reasons = serde_json::to_value(snapshot)
            .map_err(|e| ModError::Internal(format!("Could not encode reasons: {}", e)))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO moderation_case
            (ad_id, user_id, country, category_slug, score, reasons, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ad_id) DO UPDATE SET
                user_id = excluded.user_id,
                country = excluded.country,
                category_slug = excluded.category_slug,
                score = excluded.score,
                reasons = excluded.reasons,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(ad_id)
        .bind(user_id)
        .bind(country)
        .bind(category_slug)
        .bind(snapshot.score)
        .bind(reasons.to_string())
        .bind(CaseStatus::reopened().as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| ModError::Dependency(format!("case store: {}", e)))?;

        metrics::MODERATION_CASES_OPENED_TOTAL.inc();

        let row = sqlx::query(
            r#"
            SELECT id, ad_id, user_id, country, category_slug, score, reasons,
                   status, created_at, updated_at
            FROM moderation_case
            WHERE ad_id = ?
            "#,
        )
        .bind(ad_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| ModError::Dependency(format!("case store: {}", e)))?;

        parse_case(row)
    }

    /// Apply a staff decision to a case.
    ///
    /// The action string is validated before any mutation. Approve and
    /// reject update the listing status and close the case as one atomic
    /// unit; escalate touches only the case. A decision record is always
    /// appended after the transition. Retrying after a successful commit
    /// appends another decision record; there is no idempotency token.
    pub async fn decide(
        &self,
        case_id: i64,
        staff_user_id: &str,
        action: &str,
        reason: Option<String>,
    ) -> ModResult<ModerationDecision> {
        // Fails with InvalidAction before anything is written
        let action = DecisionAction::from_str(action)?;

        let dep = |e: sqlx::Error| ModError::Dependency(format!("case store: {}", e));

        // Dropping the transaction without commit rolls everything back,
        // so any early return below leaves no partial writes.
        let mut tx = self.db.begin().await.map_err(dep)?;

        let row = sqlx::query("SELECT ad_id FROM moderation_case WHERE id = ?")
            .bind(case_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(dep)?;
        let ad_id: String = match row {
            Some(row) => row.get("ad_id"),
            None => return Err(ModError::NotFound(format!("Case {} not found", case_id))),
        };

        let case_status = match action {
            DecisionAction::Approve => {
                let touched =
                    ListingStore::set_status_tx(&mut tx, &ad_id, ListingStatus::Published)
                        .await
                        .map_err(dep)?;
                if touched == 0 {
                    return Err(ModError::NotFound(format!("Listing {} not found", ad_id)));
                }
                CaseStatus::Closed
            }
            DecisionAction::Reject => {
                let touched =
                    ListingStore::set_status_tx(&mut tx, &ad_id, ListingStatus::Rejected)
                        .await
                        .map_err(dep)?;
                if touched == 0 {
                    return Err(ModError::NotFound(format!("Listing {} not found", ad_id)));
                }
                CaseStatus::Closed
            }
            DecisionAction::Escalate => CaseStatus::Escalated,
        };

        let now = Utc::now();

        sqlx::query("UPDATE moderation_case SET status = ?, updated_at = ? WHERE id = ?")
            .bind(case_status.as_str())
            .bind(now.to_rfc3339())
            .bind(case_id)
            .execute(&mut *tx)
            .await
            .map_err(dep)?;

        let result = sqlx::query(
            r#"
            INSERT INTO moderation_decision (case_id, staff_user_id, action, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(case_id)
        .bind(staff_user_id)
        .bind(action.as_str())
        .bind(&reason)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(dep)?;
        let decision_id = result.last_insert_rowid();

        tx.commit().await.map_err(dep)?;

        metrics::MODERATION_DECISIONS_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();

        Ok(ModerationDecision {
            id: decision_id,
            case_id,
            staff_user_id: staff_user_id.to_string(),
            action,
            reason,
            created_at: now,
        })
    }

    /// Fetch one case with its decision history
    pub async fn get_case(&self, case_id: i64) -> ModResult<CaseDetail> {
        let row = sqlx::query(
            r#"
            SELECT id, ad_id, user_id, country, category_slug, score, reasons,
                   status, created_at, updated_at
            FROM moderation_case
            WHERE id = ?
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.db)
        .await?;

        let case = match row {
            Some(row) => parse_case(row)?,
            None => return Err(ModError::NotFound(format!("Case {} not found", case_id))),
        };
        let decisions = self.decisions_for_case(case.id).await?;

        Ok(CaseDetail { case, decisions })
    }

    /// List cases for the review queue: filtered by status and minimum
    /// score, most recently updated first, bounded page, decision history
    /// included.
    pub async fn list_cases(
        &self,
        status: CaseStatus,
        min_score: Option<i64>,
        limit: Option<i64>,
    ) -> ModResult<Vec<CaseDetail>> {
        let limit = limit.unwrap_or(50).clamp(1, LIST_CASE_PAGE);

        let rows = sqlx::query(
            r#"
            SELECT id, ad_id, user_id, country, category_slug, score, reasons,
                   status, created_at, updated_at
            FROM moderation_case
            WHERE status = ? AND score >= ?
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(status.as_str())
        .bind(min_score.unwrap_or(0))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            let case = parse_case(row)?;
            let decisions = self.decisions_for_case(case.id).await?;
            details.push(CaseDetail { case, decisions });
        }

        Ok(details)
    }

    /// Decision history for one case, oldest first
    async fn decisions_for_case(&self, case_id: i64) -> ModResult<Vec<ModerationDecision>> {
        let rows = sqlx::query(
            r#"
            SELECT id, case_id, staff_user_id, action, reason, created_at
            FROM moderation_decision
            WHERE case_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(case_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(parse_decision).collect()
    }
}

fn parse_case(row: sqlx::sqlite::SqliteRow) -> ModResult<ModerationCase> {
    let status_str: String = row.get("status");
    let status = CaseStatus::from_str(&status_str)?;

    let reasons_json: String = row.get("reasons");
    let reasons = serde_json::from_str(&reasons_json)
        .map_err(|e| ModError::Internal(format!("Invalid case reasons: {}", e)))?;

    Ok(ModerationCase {
        id: row.get("id"),
        ad_id: row.get("ad_id"),
        user_id: row.get("user_id"),
        country: row.get("country"),
        category_slug: row.get("category_slug"),
        score: row.get("score"),
        reasons,
        status,
        created_at: parse_timestamp(&row, "created_at")?,
        updated_at: parse_timestamp(&row, "updated_at")?,
    })
}

fn parse_decision(row: sqlx::sqlite::SqliteRow) -> ModResult<ModerationDecision> {
    let action_str: String = row.get("action");
    let action = DecisionAction::from_str(&action_str)?;

    Ok(ModerationDecision {
        id: row.get("id"),
        case_id: row.get("case_id"),
        staff_user_id: row.get("staff_user_id"),
        action,
        reason: row.get("reason"),
        created_at: parse_timestamp(&row, "created_at")?,
    })
}
