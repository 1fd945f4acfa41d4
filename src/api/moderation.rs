/// Staff moderation endpoints: the review queue, case decisions, and
/// dynamic rule management. Every route requires a staff bearer token.
use crate::{
    auth::StaffAuthContext,
    context::AppContext,
    error::ModResult,
    moderation::{
        CaseDetail, CaseStatus, ModerationCase, ModerationDecision, ModerationRule, NewRule,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build staff moderation routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/moderation/cases", get(list_cases))
        .route("/api/moderation/cases/:id", get(get_case))
        .route("/api/moderation/cases/:id/decide", post(decide_case))
        .route("/api/moderation/rules", get(list_rules).post(create_rule))
        .route("/api/moderation/stats", get(get_stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCasesQuery {
    /// Defaults to the open queue
    pub status: Option<String>,
    pub min_score: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    pub id: i64,
    pub ad_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    pub score: i64,
    pub reasons: serde_json::Value,
    pub status: CaseStatus,
    /// Current status of the referenced listing, when its row exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub decisions: Vec<DecisionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionView {
    pub id: i64,
    pub case_id: i64,
    pub staff_user_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: String,
}

impl From<ModerationDecision> for DecisionView {
    fn from(decision: ModerationDecision) -> Self {
        Self {
            id: decision.id,
            case_id: decision.case_id,
            staff_user_id: decision.staff_user_id,
            action: decision.action.as_str().to_uppercase(),
            reason: decision.reason,
            created_at: decision.created_at.to_rfc3339(),
        }
    }
}

impl From<CaseDetail> for CaseView {
    fn from(detail: CaseDetail) -> Self {
        let ModerationCase {
            id,
            ad_id,
            user_id,
            country,
            category_slug,
            score,
            reasons,
            status,
            created_at,
            updated_at,
        } = detail.case;

        Self {
            id,
            ad_id,
            user_id,
            country,
            category_slug,
            score,
            reasons,
            status,
            listing_status: None,
            created_at: created_at.to_rfc3339(),
            updated_at: updated_at.to_rfc3339(),
            decisions: detail.decisions.into_iter().map(DecisionView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCasesResponse {
    pub cases: Vec<CaseView>,
}

/// Review queue: cases by status and minimum score, newest activity first
async fn list_cases(
    State(ctx): State<AppContext>,
    _auth: StaffAuthContext,
    Query(query): Query<ListCasesQuery>,
) -> ModResult<Json<ListCasesResponse>> {
    let status = match query.status.as_deref() {
        Some(s) => CaseStatus::from_str(s)?,
        None => CaseStatus::Open,
    };

    let cases = ctx
        .case_manager
        .list_cases(status, query.min_score, query.limit)
        .await?
        .into_iter()
        .map(CaseView::from)
        .collect();

    Ok(Json(ListCasesResponse { cases }))
}

/// One case with its decision history and the listing's current status
async fn get_case(
    State(ctx): State<AppContext>,
    _auth: StaffAuthContext,
    Path(id): Path<i64>,
) -> ModResult<Json<CaseView>> {
    let detail = ctx.case_manager.get_case(id).await?;

    let mut view = CaseView::from(detail);
    view.listing_status = ctx
        .listing_store
        .status(&view.ad_id)
        .await?
        .map(|s| s.as_str().to_string());

    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    pub action: String,
    pub reason: Option<String>,
}

/// Apply a staff decision to a case
async fn decide_case(
    State(ctx): State<AppContext>,
    auth: StaffAuthContext,
    Path(id): Path<i64>,
    Json(req): Json<DecideRequest>,
) -> ModResult<Json<DecisionView>> {
    let decision = ctx
        .case_manager
        .decide(id, &auth.staff_user_id, &req.action, req.reason)
        .await?;

    Ok(Json(DecisionView::from(decision)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub name: String,
    pub country: Option<String>,
    pub category_slug: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub regexes: Vec<String>,
    pub weight: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    pub keywords: Vec<String>,
    pub regexes: Vec<String>,
    pub weight: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ModerationRule> for RuleView {
    fn from(rule: ModerationRule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            country: rule.country,
            category_slug: rule.category_slug,
            keywords: rule.keywords,
            regexes: rule.regexes,
            weight: rule.weight,
            is_active: rule.is_active,
            created_at: rule.created_at.to_rfc3339(),
            updated_at: rule.updated_at.to_rfc3339(),
        }
    }
}

/// Add a dynamic rule
async fn create_rule(
    State(ctx): State<AppContext>,
    _auth: StaffAuthContext,
    Json(req): Json<CreateRuleRequest>,
) -> ModResult<Json<RuleView>> {
    let rule = ctx
        .rule_store
        .create_rule(NewRule {
            name: req.name,
            country: req.country,
            category_slug: req.category_slug,
            keywords: req.keywords,
            regexes: req.regexes,
            weight: req.weight,
            is_active: req.is_active,
        })
        .await?;

    Ok(Json(RuleView::from(rule)))
}

#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRulesResponse {
    pub rules: Vec<RuleView>,
}

/// List dynamic rules, newest first
async fn list_rules(
    State(ctx): State<AppContext>,
    _auth: StaffAuthContext,
    Query(query): Query<ListRulesQuery>,
) -> ModResult<Json<ListRulesResponse>> {
    let rules = ctx
        .rule_store
        .list_rules(query.limit)
        .await?
        .into_iter()
        .map(RuleView::from)
        .collect();

    Ok(Json(ListRulesResponse { rules }))
}

/// Queue statistics for the moderation dashboard
async fn get_stats(
    State(ctx): State<AppContext>,
    _auth: StaffAuthContext,
) -> ModResult<Json<serde_json::Value>> {
    let open_cases: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM moderation_case WHERE status = 'open'")
            .fetch_one(&ctx.db)
            .await?;

    let escalated_cases: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM moderation_case WHERE status = 'escalated'")
            .fetch_one(&ctx.db)
            .await?;

    let total_decisions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moderation_decision")
        .fetch_one(&ctx.db)
        .await?;

    let active_rules: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM moderation_rule WHERE is_active = 1")
            .fetch_one(&ctx.db)
            .await
            .unwrap_or(0);

    Ok(Json(serde_json::json!({
        "openCases": open_cases,
        "escalatedCases": escalated_cases,
        "totalDecisions": total_decisions,
        "activeRules": active_rules,
    })))
}
