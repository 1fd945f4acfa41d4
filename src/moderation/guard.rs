/// Submission gate: score, route, enforce
///
/// Runs synchronously in the listing create/update path, before the listing
/// service persists anything. Not a background job: the caller waits for
/// the verdict.
use crate::{
    config::PolicyConfig,
    error::{ModError, ModResult},
    listings::ListingStore,
    metrics,
    moderation::cases::{CaseManager, ModerationCase},
    moderation::router::{route_score, Enforcement},
    moderation::score::{ModerationInput, ScoreResult, ScoringEngine},
};
use std::sync::Arc;

/// A screened listing submission
#[derive(Debug, Clone)]
pub struct ListingSubmission {
    /// Present when an existing listing is being updated; absent on create
    /// (the listing service has not allocated the row yet)
    pub ad_id: Option<String>,
    pub user_id: Option<String>,
    pub input: ModerationInput,
}

/// Outcome of a screening that did not block the write
#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub action: Enforcement,
    pub result: ScoreResult,
    /// The case opened or refreshed for this submission, when one was
    pub case: Option<ModerationCase>,
}

/// Moderation guard
pub struct ModerationGuard {
    scoring: Arc<ScoringEngine>,
    cases: Arc<CaseManager>,
    listings: Arc<ListingStore>,
    policy: Arc<PolicyConfig>,
}

impl ModerationGuard {
    pub fn new(
        scoring: Arc<ScoringEngine>,
        cases: Arc<CaseManager>,
        listings: Arc<ListingStore>,
        policy: Arc<PolicyConfig>,
    ) -> Self {
        Self {
            scoring,
            cases,
            listings,
            policy,
        }
    }

    /// Score a submission and apply the routed enforcement.
    ///
    /// Block rejects the write: the error carries the score but no rule
    /// detail, and when the submission names an existing listing the case
    /// is refreshed first so staff can see what fired. ForceReview keeps
    /// the write but forces the listing into review and opens/refreshes
    /// its case. Allow does nothing.
    ///
    /// A rule-store failure propagates: a listing is never silently
    /// allowed, or scored against partial rules.
    pub async fn screen(&self, submission: ListingSubmission) -> ModResult<ScreeningOutcome> {
        let result = self.scoring.score(&submission.input).await?;
        let action = route_score(result.score, &self.policy);

        metrics::LISTINGS_SCREENED_TOTAL
            .with_label_values(&[action.as_str()])
            .inc();
        metrics::MODERATION_SCORE.observe(result.score as f64);

        match action {
            Enforcement::Allow => {
                tracing::debug!(score = result.score, "submission allowed");
                Ok(ScreeningOutcome {
                    action,
                    result,
                    case: None,
                })
            }
            Enforcement::ForceReview => {
                let case = self.track_case(&submission, &result).await?;
                if let Some(ad_id) = submission.ad_id.as_deref() {
                    self.listings.force_pending_review(ad_id).await?;
                }
                tracing::info!(
                    score = result.score,
                    ad_id = submission.ad_id.as_deref().unwrap_or("<new>"),
                    "submission forced into review"
                );
                Ok(ScreeningOutcome {
                    action,
                    result,
                    case,
                })
            }
            Enforcement::Block => {
                // A blocked create never persists, so there is no row for a
                // case to reference; a blocked update refreshes the case
                // before the write is rejected.
                self.track_case(&submission, &result).await?;
                tracing::info!(
                    score = result.score,
                    ad_id = submission.ad_id.as_deref().unwrap_or("<new>"),
                    "submission blocked"
                );
                Err(ModError::ModerationBlocked {
                    score: result.score,
                })
            }
        }
    }

    async fn track_case(
        &self,
        submission: &ListingSubmission,
        result: &ScoreResult,
    ) -> ModResult<Option<ModerationCase>> {
        let Some(ad_id) = submission.ad_id.as_deref() else {
            return Ok(None);
        };

        let case = self
            .cases
            .open_or_refresh(
                ad_id,
                submission.user_id.as_deref(),
                submission.input.country.as_deref(),
                submission.input.category_slug.as_deref(),
                result,
            )
            .await?;

        Ok(Some(case))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listings::ListingStatus;
    use crate::moderation::cases::CaseStatus;
    use crate::moderation::rules::{NewRule, RuleStore};
    use sqlx::SqlitePool;

    async fn test_guard() -> (ModerationGuard, Arc<CaseManager>, Arc<ListingStore>, RuleStore, SqlitePool) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let policy = Arc::new(PolicyConfig {
            review_threshold: 50,
            block_threshold: 85,
            default_keywords: vec![],
            default_regexes: vec![],
            strict_country: None,
            high_risk_categories: vec![],
        });
        let rules = RuleStore::new(pool.clone());
        let scoring = Arc::new(ScoringEngine::new(rules.clone(), policy.clone()));
        let cases = Arc::new(CaseManager::new(pool.clone()));
        let listings = Arc::new(ListingStore::new(pool.clone()));
        let guard = ModerationGuard::new(scoring, cases.clone(), listings.clone(), policy);

        (guard, cases, listings, rules, pool)
    }

    async fn seed_listing(pool: &SqlitePool, id: &str) {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO listing (id, user_id, status, created_at, updated_at) VALUES (?, 'user-1', 'published', ?, ?)",
        )
        .bind(id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn weighted_rule(rules: &RuleStore, keyword: &str, weight: i64) {
        rules
            .create_rule(NewRule {
                name: format!("{}-rule", keyword),
                country: None,
                category_slug: None,
                keywords: vec![keyword.to_string()],
                regexes: vec![],
                weight: Some(weight),
                is_active: true,
            })
            .await
            .unwrap();
    }

    fn submission(ad_id: Option<&str>, title: &str) -> ListingSubmission {
        ListingSubmission {
            ad_id: ad_id.map(String::from),
            user_id: Some("user-1".to_string()),
            input: ModerationInput {
                title: Some(title.to_string()),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_clean_submission_is_allowed_without_a_case() {
        let (guard, cases, _, _, _) = test_guard().await;

        let outcome = guard
            .screen(submission(Some("ad-1"), "wooden table"))
            .await
            .unwrap();

        assert_eq!(outcome.action, Enforcement::Allow);
        assert!(outcome.case.is_none());
        assert!(matches!(
            cases.get_case(1).await,
            Err(ModError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_risky_submission_forces_review_and_opens_case() {
        let (guard, _, listings, rules, pool) = test_guard().await;
        weighted_rule(&rules, "stolen", 60).await;
        seed_listing(&pool, "ad-1").await;

        let outcome = guard
            .screen(submission(Some("ad-1"), "stolen phone"))
            .await
            .unwrap();

        assert_eq!(outcome.action, Enforcement::ForceReview);
        let case = outcome.case.unwrap();
        assert_eq!(case.ad_id, "ad-1");
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.score, 60);
        assert_eq!(
            listings.status("ad-1").await.unwrap(),
            Some(ListingStatus::PendingReview)
        );
    }

    #[tokio::test]
    async fn test_blocked_submission_surfaces_score_only() {
        let (guard, _, _, rules, _) = test_guard().await;
        weighted_rule(&rules, "weapons", 90).await;

        let result = guard.screen(submission(None, "weapons cache")).await;

        match result {
            Err(ModError::ModerationBlocked { score }) => assert_eq!(score, 90),
            other => panic!("expected ModerationBlocked, got {:?}", other.map(|o| o.action)),
        }
    }

    #[tokio::test]
    async fn test_blocked_update_still_refreshes_the_case() {
        let (guard, cases, _, rules, _) = test_guard().await;
        weighted_rule(&rules, "weapons", 90).await;

        let result = guard.screen(submission(Some("ad-1"), "weapons cache")).await;
        assert!(matches!(result, Err(ModError::ModerationBlocked { .. })));

        let listed = cases
            .list_cases(CaseStatus::Open, None, None)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].case.ad_id, "ad-1");
        assert_eq!(listed[0].case.score, 90);
    }

    #[tokio::test]
    async fn test_create_flow_without_ad_id_opens_no_case() {
        let (guard, cases, _, rules, _) = test_guard().await;
        weighted_rule(&rules, "stolen", 60).await;

        let outcome = guard.screen(submission(None, "stolen phone")).await.unwrap();

        assert_eq!(outcome.action, Enforcement::ForceReview);
        assert!(outcome.case.is_none());
        let listed = cases.list_cases(CaseStatus::Open, None, None).await.unwrap();
        assert!(listed.is_empty());
    }
}
