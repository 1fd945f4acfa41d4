/// Weighted risk scoring for listing submissions
///
/// Aggregates three rule sources over the normalized text: fixed heuristics,
/// process-wide default keyword/regex lists, and staff-configured dynamic
/// rules scoped by country/category. Produces a clamped 0-100 score with an
/// ordered, attributed reason list.
use crate::{
    config::PolicyConfig,
    error::ModResult,
    moderation::normalize::{has_link_marker, normalize_text},
    moderation::rules::RuleStore,
};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Fixed heuristic weights. These are engine built-ins, not configuration:
// changing them changes the meaning of every historical score.
const MESSAGING_HANDLE_WEIGHT: i64 = 15;
const LINK_WEIGHT: i64 = 15;
const DIGIT_DENSITY_WEIGHT: i64 = 10;
const DEFAULT_KEYWORD_WEIGHT: i64 = 25;
const DEFAULT_REGEX_WEIGHT: i64 = 20;
const STRICT_COUNTRY_WEIGHT: i64 = 5;
const HIGH_RISK_CATEGORY_WEIGHT: i64 = 5;

/// Off-platform contact tokens checked against the normalized text
const MESSAGING_HANDLES: &[&str] = &["whatsapp", "telegram", "snap", "viber", "wechat"];

/// Fraction of non-space characters that must be digits before the digit
/// density heuristic fires
const DIGIT_DENSITY_THRESHOLD: f64 = 0.3;
const DIGIT_DENSITY_MIN_DIGITS: usize = 6;

/// Longest normalized-text echo kept on a score result
const TEXT_PREVIEW_MAX: usize = 500;

/// A listing submission as seen by the moderation pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub category_slug: Option<String>,
    pub country: Option<String>,
}

/// What kind of signal produced a reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonKind {
    Heuristic,
    Keyword,
    Regex,
}

/// One matched signal, with enough structure for a reviewer to see why
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reason {
    pub kind: ReasonKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    pub weight: i64,
    pub excerpt: String,
}

impl Reason {
    fn heuristic(weight: i64, excerpt: impl Into<String>) -> Self {
        Self {
            kind: ReasonKind::Heuristic,
            rule_id: None,
            rule_name: None,
            weight,
            excerpt: excerpt.into(),
        }
    }
}

/// Result of one evaluation: clamped score plus ordered reasons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: i64,
    pub reasons: Vec<Reason>,
    pub text_preview: String,
}

/// Compile a rule pattern case-insensitively. A pattern that fails to
/// compile is logged and skipped: one bad rule must never fail evaluation
/// for every listing.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "skipping unparseable moderation pattern");
            None
        }
    }
}

/// Scoring engine
///
/// Read-only against the rule store; holds the immutable policy injected at
/// construction so an evaluation is a function of (input, rules, policy).
pub struct ScoringEngine {
    rules: RuleStore,
    policy: Arc<PolicyConfig>,
    /// Default patterns compiled once at startup, bad ones already dropped
    default_regexes: Vec<Regex>,
}

impl ScoringEngine {
    pub fn new(rules: RuleStore, policy: Arc<PolicyConfig>) -> Self {
        let default_regexes = policy
            .default_regexes
            .iter()
            .filter_map(|p| compile_pattern(p))
            .collect();

        Self {
            rules,
            policy,
            default_regexes,
        }
    }

    /// Score a submission.
    ///
    /// Evaluation order (which is also reason order): heuristics, default
    /// keywords, default regexes, dynamic rules, context boosts. The order
    /// never changes the final score; weights are purely additive and the
    /// sum is clamped to [0, 100].
    ///
    /// The only hard failure is the dynamic-rule lookup: scoring with a
    /// partial rule set would produce a non-reproducible, under-scored
    /// result, so a store failure propagates to the caller.
    pub async fn score(&self, input: &ModerationInput) -> ModResult<ScoreResult> {
        let raw = format!(
            "{} {}",
            input.title.as_deref().unwrap_or(""),
            input.description.as_deref().unwrap_or("")
        );
        let normalized = normalize_text(&raw);

        let mut total: i64 = 0;
        let mut reasons: Vec<Reason> = Vec::new();
        let mut add = |reasons: &mut Vec<Reason>, reason: Reason| {
            total += reason.weight;
            reasons.push(reason);
        };

        // Heuristics: off-platform contact handles
        for handle in MESSAGING_HANDLES {
            if normalized.contains(handle) {
                add(
                    &mut reasons,
                    Reason::heuristic(MESSAGING_HANDLE_WEIGHT, *handle),
                );
            }
        }

        // Heuristics: link markers, checked against the raw text because
        // normalization already stripped the URLs
        if has_link_marker(&raw) {
            add(&mut reasons, Reason::heuristic(LINK_WEIGHT, "contains link"));
        }

        // Heuristics: digit density in the normalized text
        let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
        let visible = normalized.chars().filter(|c| !c.is_whitespace()).count();
        if digits >= DIGIT_DENSITY_MIN_DIGITS
            && visible > 0
            && digits as f64 / visible as f64 > DIGIT_DENSITY_THRESHOLD
        {
            add(
                &mut reasons,
                Reason::heuristic(DIGIT_DENSITY_WEIGHT, format!("{} digits", digits)),
            );
        }

        // Default keywords from process configuration
        for keyword in &self.policy.default_keywords {
            if normalized.contains(keyword.as_str()) {
                add(
                    &mut reasons,
                    Reason {
                        kind: ReasonKind::Keyword,
                        rule_id: None,
                        rule_name: None,
                        weight: DEFAULT_KEYWORD_WEIGHT,
                        excerpt: keyword.clone(),
                    },
                );
            }
        }

        // Default regexes from process configuration
        for re in &self.default_regexes {
            if let Some(m) = re.find(&normalized) {
                add(
                    &mut reasons,
                    Reason {
                        kind: ReasonKind::Regex,
                        rule_id: None,
                        rule_name: None,
                        weight: DEFAULT_REGEX_WEIGHT,
                        excerpt: m.as_str().to_string(),
                    },
                );
            }
        }

        // Dynamic rules, scope-matched by the store. A rule contributes once
        // per matching keyword or pattern; there is no per-rule cap.
        let rules = self
            .rules
            .active_rules(input.country.as_deref(), input.category_slug.as_deref())
            .await?;

        for rule in &rules {
            for keyword in &rule.keywords {
                if normalized.contains(keyword.as_str()) {
                    add(
                        &mut reasons,
                        Reason {
                            kind: ReasonKind::Keyword,
                            rule_id: Some(rule.id),
                            rule_name: Some(rule.name.clone()),
                            weight: rule.weight,
                            excerpt: keyword.clone(),
                        },
                    );
                }
            }
            for pattern in &rule.regexes {
                if let Some(re) = compile_pattern(pattern) {
                    if let Some(m) = re.find(&normalized) {
                        add(
                            &mut reasons,
                            Reason {
                                kind: ReasonKind::Regex,
                                rule_id: Some(rule.id),
                                rule_name: Some(rule.name.clone()),
                                weight: rule.weight,
                                excerpt: m.as_str().to_string(),
                            },
                        );
                    }
                }
            }
        }

        // Context boosts
        if let (Some(strict), Some(country)) =
            (self.policy.strict_country.as_deref(), input.country.as_deref())
        {
            if country.eq_ignore_ascii_case(strict) {
                add(
                    &mut reasons,
                    Reason::heuristic(STRICT_COUNTRY_WEIGHT, format!("strict country {}", strict)),
                );
            }
        }
        if let Some(category) = input.category_slug.as_deref() {
            if self
                .policy
                .high_risk_categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
            {
                add(
                    &mut reasons,
                    Reason::heuristic(
                        HIGH_RISK_CATEGORY_WEIGHT,
                        format!("high-risk category {}", category.to_lowercase()),
                    ),
                );
            }
        }

        let mut text_preview = normalized;
        if text_preview.len() > TEXT_PREVIEW_MAX {
            let cut = (0..=TEXT_PREVIEW_MAX)
                .rev()
                .find(|i| text_preview.is_char_boundary(*i))
                .unwrap_or(0);
            text_preview.truncate(cut);
        }

        Ok(ScoreResult {
            score: total.clamp(0, 100),
            reasons,
            text_preview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::rules::NewRule;
    use sqlx::SqlitePool;

    async fn test_store() -> RuleStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        RuleStore::new(pool)
    }

    fn policy() -> Arc<PolicyConfig> {
        Arc::new(PolicyConfig {
            review_threshold: 50,
            block_threshold: 85,
            default_keywords: vec!["gun".to_string()],
            default_regexes: vec![r"\bescort\w*".to_string()],
            strict_country: Some("CM".to_string()),
            high_risk_categories: vec!["phones".to_string()],
        })
    }

    fn input(title: &str, description: &str) -> ModerationInput {
        ModerationInput {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_clean_listing_scores_zero() {
        let engine = ScoringEngine::new(test_store().await, policy());

        let result = engine
            .score(&input("Wooden dining table", "Solid oak, four chairs"))
            .await
            .unwrap();

        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_handle_and_link_heuristics_both_fire() {
        let engine = ScoringEngine::new(test_store().await, policy());

        let result = engine
            .score(&ModerationInput {
                title: Some("iPhone for sale, contact me on whatsapp http://t.me/x".to_string()),
                description: Some("".to_string()),
                country: Some("CM".to_string()),
                category_slug: Some("phones".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(result.score >= MESSAGING_HANDLE_WEIGHT + LINK_WEIGHT);
        assert!(result
            .reasons
            .iter()
            .any(|r| r.kind == ReasonKind::Heuristic && r.excerpt == "whatsapp"));
        assert!(result
            .reasons
            .iter()
            .any(|r| r.kind == ReasonKind::Heuristic && r.excerpt == "contains link"));
        // The preview echoes the normalized, link-stripped text
        assert_eq!(
            result.text_preview,
            "iphone for sale contact me on whatsapp"
        );
    }

    #[tokio::test]
    async fn test_digit_density_records_digit_count() {
        let engine = ScoringEngine::new(test_store().await, policy());

        let result = engine
            .score(&input("Call 690112233 or 677445566", ""))
            .await
            .unwrap();

        assert!(result
            .reasons
            .iter()
            .any(|r| r.excerpt == "18 digits" && r.weight == DIGIT_DENSITY_WEIGHT));
    }

    #[tokio::test]
    async fn test_default_keyword_and_regex_match() {
        let engine = ScoringEngine::new(test_store().await, policy());

        let result = engine
            .score(&input("Gun for sale", "escorts available"))
            .await
            .unwrap();

        assert!(result
            .reasons
            .iter()
            .any(|r| r.kind == ReasonKind::Keyword && r.excerpt == "gun"));
        assert!(result
            .reasons
            .iter()
            .any(|r| r.kind == ReasonKind::Regex && r.excerpt == "escorts"));
        assert_eq!(result.score, DEFAULT_KEYWORD_WEIGHT + DEFAULT_REGEX_WEIGHT);
    }

    #[tokio::test]
    async fn test_dynamic_rule_contributes_its_weight_with_attribution() {
        let store = test_store().await;
        let rule = store
            .create_rule(NewRule {
                name: "stolen goods".to_string(),
                country: None,
                category_slug: Some("phones".to_string()),
                keywords: vec!["stolen".to_string()],
                regexes: vec![],
                weight: Some(30),
                is_active: true,
            })
            .await
            .unwrap();
        let engine = ScoringEngine::new(store, policy());

        let result = engine
            .score(&ModerationInput {
                description: Some("selling a stolen phone".to_string()),
                category_slug: Some("phones".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let matched: Vec<_> = result
            .reasons
            .iter()
            .filter(|r| r.rule_id == Some(rule.id))
            .collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].kind, ReasonKind::Keyword);
        assert_eq!(matched[0].weight, 30);
        assert_eq!(matched[0].rule_name.as_deref(), Some("stolen goods"));
        // 30 from the rule + 5 high-risk category boost
        assert_eq!(result.score, 35);
    }

    #[tokio::test]
    async fn test_inactive_rule_never_contributes() {
        let store = test_store().await;
        store
            .create_rule(NewRule {
                name: "disabled".to_string(),
                country: None,
                category_slug: None,
                keywords: vec!["stolen".to_string()],
                regexes: vec![],
                weight: Some(90),
                is_active: false,
            })
            .await
            .unwrap();
        let engine = ScoringEngine::new(store, policy());

        let result = engine
            .score(&input("stolen phone", ""))
            .await
            .unwrap();

        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rule_regex_is_skipped_not_fatal() {
        let store = test_store().await;
        store
            .create_rule(NewRule {
                name: "broken".to_string(),
                country: None,
                category_slug: None,
                keywords: vec![],
                regexes: vec!["(unclosed".to_string()],
                weight: Some(50),
                is_active: true,
            })
            .await
            .unwrap();
        let engine = ScoringEngine::new(store, policy());

        let result = engine.score(&input("unclosed deal", "")).await.unwrap();

        assert_eq!(result.score, 0);
        assert!(result.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_score_is_clamped_to_100() {
        let store = test_store().await;
        for i in 0..6 {
            store
                .create_rule(NewRule {
                    name: format!("heavy-{}", i),
                    country: None,
                    category_slug: None,
                    keywords: vec!["cash".to_string()],
                    regexes: vec![],
                    weight: Some(40),
                    is_active: true,
                })
                .await
                .unwrap();
        }
        let engine = ScoringEngine::new(store, policy());

        let result = engine.score(&input("cash only", "")).await.unwrap();

        assert_eq!(result.score, 100);
        // Reasons still record every match
        assert_eq!(result.reasons.len(), 6);
    }
}
