/// Threshold routing: score in, enforcement action out
use crate::config::PolicyConfig;
use serde::{Deserialize, Serialize};

/// Enforcement action for a scored submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Enforcement {
    Allow,
    ForceReview,
    Block,
}

impl Enforcement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Enforcement::Allow => "allow",
            Enforcement::ForceReview => "force_review",
            Enforcement::Block => "block",
        }
    }
}

/// Classify a score against the configured cutoffs.
///
/// The block cutoff is checked first, so it wins for any qualifying score
/// even if the thresholds are misconfigured with block below review.
/// Keeping block >= review is the configurer's responsibility.
pub fn route_score(score: i64, policy: &PolicyConfig) -> Enforcement {
    if score >= policy.block_threshold {
        Enforcement::Block
    } else if score >= policy.review_threshold {
        Enforcement::ForceReview
    } else {
        Enforcement::Allow
    }
}
