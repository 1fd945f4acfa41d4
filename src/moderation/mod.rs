/// Moderation decision pipeline
///
/// Normalizes submission text, scores it against heuristics and configured
/// rules, routes the score to an enforcement action, and tracks review
/// cases through staff decisions.
pub mod cases;
pub mod guard;
pub mod normalize;
pub mod router;
pub mod rules;
pub mod score;

pub use cases::{CaseDetail, CaseManager, CaseStatus, DecisionAction, ModerationCase, ModerationDecision};
pub use guard::{ListingSubmission, ModerationGuard, ScreeningOutcome};
pub use router::{route_score, Enforcement};
pub use rules::{ModerationRule, NewRule, RuleStore};
pub use score::{ModerationInput, Reason, ReasonKind, ScoreResult, ScoringEngine};
