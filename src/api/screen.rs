/// Internal screening endpoint
///
/// Called by the listing service on every create/update, before it persists
/// anything. A blocked submission comes back as a ModerationBlocked error
/// carrying the score only; allowed and review-bound submissions get the
/// full score breakdown.
use crate::{
    auth::InternalAuthContext,
    context::AppContext,
    error::ModResult,
    moderation::{Enforcement, ListingSubmission, ModerationInput, Reason},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

/// Build internal routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/internal/moderation/screen", post(screen_listing))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenRequest {
    /// Present when an existing listing is being updated
    pub ad_id: Option<String>,
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub category_slug: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenResponse {
    pub action: Enforcement,
    pub score: i64,
    pub reasons: Vec<Reason>,
    pub text_preview: String,
    /// Case opened or refreshed for this submission, when one was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<i64>,
}

/// Screen a listing submission
async fn screen_listing(
    State(ctx): State<AppContext>,
    _auth: InternalAuthContext,
    Json(req): Json<ScreenRequest>,
) -> ModResult<Json<ScreenResponse>> {
    let outcome = ctx
        .guard
        .screen(ListingSubmission {
            ad_id: req.ad_id,
            user_id: req.user_id,
            input: ModerationInput {
                title: req.title,
                description: req.description,
                phone: req.phone,
                category_slug: req.category_slug,
                country: req.country,
            },
        })
        .await?;

    Ok(Json(ScreenResponse {
        action: outcome.action,
        score: outcome.result.score,
        reasons: outcome.result.reasons,
        text_preview: outcome.result.text_preview,
        case_id: outcome.case.map(|c| c.id),
    }))
}
