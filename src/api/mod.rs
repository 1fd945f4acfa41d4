/// API routes and handlers
pub mod moderation;
pub mod screen;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(moderation::routes())
        .merge(screen::routes())
}
