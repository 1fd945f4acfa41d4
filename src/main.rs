/// AdWatch - Listing Moderation Service
///
/// Screens marketplace listing submissions against configurable rules,
/// routes risky content through a staff review workflow, and keeps an
/// immutable audit trail of staff decisions.

mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod listings;
mod metrics;
mod moderation;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::ModResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ModResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ___       ___       __      __       __
   /   | ____/ / |     / /___ _/ /______/ /_
  / /| |/ __  /| | /| / / __ `/ __/ ___/ __ \
 / ___ / /_/ / | |/ |/ / /_/ / /_/ /__/ / / /
/_/  |_\__,_/  |__/|__/\__,_/\__/\___/_/ /_/

        Listing Moderation Service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
