/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::ModResult,
    listings::ListingStore,
    moderation::{CaseManager, ModerationGuard, RuleStore, ScoringEngine},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub rule_store: Arc<RuleStore>,
    pub case_manager: Arc<CaseManager>,
    pub listing_store: Arc<ListingStore>,
    pub guard: Arc<ModerationGuard>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ModResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize the moderation database
        let pool = db::create_pool(&config.storage.moderation_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        // The policy block is immutable for the process lifetime; the
        // engine and router only ever see this snapshot.
        let policy = Arc::new(config.policy.clone());

        let rule_store = Arc::new(RuleStore::new(pool.clone()));
        let scoring_engine = Arc::new(ScoringEngine::new((*rule_store).clone(), policy.clone()));
        let case_manager = Arc::new(CaseManager::new(pool.clone()));
        let listing_store = Arc::new(ListingStore::new(pool.clone()));
        let guard = Arc::new(ModerationGuard::new(
            scoring_engine.clone(),
            case_manager.clone(),
            listing_store.clone(),
            policy,
        ));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            rule_store,
            case_manager,
            listing_store,
            guard,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
