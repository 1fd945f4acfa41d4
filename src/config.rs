/// Configuration management for the AdWatch moderation service
use crate::error::{ModError, ModResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub moderation_db: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret for staff bearer tokens
    pub jwt_secret: String,
    /// Shared secret presented by the listing service on the internal
    /// screening endpoint
    pub internal_api_key: String,
}

/// Moderation policy configuration
///
/// Loaded once at startup and injected into the scoring engine and the
/// threshold router, so scoring is a pure function of (input, rules, policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Score at or above which a listing is forced into staff review
    pub review_threshold: i64,
    /// Score at or above which a submission is rejected outright
    pub block_threshold: i64,
    /// Keywords every evaluation checks, regardless of country/category
    pub default_keywords: Vec<String>,
    /// Regex patterns every evaluation checks
    pub default_regexes: Vec<String>,
    /// Country code that receives an additive risk boost
    pub strict_country: Option<String>,
    /// Category slugs that receive an additive risk boost
    pub high_risk_categories: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Parse a comma-separated env list, dropping empty entries
fn env_list(var: &str) -> Vec<String> {
    env::var(var)
        .unwrap_or_else(|_| String::new())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ModResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("ADWATCH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("ADWATCH_PORT")
            .unwrap_or_else(|_| "8580".to_string())
            .parse()
            .map_err(|_| ModError::Validation("Invalid port number".to_string()))?;
        let version = env::var("ADWATCH_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("ADWATCH_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let moderation_db = env::var("ADWATCH_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("moderation.sqlite"));

        let jwt_secret = env::var("ADWATCH_JWT_SECRET")
            .map_err(|_| ModError::Validation("JWT secret required".to_string()))?;
        let internal_api_key = env::var("ADWATCH_INTERNAL_API_KEY")
            .map_err(|_| ModError::Validation("Internal API key required".to_string()))?;

        let review_threshold = env::var("ADWATCH_REVIEW_THRESHOLD")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let block_threshold = env::var("ADWATCH_BLOCK_THRESHOLD")
            .unwrap_or_else(|_| "85".to_string())
            .parse()
            .unwrap_or(85);

        let default_keywords = env_list("ADWATCH_DEFAULT_KEYWORDS")
            .into_iter()
            .map(|k| k.to_lowercase())
            .collect();
        let default_regexes = env_list("ADWATCH_DEFAULT_REGEXES");

        let strict_country = env::var("ADWATCH_STRICT_COUNTRY")
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        let high_risk_categories = env_list("ADWATCH_HIGH_RISK_CATEGORIES")
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                moderation_db,
            },
            authentication: AuthConfig {
                jwt_secret,
                internal_api_key,
            },
            policy: PolicyConfig {
                review_threshold,
                block_threshold,
                default_keywords,
                default_regexes,
                strict_country,
                high_risk_categories,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ModResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ModError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ModError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        // Routing still works with inverted thresholds (block wins), but it
        // is almost certainly a misconfiguration worth surfacing.
        if self.policy.block_threshold < self.policy.review_threshold {
            tracing::warn!(
                review = self.policy.review_threshold,
                block = self.policy.block_threshold,
                "block threshold is below review threshold"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy() -> PolicyConfig {
        PolicyConfig {
            review_threshold: 50,
            block_threshold: 85,
            default_keywords: vec!["gun".to_string()],
            default_regexes: vec![],
            strict_country: Some("CM".to_string()),
            high_risk_categories: vec!["phones".to_string()],
        }
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8580,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                moderation_db: "./data/moderation.sqlite".into(),
            },
            authentication: AuthConfig {
                jwt_secret: "too-short".to_string(),
                internal_api_key: "internal".to_string(),
            },
            policy: test_policy(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        };

        assert!(config.validate().is_err());
    }
}
