//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use estate_credits_core::CreditPolicy;

/// Default number of plan-and-apply rounds before a contended consumption gives up.
const DEFAULT_CONSUME_MAX_ATTEMPTS: u32 = 5;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/estate-credits").
    pub data_dir: String,

    /// HS256 secret the auth provider signs user JWTs with.
    pub jwt_secret: Option<String>,

    /// Expected JWT audience (default: "authenticated").
    pub jwt_audience: String,

    /// Admin API key for purchase grants.
    pub admin_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Allowance sizes applied by the ledger.
    pub credit_policy: CreditPolicy,

    /// Plan-and-apply rounds before a contended consumption is reported as a conflict.
    pub consume_max_attempts: u32,
}

/// Auth secrets file structure.
#[derive(Debug, Deserialize)]
struct AuthSecrets {
    jwt_secret: String,
    #[serde(default)]
    admin_api_key: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let (jwt_secret, admin_api_key) = load_auth_secrets();
        let defaults = CreditPolicy::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/estate-credits".into()),
            jwt_secret,
            jwt_audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "authenticated".into()),
            admin_api_key,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(64 * 1024),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            credit_policy: CreditPolicy {
                free_lifetime_allowance: env_parse("FREE_LIFETIME_ALLOWANCE")
                    .unwrap_or(defaults.free_lifetime_allowance),
                pro_monthly_allowance: env_parse("PRO_MONTHLY_ALLOWANCE")
                    .unwrap_or(defaults.pro_monthly_allowance),
            },
            consume_max_attempts: env_parse("CONSUME_MAX_ATTEMPTS")
                .filter(|attempts| *attempts > 0)
                .unwrap_or(DEFAULT_CONSUME_MAX_ATTEMPTS),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/estate-credits".into(),
            jwt_secret: None,
            jwt_audience: "authenticated".into(),
            admin_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            credit_policy: CreditPolicy::default(),
            consume_max_attempts: DEFAULT_CONSUME_MAX_ATTEMPTS,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Load auth secrets from file or environment.
fn load_auth_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [".secrets/auth.json", "../.secrets/auth.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AuthSecrets>(path) {
            tracing::info!(path = %path, "Loaded auth secrets from file");
            let admin_api_key = secrets
                .admin_api_key
                .or_else(|| std::env::var("ADMIN_API_KEY").ok());
            return (Some(secrets.jwt_secret), admin_api_key);
        }
    }

    tracing::debug!("Auth secrets file not found, using environment variables");
    (
        std::env::var("JWT_SECRET").ok(),
        std::env::var("ADMIN_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_ledger_constants() {
        let config = ServiceConfig::default();
        assert_eq!(config.credit_policy.free_lifetime_allowance, 2);
        assert_eq!(config.credit_policy.pro_monthly_allowance, 10);
        assert!(config.consume_max_attempts > 0);
    }

    #[test]
    fn missing_secrets_file_is_not_found() {
        let err = load_secrets_file::<AuthSecrets>("does/not/exist.json").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
