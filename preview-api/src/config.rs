//! Gateway Configuration Module
//!
//! Everything the gateway needs besides the database and token settings is
//! loaded here from environment variables, with development-friendly
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use preview_core::UserId;
use preview_storage::CacheConfig;
use secrecy::SecretString;

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Deployment environment, as set by `CFP_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        })
    }
}

impl Environment {
    pub fn from_env() -> Self {
        std::env::var("CFP_ENVIRONMENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Log output format, as set by `CFP_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        })
    }
}

impl LogFormat {
    pub fn from_env() -> Self {
        std::env::var("CFP_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

// ============================================================================
// IDENTITY PROVIDERS
// ============================================================================

/// GitHub OAuth application and webhook settings.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// Shared webhook secret. Signature checks are skipped when unset.
    pub webhook_secret: Option<SecretString>,
    pub authorize_url: String,
    pub token_url: String,
    /// REST API base, without trailing slash.
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            webhook_secret: None,
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl GithubConfig {
    /// Load from `GH_CLIENT_ID`, `GH_CLIENT_SECRET`, `GH_WEBHOOK_SECRET`,
    /// `GH_OAUTH_URL` (authorize/token base) and `GH_API_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let oauth_base = std::env::var("GH_OAUTH_URL").ok();

        Self {
            client_id: std::env::var("GH_CLIENT_ID").unwrap_or_default(),
            client_secret: SecretString::from(
                std::env::var("GH_CLIENT_SECRET").unwrap_or_default(),
            ),
            webhook_secret: std::env::var("GH_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            authorize_url: oauth_base
                .as_deref()
                .map(|base| format!("{}/authorize", base.trim_end_matches('/')))
                .unwrap_or(defaults.authorize_url),
            token_url: oauth_base
                .as_deref()
                .map(|base| format!("{}/access_token", base.trim_end_matches('/')))
                .unwrap_or(defaults.token_url),
            api_url: std::env::var("GH_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
        }
    }
}

/// Slack OAuth application settings.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_url: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            token_url: "https://slack.com/api/oauth.access".to_string(),
        }
    }
}

impl SlackConfig {
    /// Load from `SLACK_CLIENT_ID`, `SLACK_CLIENT_SECRET` and
    /// `SLACK_TOKEN_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            client_id: std::env::var("SLACK_CLIENT_ID").unwrap_or_default(),
            client_secret: SecretString::from(
                std::env::var("SLACK_CLIENT_SECRET").unwrap_or_default(),
            ),
            token_url: std::env::var("SLACK_TOKEN_URL").unwrap_or(defaults.token_url),
        }
    }
}

// ============================================================================
// GATEWAY CONFIGURATION
// ============================================================================

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    /// Bucket holding `application/version/path` artifacts.
    pub bucket: String,
    /// Directory the `/ui` bundle is served from.
    pub app_dir: PathBuf,
    /// TTL of both catalog caches.
    pub cache_ttl: Duration,
    pub github: GithubConfig,
    pub slack: SlackConfig,
    pub log_format: LogFormat,
    /// Logins registered at startup when the catalog is in memory.
    pub seed_users: Vec<UserId>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            bucket: String::new(),
            app_dir: PathBuf::from("../dist"),
            cache_ttl: Duration::from_secs(60),
            github: GithubConfig::default(),
            slack: SlackConfig::default(),
            log_format: LogFormat::default(),
            seed_users: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Create GatewayConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CFP_ENVIRONMENT`: "production" enables strict checks (default: development)
    /// - `CFP_AWS_BUCKET`: Artifact bucket (default: empty)
    /// - `CFP_APP_DIR`: UI bundle directory (default: ../dist)
    /// - `CFP_CACHE_TTL_SECS`: Catalog cache TTL (default: 60)
    /// - `CFP_LOG_FORMAT`: "json" or "pretty" (default: pretty)
    /// - `CFP_SEED_USERS`: Comma separated logins for the in-memory catalog
    /// - `GH_*` / `SLACK_*`: identity provider settings
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: Environment::from_env(),
            bucket: std::env::var("CFP_AWS_BUCKET").unwrap_or_default(),
            app_dir: std::env::var("CFP_APP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.app_dir),
            cache_ttl: std::env::var("CFP_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            github: GithubConfig::from_env(),
            slack: SlackConfig::from_env(),
            log_format: LogFormat::from_env(),
            seed_users: std::env::var("CFP_SEED_USERS")
                .map(|s| parse_user_list(&s))
                .unwrap_or_default(),
        }
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().with_ttl(self.cache_ttl)
    }
}

fn parse_user_list(raw: &str) -> Vec<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|login| !login.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.app_dir, PathBuf::from("../dist"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert!(config.github.webhook_secret.is_none());
        assert_eq!(
            config.github.token_url,
            "https://github.com/login/oauth/access_token"
        );
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _env = EnvVarGuard::set("CFP_ENVIRONMENT", Some("prod"));
        let _bucket = EnvVarGuard::set("CFP_AWS_BUCKET", Some("previews"));
        let _ttl = EnvVarGuard::set("CFP_CACHE_TTL_SECS", Some("5"));
        let _secret = EnvVarGuard::set("GH_WEBHOOK_SECRET", Some("hook"));
        let _oauth = EnvVarGuard::set("GH_OAUTH_URL", Some("http://localhost:9000/oauth/"));

        let config = GatewayConfig::from_env();
        assert!(config.environment.is_production());
        assert_eq!(config.bucket, "previews");
        assert_eq!(config.cache_config().application_ttl, Duration::from_secs(5));
        assert_eq!(
            config.github.webhook_secret.as_ref().map(|s| s.expose_secret().to_string()),
            Some("hook".to_string())
        );
        assert_eq!(config.github.token_url, "http://localhost:9000/oauth/access_token");
    }

    #[test]
    fn test_empty_webhook_secret_is_unset() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _secret = EnvVarGuard::set("GH_WEBHOOK_SECRET", Some(""));
        assert!(GithubConfig::from_env().webhook_secret.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _secret = EnvVarGuard::set("GH_CLIENT_SECRET", Some("super-secret-value"));
        let rendered = format!("{:?}", GithubConfig::from_env());
        assert!(!rendered.contains("super-secret-value"));
    }

    #[test]
    fn test_seed_user_list() {
        assert_eq!(parse_user_list(" alice, ,bob,"), vec!["alice", "bob"]);
        assert!(parse_user_list("").is_empty());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("anything".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }
}
