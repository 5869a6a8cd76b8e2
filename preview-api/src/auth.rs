//! Authentication Module
//!
//! The gateway issues its own HS256 session tokens after an OAuth login and
//! accepts them back as `Authorization: Bearer` credentials. Token subjects
//! are identity-provider logins, looked up in the catalog's user table by
//! the auth middleware.

use crate::config::Environment;
use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use preview_core::User;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION (FOR DETERMINISTIC TESTS + CI ROBUSTNESS)
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Time checks are done here rather than inside `jsonwebtoken` so tests can
/// pin the clock.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. Negative for pre-1970 clocks.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2030-01-01 00:00:00 UTC, past any token minted at `valid()`
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// Token signing key that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> ApiResult<Self> {
        if secret.is_empty() {
            return Err(ApiError::invalid_input("JWT secret must not be empty"));
        }
        Ok(Self(SecretString::from(secret)))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,

    /// Issuer written into and required on every token.
    pub jwt_issuer: String,

    /// Token lifetime in seconds (default: 24 hours)
    pub jwt_expiration_secs: i64,

    /// Tolerated clock drift when checking `exp` (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: build_jwt_secret(INSECURE_DEFAULT_SECRET.to_string()),
            jwt_issuer: "preview-gateway".to_string(),
            jwt_expiration_secs: 86400,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `CFP_JWT_KEY`: token signing secret
    /// - `CFP_JWT_ISSUER`: token issuer (default: preview-gateway)
    /// - `CFP_JWT_EXPIRATION_SECS`: token lifetime (default: 86400)
    /// - `CFP_JWT_CLOCK_SKEW_SECS`: clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secret_str =
            std::env::var("CFP_JWT_KEY").unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_issuer: std::env::var("CFP_JWT_ISSUER")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.jwt_issuer),
            jwt_expiration_secs: std::env::var("CFP_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            jwt_clock_skew_secs: std::env::var("CFP_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_clock_skew_secs),
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse insecure signing keys in production.
    ///
    /// In development, warnings are logged but startup continues.
    pub fn validate_for_production(&self, environment: Environment) -> ApiResult<()> {
        let is_production = environment.is_production();

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start in production with the insecure default JWT secret. \
                     Set CFP_JWT_KEY to a secure value.",
                ));
            }
            tracing::warn!(
                "SECURITY WARNING: using the insecure default JWT secret. \
                 Set CFP_JWT_KEY to a random value of at least 32 characters \
                 before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    length = self.jwt_secret.len(),
                    "SECURITY WARNING: JWT secret is shorter than 32 characters"
                );
            }
        }

        Ok(())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::from(INSECURE_DEFAULT_SECRET.to_string())),
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Session token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity-provider login
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Profile page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
}

impl Claims {
    pub fn for_user(user: &User, config: &AuthConfig) -> Self {
        let now = config.clock.now_epoch_secs();
        Self {
            sub: user.id.clone(),
            iss: config.jwt_issuer.clone(),
            iat: now,
            exp: now + config.jwt_expiration_secs,
            avatar: user.avatar.clone(),
            home: user.home.clone(),
        }
    }
}

// ============================================================================
// TOKEN FUNCTIONS
// ============================================================================

/// Mint a session token for `user`.
pub fn issue_token(config: &AuthConfig, user: &User) -> ApiResult<String> {
    let claims = Claims::for_user(user, config);
    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    encode(&Header::new(Algorithm::HS256), &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Validate a session token and extract its claims.
///
/// The signature and issuer are checked by `jsonwebtoken`; expiry is
/// checked against the configured clock. Every rejection is a bare 403.
pub fn validate_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_issuer(&[config.jwt_issuer.as_str()]);
    validation.required_spec_claims = HashSet::from(["exp".to_string(), "iss".to_string()]);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            ApiError::forbidden()
        })?
        .claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error("Server time configuration error"));
    }

    if claims.exp < now - config.jwt_clock_skew_secs {
        tracing::debug!(user = %claims.sub, "Rejected expired session token");
        return Err(ApiError::forbidden());
    }

    Ok(claims)
}

/// Extract the token from an `Authorization: Bearer <token>` value.
///
/// Any other scheme yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let rest = header.strip_prefix("Bearer")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// TESTS
// ============================================================================
