//! Static configuration: token settings and role tables
//!
//! ## Environment variables
//!
//! - `VIRAVA_USERNAME_PATH` - claim path of the username (required)
//! - `VIRAVA_ROLES_PATH` - claim path of the role list (required)
//! - `VIRAVA_EMAIL_PATH` - claim path of the email
//! - `VIRAVA_COMPANY_USER_PATH` - claim path of the company-user flag
//! - `VIRAVA_SECRET` - HMAC shared secret
//! - `VIRAVA_JWK_SET_URL` - remote key set URL
//! - `VIRAVA_ISSUER` - required `iss` claim value
//! - `VIRAVA_JWK_CACHE_CAPACITY` - cached keys (default: 10)
//! - `VIRAVA_JWK_CACHE_TTL_SECS` - key lifetime in seconds (default: 86400)
//! - `VIRAVA_JWK_FETCH_TIMEOUT_SECS` - key set fetch timeout (default: 5)
//! - `VIRAVA_JWK_REFETCH_INTERVAL_SECS` - minimum time between key set fetches (default: 6)
//!
//! Exactly one of `VIRAVA_SECRET` and `VIRAVA_JWK_SET_URL` must be set.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::info;
use virava_core::{Resource, Role};

use crate::error::{Result, ViravaError};
use crate::role_config::RoleConfig;

pub const DEFAULT_JWK_CACHE_CAPACITY: usize = 10;
pub const DEFAULT_JWK_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_JWK_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// At most ten key set fetches per minute
pub const DEFAULT_JWK_REFETCH_INTERVAL: Duration = Duration::from_secs(6);

/// Token verification and claim extraction settings
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthTokenConfig {
    /// Dotted claim path of the username
    pub username_path: String,

    /// Dotted claim path of the role list
    pub roles_path: String,

    #[serde(default)]
    pub email_path: Option<String>,

    #[serde(default)]
    pub company_user_path: Option<String>,

    /// HMAC shared secret (HS256)
    #[serde(default)]
    pub secret: Option<String>,

    /// Remote key set URL (RS256)
    #[serde(default)]
    pub jwk_set_url: Option<String>,

    /// Exact `iss` claim required when set
    #[serde(default)]
    pub issuer: Option<String>,

    #[serde(default = "default_jwk_cache_capacity")]
    pub jwk_cache_capacity: usize,

    #[serde(
        default = "default_jwk_cache_ttl",
        deserialize_with = "duration_from_secs"
    )]
    pub jwk_cache_ttl: Duration,

    #[serde(
        default = "default_jwk_fetch_timeout",
        deserialize_with = "duration_from_secs"
    )]
    pub jwk_fetch_timeout: Duration,

    #[serde(
        default = "default_jwk_refetch_interval",
        deserialize_with = "duration_from_secs"
    )]
    pub jwk_refetch_interval: Duration,
}

fn default_jwk_cache_capacity() -> usize {
    DEFAULT_JWK_CACHE_CAPACITY
}

fn default_jwk_cache_ttl() -> Duration {
    DEFAULT_JWK_CACHE_TTL
}

fn default_jwk_fetch_timeout() -> Duration {
    DEFAULT_JWK_FETCH_TIMEOUT
}

fn default_jwk_refetch_interval() -> Duration {
    DEFAULT_JWK_REFETCH_INTERVAL
}

fn duration_from_secs<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl AuthTokenConfig {
    /// Config with the two required claim paths and default cache settings
    pub fn new(username_path: impl Into<String>, roles_path: impl Into<String>) -> Self {
        Self {
            username_path: username_path.into(),
            roles_path: roles_path.into(),
            email_path: None,
            company_user_path: None,
            secret: None,
            jwk_set_url: None,
            issuer: None,
            jwk_cache_capacity: DEFAULT_JWK_CACHE_CAPACITY,
            jwk_cache_ttl: DEFAULT_JWK_CACHE_TTL,
            jwk_fetch_timeout: DEFAULT_JWK_FETCH_TIMEOUT,
            jwk_refetch_interval: DEFAULT_JWK_REFETCH_INTERVAL,
        }
    }

    pub fn with_email_path(mut self, path: impl Into<String>) -> Self {
        self.email_path = Some(path.into());
        self
    }

    pub fn with_company_user_path(mut self, path: impl Into<String>) -> Self {
        self.company_user_path = Some(path.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_jwk_set_url(mut self, url: impl Into<String>) -> Self {
        self.jwk_set_url = Some(url.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_jwk_cache_capacity(mut self, capacity: usize) -> Self {
        self.jwk_cache_capacity = capacity;
        self
    }

    pub fn with_jwk_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwk_cache_ttl = ttl;
        self
    }

    pub fn with_jwk_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwk_fetch_timeout = timeout;
        self
    }

    pub fn with_jwk_refetch_interval(mut self, interval: Duration) -> Self {
        self.jwk_refetch_interval = interval;
        self
    }

    /// Load from `VIRAVA_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| ViravaError::configuration(format!("{key} must be set")))
        };

        let mut config = Self::new(required("VIRAVA_USERNAME_PATH")?, required("VIRAVA_ROLES_PATH")?);
        config.email_path = get("VIRAVA_EMAIL_PATH");
        config.company_user_path = get("VIRAVA_COMPANY_USER_PATH");
        config.secret = get("VIRAVA_SECRET");
        config.jwk_set_url = get("VIRAVA_JWK_SET_URL");
        config.issuer = get("VIRAVA_ISSUER");

        if let Some(value) = get("VIRAVA_JWK_CACHE_CAPACITY") {
            config.jwk_cache_capacity = parse_number("VIRAVA_JWK_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = get("VIRAVA_JWK_CACHE_TTL_SECS") {
            config.jwk_cache_ttl = Duration::from_secs(parse_number("VIRAVA_JWK_CACHE_TTL_SECS", &value)?);
        }
        if let Some(value) = get("VIRAVA_JWK_FETCH_TIMEOUT_SECS") {
            config.jwk_fetch_timeout =
                Duration::from_secs(parse_number("VIRAVA_JWK_FETCH_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = get("VIRAVA_JWK_REFETCH_INTERVAL_SECS") {
            config.jwk_refetch_interval =
                Duration::from_secs(parse_number("VIRAVA_JWK_REFETCH_INTERVAL_SECS", &value)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check claim paths, key source exclusivity and cache bounds
    pub fn validate(&self) -> Result<()> {
        if self.username_path.trim().is_empty() {
            return Err(ViravaError::configuration("Username claim path cannot be empty"));
        }
        if self.roles_path.trim().is_empty() {
            return Err(ViravaError::configuration("Roles claim path cannot be empty"));
        }

        match (&self.secret, &self.jwk_set_url) {
            (Some(_), Some(_)) => {
                return Err(ViravaError::configuration(
                    "Both secret and JWK set URL are configured; choose one",
                ))
            }
            (None, None) => {
                return Err(ViravaError::configuration(
                    "Either a secret or a JWK set URL must be configured",
                ))
            }
            _ => {}
        }

        if self.jwk_set_url.is_some() && self.jwk_cache_capacity == 0 {
            return Err(ViravaError::configuration("JWK cache capacity must be positive"));
        }

        Ok(())
    }
}

impl fmt::Debug for AuthTokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokenConfig")
            .field("username_path", &self.username_path)
            .field("roles_path", &self.roles_path)
            .field("email_path", &self.email_path)
            .field("company_user_path", &self.company_user_path)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("jwk_set_url", &self.jwk_set_url)
            .field("issuer", &self.issuer)
            .field("jwk_cache_capacity", &self.jwk_cache_capacity)
            .field("jwk_cache_ttl", &self.jwk_cache_ttl)
            .field("jwk_fetch_timeout", &self.jwk_fetch_timeout)
            .field("jwk_refetch_interval", &self.jwk_refetch_interval)
            .finish()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ViravaError::configuration(format!("{key} is not a valid number: {value}")))
}

/// Declarative role table
///
/// ```json
/// {
///   "resources": ["ORDER", "INVOICE"],
///   "roles": [
///     { "name": "ADMIN", "permissions": [{ "resource": "ORDER", "scopes": ["CRUD"] }] }
///   ],
///   "role_mapping": { "admin": ["realm-admin", "ops"] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoleTable {
    pub resources: Vec<Resource>,
    pub roles: Vec<Role>,
    #[serde(default)]
    pub role_mapping: Option<HashMap<String, Vec<String>>>,
}

impl RoleTable {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ViravaError::configuration(format!("Invalid role table: {e}")))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ViravaError::configuration(format!("Cannot read role table {}: {e}", path.display()))
        })?;
        info!("Loading role table from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Build the permission table, applying the role mapping when present
    pub fn build(&self) -> Result<RoleConfig> {
        match &self.role_mapping {
            Some(mapping) => RoleConfig::with_role_mapping(&self.roles, self.resources.clone(), mapping),
            None => RoleConfig::new(&self.roles, self.resources.clone()),
        }
    }
}
