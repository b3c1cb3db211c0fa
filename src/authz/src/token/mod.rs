//! Token verification
//!
//! A verifier runs in exactly one mode:
//!
//! - **Shared secret**: HS256 signatures checked against the configured secret.
//! - **Key set**: RS256 signatures checked against the RSA key named by the
//!   token's `kid` header, resolved through a [`JwkCache`].
//!
//! `exp` and `nbf` are enforced when present. When an issuer is configured
//! the `iss` claim must be present and match it exactly. Every failure surfaces as
//! [`ViravaError::Authentication`].

mod jwks;

pub use jwks::{CacheStats, HttpJwkSource, JwkCache, JwkSource};

use std::collections::HashSet;
use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::claims::Claims;
use crate::config::AuthTokenConfig;
use crate::error::{Result, ViravaError};

enum KeyResolver {
    Secret(DecodingKey),
    JwkSet(JwkCache),
}

/// Verifies signed tokens and yields their claims
pub struct TokenVerifier {
    keys: KeyResolver,
    validation: Validation,
}

impl TokenVerifier {
    /// # Errors
    ///
    /// Configuration error unless exactly one of the secret and the key set
    /// URL is configured, or when the URL is malformed.
    pub fn new(config: &AuthTokenConfig) -> Result<Self> {
        let keys = match (&config.secret, &config.jwk_set_url) {
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
            (Some(secret), None) => {
                info!("Token verifier using shared secret (HS256)");
                KeyResolver::Secret(DecodingKey::from_secret(secret.as_bytes()))
            }
            (None, Some(url)) => {
                info!("Token verifier using JWK set at {}", url);
                let source = HttpJwkSource::new(url, config.jwk_fetch_timeout)?;
                KeyResolver::JwkSet(
                    JwkCache::new(Arc::new(source), config.jwk_cache_capacity, config.jwk_cache_ttl)?
                        .with_refetch_interval(config.jwk_refetch_interval),
                )
            }
        };

        Ok(Self::with_keys(keys, config.issuer.as_deref()))
    }

    /// Key set verifier reading keys from an arbitrary source
    ///
    /// The URL in `config` is ignored; a configured secret is an error.
    pub fn with_jwk_source(config: &AuthTokenConfig, source: Arc<dyn JwkSource>) -> Result<Self> {
        if config.secret.is_some() {
            return Err(ViravaError::configuration(
                "A shared secret cannot be combined with a JWK source",
            ));
        }

        let cache = JwkCache::new(source, config.jwk_cache_capacity, config.jwk_cache_ttl)?
            .with_refetch_interval(config.jwk_refetch_interval);
        Ok(Self::with_keys(KeyResolver::JwkSet(cache), config.issuer.as_deref()))
    }

    fn with_keys(keys: KeyResolver, issuer: Option<&str>) -> Self {
        let algorithm = match keys {
            KeyResolver::Secret(_) => Algorithm::HS256,
            KeyResolver::JwkSet(_) => Algorithm::RS256,
        };

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        Self { keys, validation }
    }

    /// Verify a raw token and return its claims
    pub async fn verify(&self, token: &str) -> Result<Claims> {
        let result = self.verify_token(token).await;
        if let Err(e) = &result {
            warn!("Token verification failed: {}", e);
        }
        result
    }

    async fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = match &self.keys {
            KeyResolver::Secret(key) => decode::<Map<String, Value>>(token, key, &self.validation)?,
            KeyResolver::JwkSet(cache) => {
                let kid = decode_header(token)?
                    .kid
                    .ok_or_else(|| ViravaError::authentication("Token header has no key id"))?;
                let key = cache.get(&kid).await?;
                decode::<Map<String, Value>>(token, &key, &self.validation)?
            }
        };

        Ok(Claims::from(data.claims))
    }

    /// Key cache statistics; `None` in shared-secret mode
    pub fn jwk_cache_stats(&self) -> Option<CacheStats> {
        match &self.keys {
            KeyResolver::Secret(_) => None,
            KeyResolver::JwkSet(cache) => Some(cache.stats()),
        }
    }
}
