//! Remote key set retrieval and signing-key cache

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::DecodingKey;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Url;
use tracing::debug;

use crate::config::DEFAULT_JWK_REFETCH_INTERVAL;
use crate::error::{Result, ViravaError};

/// Provider of the current key set document
#[async_trait]
pub trait JwkSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet>;
}

/// Key set served over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpJwkSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpJwkSource {
    /// # Errors
    ///
    /// Configuration error when `url` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ViravaError::configuration(format!("Invalid JWK set URL [{url}]: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ViravaError::configuration(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl JwkSource for HttpJwkSource {
    async fn fetch(&self) -> Result<JwkSet> {
        debug!("Fetching JWK set from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ViravaError::authentication(format!("JWK set fetch failed: {e}")))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| ViravaError::authentication(format!("Invalid JWK set document: {e}")))
    }
}

/// Statistics about cache performance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Entries found but past their time-to-live
    pub expirations: usize,
    /// Key set documents fetched from the source
    pub fetches: usize,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

impl CachedKey {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// Last key set document received from the source
struct KeySetSnapshot {
    key_set: JwkSet,
    fetched_at: Instant,
}

impl KeySetSnapshot {
    fn is_reusable(&self, ttl: Duration, refetch_interval: Duration) -> bool {
        let age = self.fetched_at.elapsed();
        age <= ttl && age < refetch_interval
    }
}

/// Signing keys by key id, bounded in size and age
///
/// A miss is answered from the last fetched key set while it is younger
/// than the refetch interval; otherwise the whole set is fetched again.
/// Misses queue behind one async lock, so concurrent misses share a fetch
/// and unknown key ids cost at most one fetch per interval.
pub struct JwkCache {
    source: Arc<dyn JwkSource>,
    entries: Mutex<LruCache<String, CachedKey>>,
    key_set: tokio::sync::Mutex<Option<KeySetSnapshot>>,
    ttl: Duration,
    refetch_interval: Duration,
    hits: AtomicUsize,
    misses: AtomicUsize,
    expirations: AtomicUsize,
    fetches: AtomicUsize,
}

impl JwkCache {
    pub fn new(source: Arc<dyn JwkSource>, capacity: usize, ttl: Duration) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| ViravaError::configuration("JWK cache capacity must be positive"))?;

        Ok(Self {
            source,
            entries: Mutex::new(LruCache::new(capacity)),
            key_set: tokio::sync::Mutex::new(None),
            ttl,
            refetch_interval: DEFAULT_JWK_REFETCH_INTERVAL,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            expirations: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Minimum time between two fetches of the key set
    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    /// Resolve the verification key for `kid`, cache first
    pub async fn get(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.lookup(kid) {
            return Ok(key);
        }

        let key = self.resolve(kid).await?;

        self.entries.lock().put(
            kid.to_string(),
            CachedKey {
                key: key.clone(),
                fetched_at: Instant::now(),
            },
        );
        debug!("Cached signing key {}", kid);

        Ok(key)
    }

    async fn resolve(&self, kid: &str) -> Result<DecodingKey> {
        let mut snapshot = self.key_set.lock().await;

        let reusable = snapshot
            .as_ref()
            .is_some_and(|s| s.is_reusable(self.ttl, self.refetch_interval));
        if reusable {
            debug!("Resolving key id {} from the last fetched key set", kid);
        } else {
            let key_set = self.source.fetch().await?;
            self.fetches.fetch_add(1, Ordering::Relaxed);
            *snapshot = Some(KeySetSnapshot {
                key_set,
                fetched_at: Instant::now(),
            });
        }

        let key_set = snapshot
            .as_ref()
            .map(|s| &s.key_set)
            .ok_or_else(|| ViravaError::authentication("No JWK set available"))?;
        decoding_key(key_set, kid)
    }

    fn lookup(&self, kid: &str) -> Option<DecodingKey> {
        let mut entries = self.entries.lock();

        let expired = match entries.get(kid) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.key.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(kid);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            debug!("Signing key {} expired", kid);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// Pick the RSA key with the given id out of a key set
fn decoding_key(key_set: &JwkSet, kid: &str) -> Result<DecodingKey> {
    let jwk = key_set
        .find(kid)
        .ok_or_else(|| ViravaError::authentication(format!("No signing key with id [{kid}]")))?;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(DecodingKey::from_jwk(jwk)?),
        _ => Err(ViravaError::authentication(format!(
            "Signing key [{kid}] is not an RSA key"
        ))),
    }
}
