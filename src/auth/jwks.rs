// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache Model
//!
//! - The current key set is an immutable [`SigningKeySet`] snapshot behind an
//!   `ArcSwapOption`. Readers load it without locking; a refresh builds a new
//!   set and swaps it in whole, so nobody ever sees a half-written set.
//! - Refreshes are serialised by a single async mutex. A caller that queued
//!   behind an in-flight refresh reuses the set it installed instead of
//!   fetching again.
//! - A set older than the TTL is refreshed on next use. If that refresh
//!   fails, the stale set keeps serving.
//! - Refresh attempts are spaced by `min_refresh_interval`, so a stream of
//!   tokens with unknown `kid`s cannot hammer the issuer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::Mutex;

/// Default JWKS cache TTL (10 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default spacing between refresh attempts.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on a single key fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure to produce a key for a `kid`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("no key with kid {0:?} in JWKS")]
    NotFound(String),
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<JwkSet, KeyError>> + Send + 'a>>;

/// Where the issuer's key set comes from.
pub trait JwksSource: Send + Sync {
    fn fetch(&self) -> FetchFuture<'_>;

    /// Human-readable location for logs.
    fn location(&self) -> &str;
}

/// Fetches the key set from the issuer's well-known HTTPS endpoint.
#[derive(Clone)]
pub struct HttpJwksSource {
    jwks_url: String,
    client: reqwest::Client,
}

impl HttpJwksSource {
    /// Create a source for the given JWKS URL.
    ///
    /// # Arguments
    /// - `jwks_url`: e.g. `https://tenant.auth0.com/.well-known/jwks.json`
    /// - `timeout`: bound on connect + response for each fetch
    pub fn new(jwks_url: impl Into<String>, timeout: Duration) -> Result<Self, KeyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeyError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            client,
        })
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, KeyError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| KeyError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeyError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeyError::Fetch(e.to_string()))
    }
}

impl JwksSource for HttpJwksSource {
    fn fetch(&self) -> FetchFuture<'_> {
        Box::pin(self.fetch_jwks())
    }

    fn location(&self) -> &str {
        &self.jwks_url
    }
}

/// Key type of a published verification key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    EllipticCurve,
    OctetKeyPair,
}

impl KeyFamily {
    /// Family an asymmetric algorithm needs, `None` for anything symmetric.
    pub fn for_algorithm(alg: Algorithm) -> Option<Self> {
        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Some(KeyFamily::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Some(KeyFamily::EllipticCurve),
            Algorithm::EdDSA => Some(KeyFamily::OctetKeyPair),
            _ => None,
        }
    }
}

/// A single public verification key from the issuer's key set.
pub struct SigningKey {
    kid: String,
    family: KeyFamily,
    algorithm: Option<Algorithm>,
    key: DecodingKey,
}

impl SigningKey {
    /// Build from a JWK. Returns `None` for keys that cannot verify
    /// signatures: no `kid`, encryption-only, symmetric, or unparsable.
    fn from_jwk(jwk: &Jwk) -> Option<Self> {
        let kid = jwk.common.key_id.clone()?;

        if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            return None;
        }

        let family = match &jwk.algorithm {
            AlgorithmParameters::RSA(_) => KeyFamily::Rsa,
            AlgorithmParameters::EllipticCurve(_) => KeyFamily::EllipticCurve,
            AlgorithmParameters::OctetKeyPair(_) => KeyFamily::OctetKeyPair,
            _ => return None,
        };

        let key = DecodingKey::from_jwk(jwk).ok()?;
        let algorithm = jwk.common.key_algorithm.and_then(signing_algorithm);

        Some(Self {
            kid,
            family,
            algorithm,
            key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Algorithm pinned by the JWK `alg` member, if any.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("family", &self.family)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn signing_algorithm(alg: KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// Immutable snapshot of the issuer's keys, indexed by `kid`.
#[derive(Debug)]
pub struct SigningKeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    generation: u64,
    fetched_at: Instant,
}

impl SigningKeySet {
    fn from_jwks(jwks: &JwkSet, generation: u64) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            match SigningKey::from_jwk(jwk) {
                Some(key) => {
                    keys.insert(key.kid.clone(), Arc::new(key));
                }
                None => tracing::debug!(
                    kid = jwk.common.key_id.as_deref().unwrap_or("<none>"),
                    "Skipping JWK unusable for signature verification"
                ),
            }
        }

        Self {
            keys,
            generation,
            fetched_at: Instant::now(),
        }
    }

    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// Nothing cached yet.
    Empty,
    /// Cached set outlived its TTL.
    Expired,
    /// Fresh set without the requested `kid`; the only throttled trigger.
    UnknownKid,
    /// Explicit prefetch (startup, readiness probe).
    Prefetch,
}

/// What a caller saw before queueing for the refresh lock.
#[derive(Debug, Clone, Copy)]
struct Observed {
    generation: Option<u64>,
    attempt: u64,
}

/// Bookkeeping guarded by the refresh lock.
#[derive(Default)]
struct RefreshState {
    last_unknown_kid_refresh: Option<Instant>,
    last_error: Option<KeyError>,
}

/// Resolves a `kid` to the issuer's current public key.
pub struct KeyResolver {
    source: Arc<dyn JwksSource>,
    current: ArcSwapOption<SigningKeySet>,
    refresh: Mutex<RefreshState>,
    next_generation: AtomicU64,
    attempts: AtomicU64,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    fetch_timeout: Duration,
}

impl KeyResolver {
    pub fn new(source: Arc<dyn JwksSource>) -> Self {
        Self {
            source,
            current: ArcSwapOption::empty(),
            refresh: Mutex::new(RefreshState::default()),
            next_generation: AtomicU64::new(1),
            attempts: AtomicU64::new(0),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with custom spacing between refreshes caused by unknown `kid`s.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Create with custom bound on each fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Resolve `kid` to a verification key.
    ///
    /// Served from the cached set when possible. On a miss (or a stale set)
    /// the set is refreshed once and the lookup retried against it.
    pub async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeyError> {
        let observed = self.observe();
        let snapshot = self.current.load_full();

        let trigger = match &snapshot {
            Some(set) if !set.is_stale(self.cache_ttl) => match set.get(kid) {
                Some(key) => return Ok(key),
                None => Trigger::UnknownKid,
            },
            Some(_) => Trigger::Expired,
            None => Trigger::Empty,
        };
        let observed = Observed {
            generation: snapshot.as_ref().map(|set| set.generation),
            ..observed
        };

        match self.refresh_from(observed, trigger).await {
            Ok(set) => set.get(kid).ok_or_else(|| KeyError::NotFound(kid.to_string())),
            Err(e) => {
                if let Some(key) = snapshot.as_ref().and_then(|set| set.get(kid)) {
                    tracing::warn!(error = %e, kid, "JWKS refresh failed, serving stale key");
                    return Ok(key);
                }
                Err(e)
            }
        }
    }

    /// Fetch the key set now, replacing whatever is cached.
    ///
    /// Used at startup and by the readiness check. Failures are logged and
    /// reported as `false`; cached keys stay in place.
    pub async fn warm(&self) -> bool {
        match self.refresh_from(self.observe(), Trigger::Prefetch).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    jwks_url = self.source.location(),
                    "Failed to fetch JWKS (will retry on next token)"
                );
                false
            }
        }
    }

    /// Check if a key set is currently cached and within its TTL.
    pub fn is_cached(&self) -> bool {
        self.current
            .load()
            .as_ref()
            .is_some_and(|set| !set.is_stale(self.cache_ttl))
    }

    /// Current snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<SigningKeySet>> {
        self.current.load_full()
    }

    fn observe(&self) -> Observed {
        Observed {
            generation: self.current.load().as_ref().map(|set| set.generation),
            attempt: self.attempts.load(Ordering::Acquire),
        }
    }

    /// Refresh unless a fetch already completed while we waited for the lock.
    ///
    /// Waiters share the outcome of the fetch they queued behind, success or
    /// failure. Only `UnknownKid` refreshes are spaced by `min_refresh_interval`.
    async fn refresh_from(
        &self,
        observed: Observed,
        trigger: Trigger,
    ) -> Result<Arc<SigningKeySet>, KeyError> {
        let mut state = self.refresh.lock().await;

        let current = self.current.load_full();
        if let Some(set) = &current {
            if Some(set.generation) != observed.generation {
                return Ok(Arc::clone(set));
            }
        }
        if self.attempts.load(Ordering::Acquire) != observed.attempt {
            if let Some(e) = &state.last_error {
                return Err(e.clone());
            }
        }

        if trigger == Trigger::UnknownKid {
            if let (Some(set), Some(last)) = (&current, state.last_unknown_kid_refresh) {
                if last.elapsed() < self.min_refresh_interval {
                    tracing::debug!("JWKS refresh skipped, last unknown-kid refresh too recent");
                    return Ok(Arc::clone(set));
                }
            }
            state.last_unknown_kid_refresh = Some(Instant::now());
        }

        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .unwrap_or_else(|_| Err(KeyError::Fetch("JWKS fetch timed out".to_string())));
        // Bumped after the fetch so callers that queued during it see a new attempt.
        self.attempts.fetch_add(1, Ordering::AcqRel);
        let jwks = match fetched {
            Ok(jwks) => jwks,
            Err(e) => {
                tracing::warn!(error = %e, ?trigger, "JWKS fetch failed");
                state.last_error = Some(e.clone());
                return Err(e);
            }
        };
        state.last_error = None;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let set = Arc::new(SigningKeySet::from_jwks(&jwks, generation));
        if set.is_empty() {
            tracing::warn!(
                jwks_url = self.source.location(),
                "JWKS contains no usable signing keys"
            );
        }
        tracing::info!(
            jwks_url = self.source.location(),
            published = jwks.keys.len(),
            usable = set.len(),
            generation,
            ?trigger,
            "JWKS refreshed"
        );

        self.current.store(Some(Arc::clone(&set)));
        Ok(set)
    }
}
