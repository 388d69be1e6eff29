//! Place Resolution Module
//!
//! Resolves free-text place names produced by the planner into canonical
//! geodata records. Lookups are cached (hits and misses alike), concurrent
//! lookups of the same key share one upstream chain, and names that do not
//! match verbatim are retried through the rewrites in [`strategies`].

pub mod strategies;

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::cache::TtlCache;
use crate::config::GeodataConfig;
use crate::geodata::{GeodataProvider, SearchBias};
use crate::models::{LocationHint, PlaceRecord};
use crate::{BarrierFreeError, Result};
use strategies::{STRATEGIES, normalize};

/// Outcome of resolving one place name
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "place", rename_all = "snake_case")]
pub enum Resolution {
    Found(PlaceRecord),
    NotFound,
}

impl Resolution {
    #[must_use]
    pub fn record(&self) -> Option<&PlaceRecord> {
        match self {
            Resolution::Found(record) => Some(record),
            Resolution::NotFound => None,
        }
    }
}

/// Cache key shared by the cache and the single-flight table
#[must_use]
pub fn cache_key(name: &str, hint: &LocationHint) -> String {
    format!("place:{}|{}", normalize(name), hint.cache_key())
}

type InFlight = Mutex<HashMap<String, Arc<OnceCell<Resolution>>>>;

/// Cached, de-duplicated, multi-strategy place lookup
pub struct PlaceResolver {
    provider: Arc<dyn GeodataProvider>,
    cache: Arc<TtlCache<Resolution>>,
    in_flight: InFlight,
    search_radius_m: f64,
    attempt_timeout: Duration,
}

impl PlaceResolver {
    pub fn new(provider: Arc<dyn GeodataProvider>, cache: Arc<TtlCache<Resolution>>) -> Self {
        let defaults = GeodataConfig::default();
        Self {
            provider,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            search_radius_m: defaults.search_radius_m,
            attempt_timeout: defaults.timeout(),
        }
    }

    /// Resolver configured from the geodata settings
    pub fn from_config(
        provider: Arc<dyn GeodataProvider>,
        cache: Arc<TtlCache<Resolution>>,
        config: &GeodataConfig,
    ) -> Self {
        Self::new(provider, cache)
            .with_search_radius(config.search_radius_m)
            .with_attempt_timeout(config.timeout())
    }

    #[must_use]
    pub fn with_search_radius(mut self, radius_m: f64) -> Self {
        self.search_radius_m = radius_m;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Resolve `name` near `hint`. Never fails: exhausting every rewrite is
    /// `NotFound`, and transport errors only skip the attempt they hit.
    #[instrument(skip(self, hint), fields(city = %hint.city))]
    pub async fn resolve(&self, name: &str, hint: &LocationHint) -> Resolution {
        let key = cache_key(name, hint);

        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit for '{}'", name);
            return hit;
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let resolution = cell
            .get_or_init(|| self.lookup(&key, name, hint))
            .await
            .clone();

        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            in_flight.remove(&key);
        }

        resolution
    }

    /// Another caller may have stored the key between the first cache check
    /// and taking the cell
    async fn lookup(&self, key: &str, name: &str, hint: &LocationHint) -> Resolution {
        if let Some(hit) = self.cache.get(key) {
            debug!("Cache filled while waiting for '{}'", name);
            return hit;
        }
        self.run_chain(key, name, hint).await
    }

    async fn run_chain(&self, key: &str, name: &str, hint: &LocationHint) -> Resolution {
        let bias = SearchBias::from_hint(hint, self.search_radius_m);
        let mut tried = HashSet::new();
        let mut transport_failures = 0usize;

        for strategy in &STRATEGIES {
            for query in (strategy.rewrite)(name, hint) {
                if !tried.insert(normalize(&query)) {
                    continue;
                }

                match self.attempt(&query, bias).await {
                    Ok(Some(record)) => {
                        info!(
                            strategy = strategy.name,
                            "Resolved '{}' via query '{}'", name, query
                        );
                        let resolution = Resolution::Found(record);
                        self.cache.put(key, resolution.clone());
                        return resolution;
                    }
                    Ok(None) => {
                        debug!(strategy = strategy.name, "No match for query '{}'", query);
                    }
                    Err(e) => {
                        transport_failures += 1;
                        warn!(
                            strategy = strategy.name,
                            "Lookup failed for query '{}': {}", query, e
                        );
                    }
                }
            }
        }

        if transport_failures == 0 {
            self.cache.put(key, Resolution::NotFound);
        } else {
            // a miss caused by provider trouble is not a real negative answer
            warn!(
                "'{}' not found after {} failed attempts, not caching the miss",
                name, transport_failures
            );
        }

        info!("'{}' could not be resolved by any strategy", name);
        Resolution::NotFound
    }

    async fn attempt(&self, query: &str, bias: Option<SearchBias>) -> Result<Option<PlaceRecord>> {
        tokio::time::timeout(self.attempt_timeout, self.provider.text_search(query, bias))
            .await
            .map_err(|_| {
                BarrierFreeError::timeout(format!(
                    "place lookup for '{query}' exceeded {:?}",
                    self.attempt_timeout
                ))
            })?
    }
}
