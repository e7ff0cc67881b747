use crate::core::cache::Cache;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

type SharedLoad<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// A loader passed to [`MemoryCache::get_or_load`] panicked.
///
/// The panic is caught so the key can be loaded again; every caller waiting
/// on that load receives this error converted into its own error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("loader panicked: {message}")]
pub struct LoadPanicked {
    pub message: String,
}

impl LoadPanicked {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        LoadPanicked { message }
    }
}

struct CacheValue<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheValue<V> {
    /// A TTL too large to represent as an `Instant` never expires.
    fn new(value: V, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|duration| Instant::now().checked_add(duration));
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expiry| expiry <= Instant::now())
    }
}

struct State<K, V> {
    entries: HashMap<K, CacheValue<V>>,
    // Holds `SharedLoad<V, E>`; the error type is chosen per call.
    in_flight: HashMap<K, Box<dyn Any + Send + Sync>>,
}

/// In-memory cache implementation using HashMap and Mutex
///
/// Besides the plain [`Cache`] operations it offers [`MemoryCache::get_or_load`],
/// which lets concurrent callers that miss on the same key share one load.
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<State<K, V>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new MemoryCache instance
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            })),
        }
    }

    /// Returns the fresh value for `key`, or runs `loader` to produce one.
    ///
    /// At most one loader runs per key at a time. Callers arriving while a
    /// load is pending wait for it and receive the same result, error
    /// included. A successful load is stored with `ttl`; a failed one leaves
    /// whatever entry was there untouched. A panicking loader counts as a
    /// failed load and is reported as [`LoadPanicked`].
    pub async fn get_or_load<E, F>(&self, key: K, ttl: Option<Duration>, loader: F) -> Result<V, E>
    where
        E: From<LoadPanicked> + Clone + Send + Sync + 'static,
        F: Future<Output = Result<V, E>> + Send + 'static,
    {
        let load = {
            let mut state = self.inner.lock().await;
            if let Some(entry) = state.entries.get(&key)
                && !entry.is_expired()
            {
                debug!("Cache HIT for key: {:?}", key);
                return Ok(entry.value.clone());
            }

            let pending = state
                .in_flight
                .get(&key)
                .and_then(|load| load.downcast_ref::<SharedLoad<V, E>>())
                .cloned();
            match pending {
                Some(load) => {
                    debug!("Waiting on in-flight load for key: {:?}", key);
                    load
                }
                None => {
                    debug!("Cache MISS for key: {:?}, loading", key);
                    let load = self.store_on_completion(key.clone(), ttl, loader);
                    state.in_flight.insert(key, Box::new(load.clone()));
                    load
                }
            }
        };

        load.await
    }

    fn store_on_completion<E, F>(&self, key: K, ttl: Option<Duration>, loader: F) -> SharedLoad<V, E>
    where
        E: From<LoadPanicked> + Clone + Send + Sync + 'static,
        F: Future<Output = Result<V, E>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        async move {
            // The in-flight slot must be released however the loader ends
            let result = match AssertUnwindSafe(loader).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    let panicked = LoadPanicked::from_payload(payload);
                    error!("Load for key {:?} panicked: {}", key, panicked.message);
                    Err(E::from(panicked))
                }
            };
            let mut state = inner.lock().await;
            if let Ok(value) = &result {
                debug!("Cache PUT for key: {:?}", key);
                state
                    .entries
                    .insert(key.clone(), CacheValue::new(value.clone(), ttl));
            }
            state.in_flight.remove(&key);
            result
        }
        .boxed()
        .shared()
    }

    /// Returns the stored value for `key` even if it has expired.
    pub async fn get_stale(&self, key: &K) -> Option<V> {
        let state = self.inner.lock().await;
        state.entries.get(key).map(|entry| entry.value.clone())
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new MemoryCache instance with default settings
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let state = self.inner.lock().await;
        if let Some(entry) = state.entries.get(key) {
            if entry.is_expired() {
                debug!("Cache entry expired for key: {:?}", key);
                return None;
            }
            debug!("Cache HIT for key: {:?}", key);
            return Some(entry.value.clone());
        }
        debug!("Cache MISS for key: {:?}", key);
        None
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let cache_value = CacheValue::new(value, ttl);

        let mut state = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        state.entries.insert(key, cache_value);
    }
}
