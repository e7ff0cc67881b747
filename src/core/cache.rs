use async_trait::async_trait;
use std::hash::Hash;
use std::time::Duration;

/// Key-value cache with optional per-entry expiry.
///
/// Expired entries behave as absent on `get`; implementations are not
/// required to evict them.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value`, replacing any existing entry. `None` never expires.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);
}
