//! Per-credential client cache.
//!
//! Equal credentials resolve to the same `Arc` handle. Construction runs
//! while the shard entry is held, so concurrent first uses of one credential
//! build exactly one client.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use longboard_types::{Credential, ProviderId};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Identity of a cached client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub key: String,
    pub secret: Option<String>,
}

impl CacheKey {
    #[must_use]
    pub fn new(provider: ProviderId, credential: &Credential) -> Self {
        Self {
            provider,
            key: credential.key().to_string(),
            secret: credential.secret().map(str::to_string),
        }
    }
}

struct Slot<C> {
    client: Arc<C>,
    expires_at: Option<Instant>,
}

impl<C> Slot<C> {
    fn is_stale(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Concurrent map from credential to client handle.
pub struct ClientCache<C> {
    provider: ProviderId,
    entries: DashMap<CacheKey, Slot<C>>,
}

impl<C> ClientCache<C> {
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            entries: DashMap::new(),
        }
    }

    /// The cached client for `credential`, building it with `build` on first
    /// use or once the previous entry has outlived the credential's expiry.
    pub fn get_or_insert_with<F>(&self, credential: &Credential, build: F) -> Arc<C>
    where
        F: FnOnce() -> C,
    {
        let now = Instant::now();
        // An expiry past the end of `Instant` never goes stale.
        let expires_at = credential.expiry().and_then(|secs| {
            now.checked_add(Duration::from_secs(u64::try_from(secs).unwrap_or(0)))
        });

        match self.entries.entry(CacheKey::new(self.provider, credential)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_stale(now) {
                    tracing::debug!(provider = %self.provider, "rebuilding expired client");
                    let client = Arc::new(build());
                    occupied.insert(Slot {
                        client: Arc::clone(&client),
                        expires_at,
                    });
                    client
                } else {
                    tracing::trace!(provider = %self.provider, "client cache hit");
                    Arc::clone(&occupied.get().client)
                }
            }
            Entry::Vacant(vacant) => {
                tracing::debug!(provider = %self.provider, "building client");
                let client = Arc::new(build());
                vacant.insert(Slot {
                    client: Arc::clone(&client),
                    expires_at,
                });
                client
            }
        }
    }

    /// Drop the entry for `credential`, if any.
    pub fn evict(&self, credential: &Credential) -> bool {
        self.entries
            .remove(&CacheKey::new(self.provider, credential))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_same_credential_same_handle() {
        let cache = ClientCache::new(ProviderId::Marketplace);
        let a = cache.get_or_insert_with(&Credential::with_secret("k", "s"), || 1);
        let b = cache.get_or_insert_with(&Credential::with_secret("k", "s"), || 2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_credentials_distinct_handles() {
        let cache = ClientCache::new(ProviderId::Accounting);
        let a = cache.get_or_insert_with(&Credential::with_secret("k", "s1"), || 1);
        let b = cache.get_or_insert_with(&Credential::with_secret("k", "s2"), || 2);
        let anon = cache.get_or_insert_with(&Credential::empty(), || 3);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!((*a, *b, *anon), (1, 2, 3));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_expired_entry_is_rebuilt() {
        let cache = ClientCache::new(ProviderId::Accounting);
        let cred = Credential::with_secret("k", "s").with_expiry(0);
        let a = cache.get_or_insert_with(&cred, || 1);
        let b = cache.get_or_insert_with(&cred, || 2);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*b, 2);
    }

    #[test]
    fn test_long_lived_entry_is_reused() {
        let cache = ClientCache::new(ProviderId::Accounting);
        let cred = Credential::with_secret("k", "s").with_expiry(3600);
        let a = cache.get_or_insert_with(&cred, || 1);
        let b = cache.get_or_insert_with(&cred, || 2);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_huge_expiry_never_stale() {
        let cache = ClientCache::new(ProviderId::Accounting);
        let cred = Credential::with_secret("k", "s").with_expiry(i64::MAX);
        let a = cache.get_or_insert_with(&cred, || 1);
        let b = cache.get_or_insert_with(&cred, || 2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*b, 1);
    }

    #[test]
    fn test_evict_and_clear() {
        let cache = ClientCache::new(ProviderId::Marketplace);
        let cred = Credential::of("k");
        cache.get_or_insert_with(&cred, || 1);
        cache.get_or_insert_with(&Credential::of("other"), || 2);
        assert!(cache.evict(&cred));
        assert!(!cache.evict(&cred));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let cache = ClientCache::new(ProviderId::Marketplace);
        let builds = AtomicUsize::new(0);
        let cred = Credential::with_secret("shared", "secret");
        let handles: Vec<Arc<usize>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        cache.get_or_insert_with(&cred, || builds.fetch_add(1, Ordering::SeqCst))
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
