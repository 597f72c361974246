//! Reference-data resolver.
//!
//! Rating providers and properties are written through to the store the
//! first time they are seen, outside any batch transaction, so later lines
//! and other workers can reference them at once. Resolved entities are cached
//! in memory for the life of the resolver.
//!
//! Workers share one resolver without locking across the check-then-create
//! window. When two workers race on a never-seen id, the loser's insert fails
//! on the primary key (or, for reviewers, the natural-key index) and it
//! re-reads the winner's row.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::store::{ReferenceStore, StoreError};
use crate::models::{Property, RatingProvider, Reviewer, ReviewerInfo, ReviewerKey};

pub struct ReferenceResolver {
    store: Arc<dyn ReferenceStore>,
    providers: RwLock<HashMap<i64, RatingProvider>>,
    properties: RwLock<HashMap<i64, Property>>,
    reviewers: RwLock<HashMap<ReviewerKey, Reviewer>>,
}

fn cached<K: Eq + Hash, V: Clone>(cache: &RwLock<HashMap<K, V>>, key: &K) -> Option<V> {
    cache
        .read()
        .ok()
        .and_then(|guard| guard.get(key).cloned())
}

fn remember<K: Eq + Hash, V>(cache: &RwLock<HashMap<K, V>>, key: K, value: V) {
    if let Ok(mut guard) = cache.write() {
        guard.insert(key, value);
    }
}

fn vanished(what: &str) -> StoreError {
    StoreError::Database(format!("{what} reported as duplicate but not found on re-read"))
}

impl ReferenceResolver {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self {
            store,
            providers: RwLock::new(HashMap::new()),
            properties: RwLock::new(HashMap::new()),
            reviewers: RwLock::new(HashMap::new()),
        }
    }

    /// Existing provider with this id, or `candidate` after inserting it.
    ///
    /// An existing provider keeps its stored name.
    pub async fn provider(&self, candidate: &RatingProvider) -> Result<RatingProvider, StoreError> {
        if let Some(hit) = cached(&self.providers, &candidate.id) {
            return Ok(hit);
        }

        let resolved = match self.store.find_provider(candidate.id).await? {
            Some(existing) => existing,
            None => match self.store.save_provider(candidate).await {
                Ok(()) => {
                    debug!(provider_id = candidate.id, name = %candidate.name, "Created rating provider");
                    candidate.clone()
                }
                Err(StoreError::Duplicate(_)) => {
                    debug!(provider_id = candidate.id, "Provider created concurrently, re-reading");
                    self.store
                        .find_provider(candidate.id)
                        .await?
                        .ok_or_else(|| vanished("provider"))?
                }
                Err(e) => return Err(e),
            },
        };

        remember(&self.providers, resolved.id, resolved.clone());
        Ok(resolved)
    }

    /// Existing property with this id, or `candidate` after inserting it.
    pub async fn property(&self, candidate: &Property) -> Result<Property, StoreError> {
        if let Some(hit) = cached(&self.properties, &candidate.id) {
            return Ok(hit);
        }

        let resolved = match self.store.find_property(candidate.id).await? {
            Some(existing) => existing,
            None => match self.store.save_property(candidate).await {
                Ok(()) => {
                    debug!(property_id = candidate.id, "Created property");
                    candidate.clone()
                }
                Err(StoreError::Duplicate(_)) => {
                    debug!(property_id = candidate.id, "Property created concurrently, re-reading");
                    self.store
                        .find_property(candidate.id)
                        .await?
                        .ok_or_else(|| vanished("property"))?
                }
                Err(e) => return Err(e),
            },
        };

        remember(&self.properties, resolved.id, resolved.clone());
        Ok(resolved)
    }

    /// Reviewer matching (display name, country name), or a new one.
    ///
    /// Reviewers missing either half of the key are never matched and always
    /// inserted as new rows.
    pub async fn reviewer(&self, info: &ReviewerInfo) -> Result<Reviewer, StoreError> {
        let Some(key) = info.natural_key() else {
            return self.store.save_reviewer(info).await;
        };

        if let Some(hit) = cached(&self.reviewers, &key) {
            return Ok(hit);
        }

        let resolved = match self.store.find_reviewer(&key).await? {
            Some(existing) => existing,
            None => match self.store.save_reviewer(info).await {
                Ok(created) => created,
                Err(StoreError::Duplicate(_)) => self
                    .store
                    .find_reviewer(&key)
                    .await?
                    .ok_or_else(|| vanished("reviewer"))?,
                Err(e) => return Err(e),
            },
        };

        remember(&self.reviewers, key, resolved.clone());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Reference store that can pretend another worker inserted first.
    #[derive(Default)]
    struct FakeRefs {
        providers: Mutex<HashMap<i64, RatingProvider>>,
        properties: Mutex<HashMap<i64, Property>>,
        reviewers: Mutex<Vec<Reviewer>>,
        finds: AtomicUsize,
        hide_next_find: AtomicBool,
    }

    #[async_trait]
    impl ReferenceStore for FakeRefs {
        async fn find_provider(&self, id: i64) -> Result<Option<RatingProvider>, StoreError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            if self.hide_next_find.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(self.providers.lock().unwrap().get(&id).cloned())
        }

        async fn save_provider(&self, provider: &RatingProvider) -> Result<(), StoreError> {
            let mut map = self.providers.lock().unwrap();
            if map.contains_key(&provider.id) {
                return Err(StoreError::Duplicate(provider.id.to_string()));
            }
            map.insert(provider.id, provider.clone());
            Ok(())
        }

        async fn find_property(&self, id: i64) -> Result<Option<Property>, StoreError> {
            Ok(self.properties.lock().unwrap().get(&id).cloned())
        }

        async fn save_property(&self, property: &Property) -> Result<(), StoreError> {
            self.properties
                .lock()
                .unwrap()
                .insert(property.id, property.clone());
            Ok(())
        }

        async fn find_reviewer(&self, key: &ReviewerKey) -> Result<Option<Reviewer>, StoreError> {
            Ok(self
                .reviewers
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.info.natural_key().as_ref() == Some(key))
                .cloned())
        }

        async fn save_reviewer(&self, info: &ReviewerInfo) -> Result<Reviewer, StoreError> {
            let mut rows = self.reviewers.lock().unwrap();
            let reviewer = Reviewer {
                id: rows.len() as i64 + 1,
                info: info.clone(),
                created_at: chrono::Utc::now(),
            };
            rows.push(reviewer.clone());
            Ok(reviewer)
        }
    }

    fn named(name: &str, country: Option<&str>) -> ReviewerInfo {
        ReviewerInfo {
            display_name: Some(name.into()),
            country_name: country.map(String::from),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn provider_is_created_once_and_cached() {
        let store = Arc::new(FakeRefs::default());
        let resolver = ReferenceResolver::new(store.clone());

        let first = resolver
            .provider(&RatingProvider::new(5, "Expedia"))
            .await
            .unwrap();
        let second = resolver
            .provider(&RatingProvider::new(5, "Renamed"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.name, "Expedia");
        assert_eq!(store.finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lost_race_rereads_winner() {
        let store = Arc::new(FakeRefs::default());
        store
            .providers
            .lock()
            .unwrap()
            .insert(5, RatingProvider::new(5, "Winner"));
        // First lookup misses as if the other worker had not committed yet.
        store.hide_next_find.store(true, Ordering::SeqCst);

        let resolver = ReferenceResolver::new(store.clone());
        let resolved = resolver
            .provider(&RatingProvider::new(5, "Loser"))
            .await
            .unwrap();

        assert_eq!(resolved.name, "Winner");
        assert_eq!(store.providers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reviewer_dedup_by_name_and_country() {
        let store = Arc::new(FakeRefs::default());
        let resolver = ReferenceResolver::new(store.clone());

        let a = resolver.reviewer(&named("Jane", Some("US"))).await.unwrap();
        let b = resolver.reviewer(&named("Jane", Some("US"))).await.unwrap();
        let c = resolver.reviewer(&named("Jane", Some("UK"))).await.unwrap();

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(store.reviewers.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reviewer_without_country_is_always_new() {
        let store = Arc::new(FakeRefs::default());
        let resolver = ReferenceResolver::new(store.clone());

        let a = resolver.reviewer(&named("Jane", None)).await.unwrap();
        let b = resolver.reviewer(&named("Jane", None)).await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn property_keeps_stored_name() {
        let store = Arc::new(FakeRefs::default());
        let resolver = ReferenceResolver::new(store.clone());

        resolver.property(&Property::new(1, None)).await.unwrap();
        let again = ReferenceResolver::new(store)
            .property(&Property::new(1, Some("Later Name".into())))
            .await
            .unwrap();

        assert_eq!(again.name, None);
    }
}
