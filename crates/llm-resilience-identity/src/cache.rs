//! Generic read-through cache over [`Entity`], grounded on the original
//! `UserCache`/`OrgCache` (`services/redis/redis_user_cache.py`,
//! `redis_org_cache.py`): same key shapes, same "cache miss falls through
//! to the authoritative store and is cached best-effort" flow, same
//! "corrupted entry is deleted and treated as a miss" rule. The original
//! stores entities as Redis hashes with hand-written field serialization;
//! here every `T` serializes uniformly through `serde_json`, so the cache
//! needs no per-entity field mapping.

use crate::entity::{Entity, EntityLoader};
use crate::error::IdentityError;
use llm_resilience_cache::CacheClient;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

pub struct UserOrgCache<T: Entity, L: EntityLoader<T>> {
    cache: Arc<dyn CacheClient>,
    loader: L,
    /// Key prefix, e.g. `"user:"` or `"org:"`.
    prefix: &'static str,
    /// `None` means permanent storage, matching the original's indexes and
    /// entity hashes (no TTL set).
    ttl: Option<Duration>,
    _marker: PhantomData<T>,
}

impl<T: Entity, L: EntityLoader<T>> UserOrgCache<T, L> {
    pub fn new(cache: Arc<dyn CacheClient>, loader: L, prefix: &'static str, ttl: Option<Duration>) -> Self {
        Self {
            cache,
            loader,
            prefix,
            ttl,
            _marker: PhantomData,
        }
    }

    fn entity_key(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }

    fn secondary_key(&self, index_name: &str, value: &str) -> String {
        format!("{}{}:{}", self.prefix, index_name, value)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<T>, IdentityError<L::Error>> {
        if !self.cache.is_available() {
            return self.loader.load_by_id(id).await.map_err(IdentityError::Loader);
        }

        let key = self.entity_key(id);
        match self.cache.get(&key).await {
            Ok(Some(payload)) => match serde_json::from_str::<T>(&payload) {
                Ok(entity) => Ok(Some(entity)),
                Err(_) => {
                    let _ = self.cache.del(&key).await;
                    self.load_and_cache_by_id(id).await
                }
            },
            Ok(None) => self.load_and_cache_by_id(id).await,
            Err(_) => self.loader.load_by_id(id).await.map_err(IdentityError::Loader),
        }
    }

    pub async fn get_by_secondary(&self, index_name: &str, value: &str) -> Result<Option<T>, IdentityError<L::Error>> {
        if !self.cache.is_available() {
            return self
                .loader
                .load_by_secondary(index_name, value)
                .await
                .map_err(IdentityError::Loader);
        }

        let index_key = self.secondary_key(index_name, value);
        match self.cache.get(&index_key).await {
            Ok(Some(id)) => self.get_by_id(&id).await,
            Ok(None) => self.load_and_cache_by_secondary(index_name, value).await,
            Err(_) => self
                .loader
                .load_by_secondary(index_name, value)
                .await
                .map_err(IdentityError::Loader),
        }
    }

    async fn load_and_cache_by_id(&self, id: &str) -> Result<Option<T>, IdentityError<L::Error>> {
        let entity = self.loader.load_by_id(id).await.map_err(IdentityError::Loader)?;
        if let Some(entity) = &entity {
            self.cache_entity(entity).await;
        }
        Ok(entity)
    }

    async fn load_and_cache_by_secondary(&self, index_name: &str, value: &str) -> Result<Option<T>, IdentityError<L::Error>> {
        let entity = self
            .loader
            .load_by_secondary(index_name, value)
            .await
            .map_err(IdentityError::Loader)?;
        if let Some(entity) = &entity {
            self.cache_entity(entity).await;
        }
        Ok(entity)
    }

    /// Write-through cache write. Never fails the caller: a cache outage or
    /// transient error is swallowed, matching the original's
    /// "log but don't raise - cache failures are non-critical" stance.
    pub async fn cache_entity(&self, entity: &T) -> bool {
        if !self.cache.is_available() {
            return false;
        }

        let payload = match serde_json::to_string(entity) {
            Ok(payload) => payload,
            Err(_) => return false,
        };

        let key = self.entity_key(&entity.id());
        let write_result = match self.ttl {
            Some(ttl) => self.cache.set_ex(&key, &payload, ttl).await,
            None => self.cache.set(&key, &payload).await,
        };
        if write_result.is_err() {
            return false;
        }

        for (index_name, value) in entity.secondary_keys() {
            let index_key = self.secondary_key(index_name, &value);
            let _ = self.cache.set(&index_key, &entity.id()).await;
        }

        true
    }

    /// Deletes the entity and every secondary key passed in. Best-effort:
    /// a partial failure still attempts every remaining key.
    pub async fn invalidate(&self, id: &str, secondary_values: &[(&str, String)]) -> bool {
        if !self.cache.is_available() {
            return false;
        }

        let mut all_ok = self.cache.del(&self.entity_key(id)).await.is_ok();
        for (index_name, value) in secondary_values {
            let index_key = self.secondary_key(index_name, value);
            all_ok &= self.cache.del(&index_key).await.is_ok();
        }
        all_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm_resilience_cache::InMemoryCacheClient;
    use serde::{Deserialize, Serialize};
    use std::convert::Infallible;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct User {
        id: String,
        phone: String,
        name: String,
    }

    impl Entity for User {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn secondary_keys(&self) -> Vec<(&'static str, String)> {
            vec![("phone", self.phone.clone())]
        }
    }

    struct FakeStore {
        users: StdMutex<Vec<User>>,
        load_by_id_calls: StdMutex<u32>,
    }

    impl FakeStore {
        fn new(users: Vec<User>) -> Self {
            Self {
                users: StdMutex::new(users),
                load_by_id_calls: StdMutex::new(0),
            }
        }
    }

    #[async_trait]
    impl EntityLoader<User> for FakeStore {
        type Error = Infallible;

        async fn load_by_id(&self, id: &str) -> Result<Option<User>, Infallible> {
            *self.load_by_id_calls.lock().unwrap() += 1;
            Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
        }

        async fn load_by_secondary(&self, index_name: &str, value: &str) -> Result<Option<User>, Infallible> {
            assert_eq!(index_name, "phone");
            Ok(self.users.lock().unwrap().iter().find(|u| u.phone == value).cloned())
        }
    }

    fn user_cache(store: FakeStore) -> UserOrgCache<User, FakeStore> {
        UserOrgCache::new(Arc::new(InMemoryCacheClient::new()), store, "user:", None)
    }

    #[tokio::test]
    async fn cache_miss_falls_through_to_loader_and_populates_cache() {
        let store = FakeStore::new(vec![User {
            id: "1".into(),
            phone: "138".into(),
            name: "Ada".into(),
        }]);
        let cache = user_cache(store);

        let found = cache.get_by_id("1").await.unwrap();
        assert_eq!(found.unwrap().name, "Ada");

        // Second lookup must come from cache, not the loader.
        let calls_before = cache.loader.load_by_id_calls.lock().unwrap().clone();
        let found_again = cache.get_by_id("1").await.unwrap();
        assert_eq!(found_again.unwrap().name, "Ada");
        assert_eq!(*cache.loader.load_by_id_calls.lock().unwrap(), calls_before);
    }

    #[tokio::test]
    async fn secondary_index_resolves_through_primary_key() {
        let store = FakeStore::new(vec![User {
            id: "7".into(),
            phone: "13900001111".into(),
            name: "Grace".into(),
        }]);
        let cache = user_cache(store);

        let found = cache.get_by_secondary("phone", "13900001111").await.unwrap();
        assert_eq!(found.unwrap().id, "7");

        // Secondary index must now resolve without consulting the store.
        let direct = cache.get_by_id("7").await.unwrap();
        assert_eq!(direct.unwrap().name, "Grace");
    }

    #[tokio::test]
    async fn corrupted_entry_is_deleted_and_treated_as_a_miss() {
        let store = FakeStore::new(vec![User {
            id: "3".into(),
            phone: "000".into(),
            name: "Later".into(),
        }]);
        let cache = user_cache(store);

        cache.cache.set("user:3", "not valid json").await.unwrap();
        let found = cache.get_by_id("3").await.unwrap();
        assert_eq!(found.unwrap().name, "Later");
    }

    #[tokio::test]
    async fn invalidate_removes_entity_and_secondary_keys() {
        let store = FakeStore::new(vec![User {
            id: "9".into(),
            phone: "555".into(),
            name: "Old".into(),
        }]);
        let cache = user_cache(store);

        cache.get_by_id("9").await.unwrap();
        assert!(cache.invalidate("9", &[("phone", "555".to_string())]).await);

        assert!(cache.cache.get("user:9").await.unwrap().is_none());
        assert!(cache.cache.get("user:phone:555").await.unwrap().is_none());
    }
}
