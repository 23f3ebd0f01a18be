use serde::de::DeserializeOwned;
use serde::Serialize;

/// A cacheable record with a primary id and zero or more secondary
/// lookup keys (§4.9): `user:phone:{phone}`, `org:code:{code}`,
/// `org:invite:{code}`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Primary id, used to build `{prefix}{id}`.
    fn id(&self) -> String;

    /// `(index_name, value)` pairs this entity should be indexed under,
    /// e.g. `[("phone", "13800000000")]`. Index keys never expire, mirroring
    /// the original cache's permanent phone/code/invite indexes.
    fn secondary_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Loads entities from the authoritative store on a cache miss.
#[async_trait::async_trait]
pub trait EntityLoader<T: Entity>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn load_by_id(&self, id: &str) -> Result<Option<T>, Self::Error>;

    /// Looks the entity up by one of its `secondary_keys()` names.
    async fn load_by_secondary(&self, index_name: &str, value: &str) -> Result<Option<T>, Self::Error>;
}
