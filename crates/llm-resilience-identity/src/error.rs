use thiserror::Error;

/// Errors from a [`crate::cache::UserOrgCache`] operation.
///
/// Cache-layer failures never surface to callers of the read paths (they
/// fall back to the loader); this type exists for the loader's own errors
/// and for write paths where a caller may want to know what happened.
#[derive(Debug, Error)]
pub enum IdentityError<E> {
    #[error("cache operation failed: {0}")]
    Cache(#[from] llm_resilience_cache::CacheError),

    #[error("authoritative store lookup failed: {0}")]
    Loader(E),
}
