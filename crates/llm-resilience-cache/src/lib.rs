//! Shared cache client abstraction (§4.1).
//!
//! Every stateful component above this crate — the rate limiter, the
//! session manager, the user/org identity cache, and the token usage
//! tracker's buffered writes — goes through [`CacheClient`] rather than
//! talking to Redis directly, so they can run against
//! [`InMemoryCacheClient`] in tests and [`RedisCacheClient`] in production
//! without any code change at the call site.

pub mod client;
pub mod error;
pub mod memory;
pub mod redis_client;

pub use client::{CacheClient, IncrAndCheck, Lock};
pub use error::CacheError;
pub use memory::InMemoryCacheClient;
pub use redis_client::RedisCacheClient;
