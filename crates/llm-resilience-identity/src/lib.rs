//! Read-through user/org cache with authoritative-store fallback (spec
//! §4.9).

pub mod cache;
pub mod entity;
pub mod error;

pub use cache::UserOrgCache;
pub use entity::{Entity, EntityLoader};
pub use error::IdentityError;
