pub mod error;
pub mod store;

pub use error::{CacheError, CacheErrorKind};
pub use store::{CacheEntry, CacheStore, derive_key};
