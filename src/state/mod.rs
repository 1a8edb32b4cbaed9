pub mod identity_store;
pub mod kv;

pub use identity_store::{normalize_name, IdentityStore, PlayerLink};
pub use kv::{KeyValueStore, MemoryKv, SharedKeyValueStore, UpstashKv};
