//! Session storage adapters.
//!
//! - `InMemorySessionStorage` - process-local map with per-entry expiry
//! - `RedisSessionStorage` - Redis GET / SET EX

mod in_memory;
mod redis;

pub use in_memory::InMemorySessionStorage;
pub use self::redis::RedisSessionStorage;
