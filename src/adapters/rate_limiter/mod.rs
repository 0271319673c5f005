//! Rate limiter adapters.
//!
//! Implementations of the RateLimiter port for different backends.
//!
//! ## Available Adapters
//!
//! - `InMemoryRateLimiter` - In-memory for tests and single-process runs
//! - `RedisRateLimiter` - Redis-backed, shared between processes
//!
//! ## Usage
//!
//! ```ignore
//! use fuelbot::adapters::rate_limiter::{InMemoryRateLimiter, RateLimitConfig};
//!
//! let limiter = InMemoryRateLimiter::new(RateLimitConfig::per_user(60, 10, 60));
//! ```

mod config;
mod in_memory;
mod redis;

pub use config::RateLimitConfig;
pub use in_memory::InMemoryRateLimiter;
pub use self::redis::RedisRateLimiter;
