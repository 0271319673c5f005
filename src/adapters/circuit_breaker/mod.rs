//! Circuit breaker adapters.
//!
//! - `InMemoryCircuitBreaker` - per-process breaker guarded by a mutex

mod in_memory;

pub use in_memory::InMemoryCircuitBreaker;
