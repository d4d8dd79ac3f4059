//! Event bus transports backed by external infrastructure.
//!
//! The bus abstraction and the in-memory bus live in `flowplan-events`; this
//! module adds the Redis pub/sub transport behind the `redis` feature.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisPubSubEventBus};
