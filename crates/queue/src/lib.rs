//! Background job queue for clubhouse.
//!
//! This crate carries "message created" events from intake to the fan-out
//! pipeline over a Redis-backed apalis queue:
//!
//! - **Jobs**: the wire form of a message created event
//! - **Workers**: the fan-out worker invoked once per delivered job
//! - **Publisher**: the Redis implementation of `MessageEventPublisher`
//! - **Retry**: the at-least-once redelivery policy

pub mod jobs;
pub mod publisher;
pub mod retry;
pub mod workers;

pub use jobs::*;
pub use publisher::RedisMessageEventPublisher;
pub use retry::RetryConfig;
pub use workers::*;
