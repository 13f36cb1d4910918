//! Common utilities and shared types for clubhouse.
//!
//! This crate provides foundational components used across all clubhouse crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers and idempotency keys via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use clubhouse_common::{AppResult, Config, IdGenerator};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} (fan-out concurrency {})", id, config.fanout.concurrency);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::{Config, FanoutConfig, PushConfig, WorkerConfig};
pub use error::{AppError, AppResult};
pub use id::{IdGenerator, dedupe_key};
