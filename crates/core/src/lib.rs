//! Core business logic for clubhouse.
//!
//! The message fan-out pipeline lives in [`services::message_fanout`]; every
//! external collaborator it touches is a trait object injected at construction.

pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use services::*;
