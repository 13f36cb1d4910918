//! ID generation utilities.

use sha2::{Digest, Sha256};
use ulid::Ulid;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Derive the idempotency key for a (message, recipient) pair.
///
/// The same pair always maps to the same key, so a redelivered event
/// targets the rows the first delivery already wrote.
#[must_use]
pub fn dedupe_key(message_id: &str, recipient_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message_id.as_bytes());
    hasher.update(b":");
    hasher.update(recipient_id.as_bytes());
    hex::encode(hasher.finalize())
}
