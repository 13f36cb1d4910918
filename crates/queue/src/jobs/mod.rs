//! Job definitions.

mod message_created;

pub use message_created::MessageCreatedJob;
