//! Job workers.

mod message_created;

pub use message_created::{FanoutContext, message_created_worker};
