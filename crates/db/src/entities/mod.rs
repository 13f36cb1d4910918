//! Database entities.
//!
//! Typed records for every document the fan-out pipeline reads or writes.

pub mod community_member;
pub mod community_message;
pub mod notification;
pub mod push_token;

pub use community_member::Entity as CommunityMember;
pub use community_message::Entity as CommunityMessage;
pub use notification::Entity as Notification;
pub use push_token::Entity as PushToken;
