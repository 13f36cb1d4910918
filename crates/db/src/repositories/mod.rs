//! Repositories over the document store.

mod community_member;
mod community_message;
mod notification;
mod push_token;

pub use community_member::CommunityMemberRepository;
pub use community_message::CommunityMessageRepository;
pub use notification::{CreateOutcome, NotificationRepository};
pub use push_token::PushTokenRepository;
