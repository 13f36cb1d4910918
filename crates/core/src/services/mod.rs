//! Business logic services.

pub mod membership;
pub mod message_fanout;
pub mod messaging;
pub mod notification;
pub mod push_notification;
pub mod push_token;

pub use membership::{MemberResolver, MembershipStore};
pub use message_fanout::{
    FanoutError, FanoutOutcome, FanoutReport, FanoutStage, MessageCreated, MessageFanoutService,
};
pub use messaging::{CreateMessageInput, MessageEventPublisher, MessageService};
pub use notification::{NewNotification, NotificationStore, NotificationWriter, WriteSummary};
pub use push_notification::{
    DisabledPushGateway, HttpPushGateway, MulticastReport, PushDispatcher, PushGateway,
    PushPayload, TokenResult, truncate_chars,
};
pub use push_token::{RecipientSet, TokenResolver, TokenStore};
