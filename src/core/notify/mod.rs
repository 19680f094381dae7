//! Moderator alerts and subscriber notifications.
//!
//! Both flows render text and hand finished [`EmailMessage`](crate::core::EmailMessage)s
//! to a [`MailTransport`](crate::core::MailTransport). A failed send is recorded and
//! the batch carries on.

pub mod moderator;
pub mod subscriber;
pub mod template;
pub mod text;

pub use moderator::{Delivery, ModeratorNotifier, OverdueAlert};
pub use subscriber::{
    DeliveryFailure, DispatchReport, SubscriberNotice, SubscriberNoticeBuilder, SubscriberNotifier,
};
pub use template::{EmailTemplate, TemplateTier};
