pub mod notify;
pub mod overdue;
pub mod query;
pub mod submission;

pub use crate::domain::model::{
    Closure, ClosureDocument, ClosureReason, ClosureStatus, Moderator, Service, ServiceType,
    ShowAllServicesView, Subscription, SubscriptionType,
};
pub use crate::domain::ports::{
    Clock, ClosureDataSource, ClosureRepository, EmailMessage, MailTransport,
};
pub use crate::utils::error::Result;
