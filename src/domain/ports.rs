use crate::domain::model::{ClosureDocument, ServiceType};
use crate::utils::error::Result;
use chrono::NaiveDateTime;

/// Supplies the parsed closure document for a service type.
pub trait ClosureDataSource {
    fn read_closure_data(&self, service_type: &ServiceType) -> Result<ClosureDocument>;
}

/// Publishes a closure document for a service type.
pub trait ClosureRepository {
    fn save_closure_info(&self, service_type: &ServiceType, info: &ClosureDocument) -> Result<()>;
}

/// A fully rendered email, ready for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

pub trait MailTransport: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}
