use crate::core::notify::text::{date_range_text, status_phrase};
use crate::core::overdue::OverdueClosure;
use crate::core::{EmailMessage, MailTransport, Moderator, ServiceType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nothing overdue, or nobody to tell.
    NotRequired,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueAlert {
    pub overdue_count: usize,
    pub delivery: Delivery,
}

/// Tells moderators about multi-day emergency closures whose confirmation is overdue.
pub struct ModeratorNotifier<'t, T: MailTransport + ?Sized> {
    transport: &'t T,
    from_address: String,
}

impl<'t, T: MailTransport + ?Sized> ModeratorNotifier<'t, T> {
    pub fn new(transport: &'t T, from_address: impl Into<String>) -> Self {
        Self {
            transport,
            from_address: from_address.into(),
        }
    }

    pub fn compose(
        &self,
        service_type: &ServiceType,
        overdue: &[OverdueClosure],
        moderators: &[Moderator],
    ) -> EmailMessage {
        let singular = &service_type.singular_text;
        let mut body = format!(
            "The following multi-day emergency {} closures have not been confirmed today:\n\n",
            singular
        );
        for entry in overdue {
            body.push_str(&format!(
                "{} {} due to {}, {}\n\n",
                entry.service_name,
                status_phrase(entry.closure.status),
                entry.closure.reason.reason,
                date_range_text(entry.closure.start_date, entry.closure.end_date)
            ));
        }
        body.push_str("++ Disclaimer\n\n");

        EmailMessage {
            from: Some(self.from_address.clone()),
            to: moderators.iter().map(|m| m.email_address.clone()).collect(),
            bcc: Vec::new(),
            subject: format!(
                "Confirmation overdue for {} multi-day emergency {} closures",
                overdue.len(),
                singular
            ),
            body,
            html: false,
        }
    }

    /// Sends one email to every moderator when anything is overdue. The count is
    /// returned whether or not an email went out.
    pub fn notify_overdue_confirmations(
        &self,
        service_type: &ServiceType,
        overdue: &[OverdueClosure],
        moderators: &[Moderator],
    ) -> OverdueAlert {
        let overdue_count = overdue.len();
        if overdue.is_empty() || moderators.is_empty() {
            tracing::info!(
                "No moderator alert for {}: {} overdue, {} moderators",
                service_type.plural_text,
                overdue_count,
                moderators.len()
            );
            return OverdueAlert {
                overdue_count,
                delivery: Delivery::NotRequired,
            };
        }

        let message = self.compose(service_type, overdue, moderators);
        let delivery = match self.transport.send(&message) {
            Ok(()) => {
                tracing::info!(
                    "Alerted {} moderators about {} overdue {} closures",
                    moderators.len(),
                    overdue_count,
                    service_type.singular_text
                );
                Delivery::Sent
            }
            Err(e) => {
                tracing::error!("Moderator alert could not be sent: {}", e);
                Delivery::Failed(e.to_string())
            }
        };

        OverdueAlert {
            overdue_count,
            delivery,
        }
    }
}
