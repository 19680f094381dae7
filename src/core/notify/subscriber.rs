use crate::core::notify::template::{EmailTemplate, TemplateTier};
use crate::core::notify::text::{date_range_text, notes_html, status_sentence};
use crate::core::{Closure, EmailMessage, MailTransport, Service, Subscription, SubscriptionType};
use crate::utils::error::{ClosureError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

const UNSUBSCRIBE_PLACEHOLDER: &str = "{0}";

/// Everything needed to tell subscribers about one new or edited closure.
#[derive(Debug, Clone)]
pub struct SubscriberNotice<'a> {
    service: &'a Service,
    closure: &'a Closure,
    report_closure_url: Option<Url>,
    unsubscribe_url: Option<String>,
    template_file: PathBuf,
    subscriptions: &'a [Subscription],
}

impl<'a> SubscriberNotice<'a> {
    pub fn builder() -> SubscriberNoticeBuilder<'a> {
        SubscriberNoticeBuilder::default()
    }

    pub fn template_file(&self) -> &Path {
        &self.template_file
    }
}

#[derive(Debug, Default)]
pub struct SubscriberNoticeBuilder<'a> {
    service: Option<&'a Service>,
    closure: Option<&'a Closure>,
    report_closure_url: Option<Url>,
    unsubscribe_url: Option<String>,
    template_file: Option<PathBuf>,
    subscriptions: Option<&'a [Subscription]>,
}

impl<'a> SubscriberNoticeBuilder<'a> {
    pub fn service(mut self, service: &'a Service) -> Self {
        self.service = Some(service);
        self
    }

    pub fn closure(mut self, closure: &'a Closure) -> Self {
        self.closure = Some(closure);
        self
    }

    pub fn report_closure_url(mut self, url: Url) -> Self {
        self.report_closure_url = Some(url);
        self
    }

    /// URL containing `{0}` where the subscription code goes.
    pub fn unsubscribe_url(mut self, url: impl Into<String>) -> Self {
        self.unsubscribe_url = Some(url.into());
        self
    }

    pub fn template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_file = Some(path.into());
        self
    }

    pub fn subscriptions(mut self, subscriptions: &'a [Subscription]) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    pub fn build(self) -> Result<SubscriberNotice<'a>> {
        let service = self
            .service
            .ok_or_else(|| ClosureError::missing_argument("service"))?;
        let closure = self
            .closure
            .ok_or_else(|| ClosureError::missing_argument("closure"))?;
        let template_file = self
            .template_file
            .ok_or_else(|| ClosureError::missing_argument("closure_email_template_file"))?;
        let subscriptions = self
            .subscriptions
            .ok_or_else(|| ClosureError::missing_argument("subscriptions"))?;

        if let Some(url) = &self.unsubscribe_url {
            if url.matches(UNSUBSCRIBE_PLACEHOLDER).count() != 1 {
                return Err(ClosureError::validation(format!(
                    "unsubscribe URL must contain exactly one {} placeholder: {}",
                    UNSUBSCRIBE_PLACEHOLDER, url
                )));
            }
        }

        Ok(SubscriberNotice {
            service,
            closure,
            report_closure_url: self.report_closure_url,
            unsubscribe_url: self.unsubscribe_url,
            template_file,
            subscriptions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub address: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub skipped_duplicates: usize,
    /// Subscriptions by text message or with no type; not delivered here.
    pub skipped_unsupported: usize,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renders the subscriber template and sends one email per distinct address.
pub struct SubscriberNotifier<'t, T: MailTransport + ?Sized> {
    transport: &'t T,
}

impl<'t, T: MailTransport + ?Sized> SubscriberNotifier<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self { transport }
    }

    /// Loads the template named by the notice, then dispatches.
    pub fn send_email_notifications(&self, notice: &SubscriberNotice<'_>) -> Result<DispatchReport> {
        let template = EmailTemplate::from_file(&notice.template_file)?;
        Ok(self.dispatch(notice, &template))
    }

    pub fn dispatch(&self, notice: &SubscriberNotice<'_>, template: &EmailTemplate) -> DispatchReport {
        // Closure details are the same for every recipient, so fill them in once per tier.
        let standard = template
            .standard
            .map_text(|text| insert_closure_data(notice, text));
        let official = template
            .official
            .map_text(|text| insert_closure_data(notice, text));

        let mut report = DispatchReport::default();
        let mut addresses_used: HashSet<&str> = HashSet::new();

        for sub in notice.subscriptions {
            if sub.subscription_type != SubscriptionType::Email {
                report.skipped_unsupported += 1;
                continue;
            }
            // A global and a service-specific subscription can share an address.
            if !addresses_used.insert(sub.address.as_str()) {
                tracing::debug!("Skipping duplicate subscription for {}", sub.address);
                report.skipped_duplicates += 1;
                continue;
            }

            let tier = if sub.official_notification {
                &official
            } else {
                &standard
            };
            let message = personalise(notice, sub, tier);

            match self.transport.send(&message) {
                Ok(()) => {
                    tracing::debug!("Closure notification sent to {}", sub.address);
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::error!("Closure notification to {} failed: {}", sub.address, e);
                    report.failures.push(DeliveryFailure {
                        address: sub.address.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Notified subscribers of {} closure: {} sent, {} failed, {} duplicates skipped",
            notice.service.name,
            report.sent,
            report.failures.len(),
            report.skipped_duplicates
        );
        report
    }
}

fn insert_closure_data(notice: &SubscriberNotice<'_>, text: &str) -> String {
    let closure = notice.closure;
    let mut text = text
        .replace("{AddedBy}", closure.added_by.as_deref().unwrap_or(""))
        .replace("{Service}", &notice.service.name)
        .replace("{ServiceCode}", &notice.service.code)
        .replace("{Status}", &status_sentence(closure.status))
        .replace("{Date}", &date_range_text(closure.start_date, closure.end_date))
        .replace("{Reason}", &closure.reason.reason)
        .replace("{Notes}", &notes_html(closure.notes.as_deref()));
    if let Some(url) = &notice.report_closure_url {
        text = text.replace("{ReportClosureUrl}", url.as_str());
    }
    text
}

fn insert_personal_data(notice: &SubscriberNotice<'_>, sub: &Subscription, text: &str) -> String {
    let mut text = text.to_string();
    if let Some(unsubscribe) = &notice.unsubscribe_url {
        if !sub.code.is_nil() {
            let individual = unsubscribe.replace(UNSUBSCRIBE_PLACEHOLDER, &sub.code.to_string());
            text = text.replace("{Unsubscribe}", &individual);
        }
    }
    if let Some(url) = &notice.service.url {
        text = text.replace("{ServiceUrl}", url.as_str());
    }
    text
}

fn personalise(notice: &SubscriberNotice<'_>, sub: &Subscription, tier: &TemplateTier) -> EmailMessage {
    EmailMessage {
        from: tier.from.clone(),
        to: vec![sub.address.clone()],
        bcc: tier.bcc.iter().cloned().collect(),
        subject: tier.subject.clone().unwrap_or_default(),
        body: tier
            .body
            .as_deref()
            .map(|body| insert_personal_data(notice, sub, body))
            .unwrap_or_default(),
        html: true,
    }
}
