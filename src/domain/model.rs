use crate::utils::error::{ClosureError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use url::Url;
use uuid::Uuid;

/// A category of service, e.g. "school"/"schools".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceType {
    pub singular_text: String,
    pub plural_text: String,
}

impl ServiceType {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular_text: singular.into(),
            plural_text: plural.into(),
        }
    }

    /// Name of the document holding closures for this type: the singular text
    /// with everything but ASCII letters and digits removed, plus `.xml`.
    pub fn file_name(&self) -> Result<String> {
        static NON_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();
        let re = NON_ALPHANUMERIC.get_or_init(|| {
            Regex::new("[^A-Za-z0-9]").expect("static pattern is valid")
        });

        let stem = re.replace_all(&self.singular_text, "");
        if stem.is_empty() {
            return Err(ClosureError::validation(
                "service type singular text must contain letters or digits",
            ));
        }
        Ok(format!("{}.xml", stem))
    }
}

impl Default for ServiceType {
    fn default() -> Self {
        Self::new("service", "services")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClosureStatus {
    #[default]
    Unknown,
    Closed,
    PartlyClosed,
}

impl ClosureStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ClosureStatus::Unknown => "Unknown",
            ClosureStatus::Closed => "Closed",
            ClosureStatus::PartlyClosed => "PartlyClosed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Unknown" => Some(ClosureStatus::Unknown),
            "Closed" => Some(ClosureStatus::Closed),
            "PartlyClosed" => Some(ClosureStatus::PartlyClosed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureReason {
    pub id: i32,
    pub reason: String,
    pub emergency: bool,
    pub requires_notes: bool,
    pub selectable: bool,
    pub may_affect_all_services: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub id: i32,
    pub status: ClosureStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: ClosureReason,
    pub notes: Option<String>,
    pub days_notice: i32,
    pub added_by: Option<String>,
    pub date_added: Option<NaiveDateTime>,
    pub date_modified: Option<NaiveDateTime>,
    pub confirmation_required: bool,
    pub confirmation_overdue: bool,
    pub confirmed_date: Option<NaiveDateTime>,
    pub linked_data_uri: Option<Url>,
}

impl Closure {
    /// A closure of unknown status covering `start_date..=end_date`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id: 0,
            status: ClosureStatus::Unknown,
            start_date,
            end_date,
            reason: ClosureReason::default(),
            notes: None,
            days_notice: 0,
            added_by: None,
            date_added: None,
            date_modified: None,
            confirmation_required: false,
            confirmation_overdue: false,
            confirmed_date: None,
            linked_data_uri: None,
        }
    }

    pub fn with_status(mut self, status: ClosureStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_reason(mut self, reason: ClosureReason) -> Self {
        self.reason = reason;
        self
    }

    /// Inclusive on both ends. A closure whose start is after its end covers nothing.
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub linked_data_uri: Option<Url>,
    pub url: Option<Url>,
    pub service_type: ServiceType,
    pub closures: Vec<Closure>,
    pub reasons_for_closure: BTreeMap<i32, ClosureReason>,
}

impl Service {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            code: code.into(),
            name: name.into(),
            linked_data_uri: None,
            url: None,
            service_type: ServiceType::default(),
            closures: Vec::new(),
            reasons_for_closure: BTreeMap::new(),
        }
    }

    /// Every closure whose date range contains `day`, in insertion order.
    pub fn closures_on(&self, day: NaiveDate) -> Vec<&Closure> {
        self.closures.iter().filter(|c| c.covers(day)).collect()
    }
}

/// When to list every service rather than only those reporting a closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShowAllServicesView {
    Always,
    Never,
    #[default]
    Auto,
}

pub const DEFAULT_SHORT_NOTICE_DAYS: i32 = 5;

/// Parsed form of the closure document for one service type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosureDocument {
    pub show_all_services_view: ShowAllServicesView,
    pub short_notice_days: i32,
    pub services: Vec<Service>,
}

impl Default for ClosureDocument {
    fn default() -> Self {
        Self {
            show_all_services_view: ShowAllServicesView::Auto,
            short_notice_days: DEFAULT_SHORT_NOTICE_DAYS,
            services: Vec::new(),
        }
    }
}

impl ClosureDocument {
    pub fn with_services(services: Vec<Service>) -> Self {
        Self {
            services,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderator {
    pub id: i32,
    pub email_address: String,
}

impl Moderator {
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            id: 0,
            email_address: email_address.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[default]
    None,
    Email,
    TextMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub id: i32,
    pub subscription_type: SubscriptionType,
    pub address: String,
    /// `None` for a subscription to every service of a type.
    #[serde(default)]
    pub service: Option<Service>,
    pub code: Uuid,
    pub active: bool,
    #[serde(default)]
    pub official_notification: bool,
}

impl Subscription {
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            id: 0,
            subscription_type: SubscriptionType::Email,
            address: address.into(),
            service: None,
            code: Uuid::new_v4(),
            active: true,
            official_notification: false,
        }
    }

    pub fn for_service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    pub fn official(mut self) -> Self {
        self.official_notification = true;
        self
    }

    pub fn is_global(&self) -> bool {
        self.service.as_ref().map_or(true, |s| s.id < 1)
    }

    /// Global subscriptions apply to every service; the rest match on service code.
    pub fn applies_to(&self, service: &Service) -> bool {
        self.is_global() || self.service.as_ref().is_some_and(|s| s.code == service.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_file_name_strips_punctuation() {
        let household = ServiceType::new("household waste site", "household waste sites");
        assert_eq!(household.file_name().unwrap(), "householdwastesite.xml");
        assert_eq!(ServiceType::default().file_name().unwrap(), "service.xml");
        assert!(ServiceType::new(" - ", "").file_name().is_err());
    }

    #[test]
    fn test_covers_is_inclusive() {
        let closure = Closure::new(day(2024, 1, 10), day(2024, 1, 12));
        assert!(closure.covers(day(2024, 1, 10)));
        assert!(closure.covers(day(2024, 1, 12)));
        assert!(!closure.covers(day(2024, 1, 9)));
        assert!(!closure.covers(day(2024, 1, 13)));
    }

    #[test]
    fn test_inverted_range_covers_nothing() {
        let closure = Closure::new(day(2024, 1, 12), day(2024, 1, 10));
        assert!(!closure.covers(day(2024, 1, 11)));
    }

    #[test]
    fn test_global_subscription() {
        let global = Subscription::email("a@example.com");
        assert!(global.is_global());

        let unsaved = Subscription::email("a@example.com").for_service(Service::new("1", "A"));
        assert!(unsaved.is_global());

        let mut service = Service::new("1", "A");
        service.id = 7;
        let specific = Subscription::email("a@example.com").for_service(service);
        assert!(!specific.is_global());
    }

    #[test]
    fn test_subscription_applies_to() {
        let mut hillside = Service::new("1", "Hillside");
        hillside.id = 7;
        let mut brookvale = Service::new("2", "Brookvale");
        brookvale.id = 8;

        assert!(Subscription::email("a@example.com").applies_to(&hillside));
        let specific = Subscription::email("a@example.com").for_service(hillside.clone());
        assert!(specific.applies_to(&hillside));
        assert!(!specific.applies_to(&brookvale));
    }

    #[test]
    fn test_status_names_round_trip() {
        for status in [
            ClosureStatus::Unknown,
            ClosureStatus::Closed,
            ClosureStatus::PartlyClosed,
        ] {
            assert_eq!(ClosureStatus::from_name(status.name()), Some(status));
        }
        assert_eq!(ClosureStatus::from_name("Open"), None);
    }

    #[test]
    fn test_service_with_urls_serializes() {
        let mut service = Service::new("1", "Hillside");
        service.url = Some(Url::parse("https://example.org/schools/hillside").unwrap());
        let mut closure = Closure::new(day(2024, 1, 10), day(2024, 1, 10));
        closure.linked_data_uri = Some(Url::parse("https://example.org/closures/1").unwrap());
        service.closures.push(closure);

        let json = serde_json::to_string(&service).unwrap();
        assert!(json.contains("\"url\":\"https://example.org/schools/hillside\""));

        let back: Service = serde_json::from_str(&json).unwrap();
        assert_eq!(back, service);
    }
}
