//! # Closure document wire form
//!
//! The `ClosureInfo` XML document, one per service type:
//!
//! ```xml
//! <ClosureInfo xmlns="...">
//!   <Services>
//!     <Service>
//!       <Code>1</Code>
//!       <Name>Hillside Primary</Name>
//!       <Closures>
//!         <Closure>
//!           <Status>Closed</Status>
//!           <StartDate>2024-01-10T00:00:00</StartDate>
//!           <EndDate>2024-01-12T00:00:00</EndDate>
//!           <Reason><Id>1</Id><Reason>Snow</Reason><Emergency>true</Emergency></Reason>
//!         </Closure>
//!       </Closures>
//!     </Service>
//!   </Services>
//! </ClosureInfo>
//! ```
//!
//! Scalar elements are read as text and converted afterwards so one bad row
//! never makes the whole document unreadable.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::model::{
    Closure, ClosureDocument, ClosureReason, ClosureStatus, Service, ServiceType,
    ShowAllServicesView, DEFAULT_SHORT_NOTICE_DAYS,
};
use crate::utils::error::{ClosureError, Result};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "ClosureInfo")]
struct ClosureInfoXml {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    xmlns: Option<String>,
    #[serde(rename = "Services", default)]
    services: ServicesXml,
    #[serde(rename = "ShowAllServicesView", default, skip_serializing_if = "Option::is_none")]
    show_all_services_view: Option<String>,
    #[serde(rename = "ShortNoticeDays", default, skip_serializing_if = "Option::is_none")]
    short_notice_days: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ServicesXml {
    #[serde(rename = "Service", default)]
    items: Vec<ServiceXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ServiceXml {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "LinkedDataUri", default, skip_serializing_if = "Option::is_none")]
    linked_data_uri: Option<String>,
    #[serde(rename = "Url", default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    service_type: Option<ServiceTypeXml>,
    #[serde(rename = "Closures", default)]
    closures: ClosuresXml,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ServiceTypeXml {
    #[serde(rename = "SingularText", default)]
    singular_text: Option<String>,
    #[serde(rename = "PluralText", default)]
    plural_text: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClosuresXml {
    #[serde(rename = "Closure", default)]
    items: Vec<ClosureXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClosureXml {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "StartDate", default)]
    start_date: Option<String>,
    #[serde(rename = "EndDate", default)]
    end_date: Option<String>,
    #[serde(rename = "Reason", default, skip_serializing_if = "Option::is_none")]
    reason: Option<ReasonXml>,
    #[serde(rename = "Notes", default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(rename = "DaysNotice", default, skip_serializing_if = "Option::is_none")]
    days_notice: Option<String>,
    #[serde(rename = "AddedBy", default, skip_serializing_if = "Option::is_none")]
    added_by: Option<String>,
    #[serde(rename = "DateAdded", default, skip_serializing_if = "Option::is_none")]
    date_added: Option<String>,
    #[serde(rename = "DateModified", default, skip_serializing_if = "Option::is_none")]
    date_modified: Option<String>,
    #[serde(rename = "ConfirmationRequired", default, skip_serializing_if = "Option::is_none")]
    confirmation_required: Option<String>,
    #[serde(rename = "ConfirmationOverdue", default, skip_serializing_if = "Option::is_none")]
    confirmation_overdue: Option<String>,
    #[serde(rename = "ConfirmedDate", default, skip_serializing_if = "Option::is_none")]
    confirmed_date: Option<String>,
    #[serde(rename = "LinkedDataUri", default, skip_serializing_if = "Option::is_none")]
    linked_data_uri: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReasonXml {
    #[serde(rename = "Id", default)]
    id: Option<String>,
    #[serde(rename = "Reason", default)]
    reason: Option<String>,
    #[serde(rename = "Emergency", default, skip_serializing_if = "Option::is_none")]
    emergency: Option<String>,
    #[serde(rename = "RequiresNotes", default, skip_serializing_if = "Option::is_none")]
    requires_notes: Option<String>,
    #[serde(rename = "Selectable", default, skip_serializing_if = "Option::is_none")]
    selectable: Option<String>,
    #[serde(rename = "MayAffectAllServices", default, skip_serializing_if = "Option::is_none")]
    may_affect_all_services: Option<String>,
}

/// `YYYYMMDD` built from the first ten characters of a sortable date
/// (`YYYY-MM-DD...`).
pub fn day_number(text: &str) -> Option<u32> {
    let bytes = text.trim().get(..10)?.as_bytes();
    let digits = [&bytes[0..4], &bytes[5..7], &bytes[8..10]].concat();
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    String::from_utf8(digits).ok()?.parse().ok()
}

pub fn parse_day(text: &str) -> Option<NaiveDate> {
    let number = day_number(text)?;
    NaiveDate::from_ymd_opt((number / 10000) as i32, (number / 100) % 100, number % 100)
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|d| d.naive_local()))
        .or_else(|| parse_day(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn parse_bool(text: Option<&str>) -> bool {
    matches!(text.map(str::trim), Some("true") | Some("1"))
}

fn parse_int(text: Option<&str>) -> Option<i32> {
    text.and_then(|t| t.trim().parse().ok())
}

fn parse_url(text: Option<&str>) -> Option<Url> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .and_then(|t| Url::parse(t).ok())
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%dT00:00:00").to_string()
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn view_from_name(name: Option<&str>) -> ShowAllServicesView {
    match name.map(str::trim) {
        Some("Always") => ShowAllServicesView::Always,
        Some("Never") => ShowAllServicesView::Never,
        _ => ShowAllServicesView::Auto,
    }
}

fn view_name(view: ShowAllServicesView) -> &'static str {
    match view {
        ShowAllServicesView::Always => "Always",
        ShowAllServicesView::Never => "Never",
        ShowAllServicesView::Auto => "Auto",
    }
}

fn reason_from_xml(xml: ReasonXml) -> ClosureReason {
    ClosureReason {
        id: parse_int(xml.id.as_deref()).unwrap_or(0),
        reason: xml.reason.unwrap_or_default(),
        emergency: parse_bool(xml.emergency.as_deref()),
        requires_notes: parse_bool(xml.requires_notes.as_deref()),
        selectable: parse_bool(xml.selectable.as_deref()),
        may_affect_all_services: parse_bool(xml.may_affect_all_services.as_deref()),
    }
}

fn closure_from_xml(service_name: &str, xml: ClosureXml) -> Option<Closure> {
    let start = xml.start_date.as_deref().and_then(parse_day);
    let end = xml.end_date.as_deref().and_then(parse_day);
    let (Some(start_date), Some(end_date)) = (start, end) else {
        tracing::warn!(
            "Dropping closure for {} with unreadable dates ({:?} to {:?})",
            service_name,
            xml.start_date,
            xml.end_date
        );
        return None;
    };

    Some(Closure {
        id: parse_int(xml.id.as_deref()).unwrap_or(0),
        status: xml
            .status
            .as_deref()
            .and_then(ClosureStatus::from_name)
            .unwrap_or_default(),
        start_date,
        end_date,
        reason: xml.reason.map(reason_from_xml).unwrap_or_default(),
        notes: non_empty(xml.notes),
        days_notice: parse_int(xml.days_notice.as_deref()).unwrap_or(0),
        added_by: non_empty(xml.added_by),
        date_added: xml.date_added.as_deref().and_then(parse_timestamp),
        date_modified: xml.date_modified.as_deref().and_then(parse_timestamp),
        confirmation_required: parse_bool(xml.confirmation_required.as_deref()),
        confirmation_overdue: parse_bool(xml.confirmation_overdue.as_deref()),
        confirmed_date: xml.confirmed_date.as_deref().and_then(parse_timestamp),
        linked_data_uri: parse_url(xml.linked_data_uri.as_deref()),
    })
}

fn service_from_xml(xml: ServiceXml) -> Service {
    let mut service = Service::new(
        xml.code.map(|c| c.trim().to_string()).unwrap_or_default(),
        xml.name.map(|n| n.trim().to_string()).unwrap_or_default(),
    );
    service.id = parse_int(xml.id.as_deref()).unwrap_or(0);
    service.linked_data_uri = parse_url(xml.linked_data_uri.as_deref());
    service.url = parse_url(xml.url.as_deref());
    if let Some(service_type) = xml.service_type {
        let defaults = ServiceType::default();
        service.service_type = ServiceType::new(
            non_empty(service_type.singular_text).unwrap_or(defaults.singular_text),
            non_empty(service_type.plural_text).unwrap_or(defaults.plural_text),
        );
    }

    for closure_xml in xml.closures.items {
        if let Some(closure) = closure_from_xml(&service.name, closure_xml) {
            service
                .reasons_for_closure
                .entry(closure.reason.id)
                .or_insert_with(|| closure.reason.clone());
            service.closures.push(closure);
        }
    }
    service
}

/// Parses a `ClosureInfo` document.
pub fn parse_closure_document(xml: &str) -> Result<ClosureDocument> {
    if !xml.contains("<ClosureInfo") {
        return Err(ClosureError::document("missing ClosureInfo root element"));
    }
    let info: ClosureInfoXml =
        quick_xml::de::from_str(xml).map_err(|e| ClosureError::document(e.to_string()))?;

    let short_notice_days = parse_int(info.short_notice_days.as_deref())
        .filter(|days| *days >= 0)
        .unwrap_or(DEFAULT_SHORT_NOTICE_DAYS);

    let document = ClosureDocument {
        show_all_services_view: view_from_name(info.show_all_services_view.as_deref()),
        short_notice_days,
        services: info.services.items.into_iter().map(service_from_xml).collect(),
    };
    tracing::debug!("Parsed closure document with {} services", document.services.len());
    Ok(document)
}

fn reason_to_xml(reason: &ClosureReason) -> ReasonXml {
    ReasonXml {
        id: Some(reason.id.to_string()),
        reason: Some(reason.reason.clone()),
        emergency: Some(reason.emergency.to_string()),
        requires_notes: Some(reason.requires_notes.to_string()),
        selectable: Some(reason.selectable.to_string()),
        may_affect_all_services: Some(reason.may_affect_all_services.to_string()),
    }
}

fn closure_to_xml(closure: &Closure) -> ClosureXml {
    ClosureXml {
        id: (closure.id > 0).then(|| closure.id.to_string()),
        status: Some(closure.status.name().to_string()),
        start_date: Some(format_day(closure.start_date)),
        end_date: Some(format_day(closure.end_date)),
        reason: Some(reason_to_xml(&closure.reason)),
        notes: closure.notes.clone(),
        days_notice: Some(closure.days_notice.to_string()),
        added_by: closure.added_by.clone(),
        date_added: closure.date_added.map(format_timestamp),
        date_modified: closure.date_modified.map(format_timestamp),
        confirmation_required: Some(closure.confirmation_required.to_string()),
        confirmation_overdue: Some(closure.confirmation_overdue.to_string()),
        confirmed_date: closure.confirmed_date.map(format_timestamp),
        linked_data_uri: closure.linked_data_uri.as_ref().map(Url::to_string),
    }
}

fn service_to_xml(service: &Service) -> ServiceXml {
    ServiceXml {
        id: (service.id > 0).then(|| service.id.to_string()),
        code: Some(service.code.clone()),
        name: Some(service.name.clone()),
        linked_data_uri: service.linked_data_uri.as_ref().map(Url::to_string),
        url: service.url.as_ref().map(Url::to_string),
        service_type: Some(ServiceTypeXml {
            singular_text: Some(service.service_type.singular_text.clone()),
            plural_text: Some(service.service_type.plural_text.clone()),
        }),
        closures: ClosuresXml {
            items: service.closures.iter().map(closure_to_xml).collect(),
        },
    }
}

/// Serializes a document, declaring `namespace` as the default namespace when non-empty.
pub fn write_closure_document(document: &ClosureDocument, namespace: &str) -> Result<String> {
    let info = ClosureInfoXml {
        xmlns: Some(namespace.to_string()).filter(|ns| !ns.is_empty()),
        services: ServicesXml {
            items: document.services.iter().map(service_to_xml).collect(),
        },
        show_all_services_view: Some(view_name(document.show_all_services_view).to_string()),
        short_notice_days: Some(document.short_notice_days.to_string()),
    };
    let body = quick_xml::se::to_string(&info).map_err(|e| ClosureError::document(e.to_string()))?;
    Ok(format!("{}\n{}", XML_DECLARATION, body))
}
