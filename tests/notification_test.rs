use anyhow::Result;
use chrono::NaiveDate;
use service_closures::adapters::RecordingTransport;
use service_closures::core::notify::{Delivery, SubscriberNotice};
use service_closures::core::{
    Closure, ClosureReason, ClosureStatus, MailTransport, Moderator, Service, ServiceType,
    Subscription, SubscriptionType,
};
use service_closures::utils::error::ClosureError;
use service_closures::{find_overdue, AppConfig, ModeratorNotifier, SubscriberNotifier};
use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;

const TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EmailTemplate>
  <Email OfficialNotification="false">
    <From>closures@example.org</From>
    <Subject>{Service} is {Status} on {Date}</Subject>
    <Body><![CDATA[<p>{Service} ({ServiceCode}) is {Status} due to {Reason}.</p><p>{Notes}</p><p><a href="{ServiceUrl}">Details</a> <a href="{Unsubscribe}">Unsubscribe</a> <a href="{ReportClosureUrl}">Report</a></p>]]></Body>
  </Email>
  <Email OfficialNotification="true">
    <From>official@example.org</From>
    <Subject>OFFICIAL NOTICE: {Service} is {Status}</Subject>
    <Body><![CDATA[<p>Added by {AddedBy}</p>]]></Body>
  </Email>
</EmailTemplate>"#;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn template_file() -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(TEMPLATE.as_bytes())?;
    Ok(file)
}

fn greenfield() -> Service {
    let mut service = Service::new("8451234", "Greenfield Primary");
    service.id = 12;
    service.url = Some(Url::parse("https://example.org/schools/greenfield").unwrap());
    service
}

fn snow_day() -> Closure {
    let mut closure = Closure::new(day(2024, 1, 10), day(2024, 1, 10))
        .with_status(ClosureStatus::Closed)
        .with_reason(ClosureReason {
            id: 1,
            reason: "Snow".to_string(),
            emergency: true,
            ..ClosureReason::default()
        });
    closure.added_by = Some("Head teacher".to_string());
    closure.notes = Some("Roads <closed>\n\nStay safe".to_string());
    closure
}

#[test]
fn test_shared_address_gets_one_email() -> Result<()> {
    let service = greenfield();
    let closure = snow_day();
    let template = template_file()?;
    let subscriptions = vec![
        Subscription::email("parent@example.com"),
        Subscription::email("parent@example.com").for_service(greenfield()),
    ];

    let notice = SubscriberNotice::builder()
        .service(&service)
        .closure(&closure)
        .template_file(template.path())
        .subscriptions(&subscriptions)
        .build()?;

    let transport = RecordingTransport::new();
    let report = SubscriberNotifier::new(&transport).send_email_notifications(&notice)?;

    assert_eq!(transport.sent_count(), 1);
    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(transport.sent()[0].to, vec!["parent@example.com".to_string()]);
    Ok(())
}

#[test]
fn test_tokens_are_substituted_per_tier_and_recipient() -> Result<()> {
    let service = greenfield();
    let closure = snow_day();
    let template = template_file()?;
    let standard = Subscription::email("parent@example.com");
    let code = standard.code;
    let subscriptions = vec![standard, Subscription::email("council@example.org").official()];

    let notice = SubscriberNotice::builder()
        .service(&service)
        .closure(&closure)
        .report_closure_url(Url::parse("https://example.org/report")?)
        .unsubscribe_url("https://example.org/unsubscribe/{0}")
        .template_file(template.path())
        .subscriptions(&subscriptions)
        .build()?;

    let transport = RecordingTransport::new();
    let report = SubscriberNotifier::new(&transport).send_email_notifications(&notice)?;
    assert!(report.all_delivered());

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);

    let first = &sent[0];
    assert_eq!(first.from.as_deref(), Some("closures@example.org"));
    assert_eq!(first.subject, "Greenfield Primary is Closed on 10 January 2024");
    assert!(first.html);
    assert!(first.body.contains("Greenfield Primary (8451234) is Closed due to Snow."));
    assert!(first.body.contains("Roads &lt;closed&gt;<br />Stay safe"));
    assert!(first.body.contains("https://example.org/schools/greenfield"));
    assert!(first
        .body
        .contains(&format!("https://example.org/unsubscribe/{}", code)));
    assert!(first.body.contains("https://example.org/report"));

    let official = &sent[1];
    assert_eq!(official.from.as_deref(), Some("official@example.org"));
    assert_eq!(official.subject, "OFFICIAL NOTICE: Greenfield Primary is Closed");
    assert_eq!(official.body, "<p>Added by Head teacher</p>");
    Ok(())
}

#[test]
fn test_configured_notice_reaches_matching_subscribers() -> Result<()> {
    let template = template_file()?;
    let config = AppConfig::from_toml_str(&format!(
        r#"
[data]
xml_folder = "./data"

[notifications]
moderator_from = "closures@example.org"
template_file = "{}"
report_closure_url = "https://example.org/report"
unsubscribe_url = "https://example.org/unsubscribe/{{0}}"
"#,
        template.path().display().to_string().replace('\\', "/")
    ))?;

    let service = greenfield();
    let closure = snow_day();
    let mut other = Service::new("8450001", "Hilltop Infants");
    other.id = 13;
    let everyone = Subscription::email("parent@example.com");
    let code = everyone.code;
    let exported = vec![
        everyone,
        Subscription::email("local@example.com").for_service(greenfield()),
        Subscription::email("elsewhere@example.com").for_service(other),
    ];
    let relevant: Vec<Subscription> = exported
        .into_iter()
        .filter(|s| s.applies_to(&service))
        .collect();

    let notice = config
        .notice_builder()?
        .service(&service)
        .closure(&closure)
        .subscriptions(&relevant)
        .build()?;
    let transport = RecordingTransport::new();
    let report = SubscriberNotifier::new(&transport).send_email_notifications(&notice)?;

    assert_eq!(report.sent, 2);
    let sent = transport.sent();
    assert!(sent.iter().all(|m| m.to != vec!["elsewhere@example.com".to_string()]));
    assert!(sent[0]
        .body
        .contains(&format!("https://example.org/unsubscribe/{}", code)));
    assert!(sent[0].body.contains("https://example.org/report"));
    Ok(())
}

#[test]
fn test_failed_recipient_does_not_stop_the_batch() -> Result<()> {
    let service = greenfield();
    let closure = snow_day();
    let template = template_file()?;
    let mut text = Subscription::email("07700900123");
    text.subscription_type = SubscriptionType::TextMessage;
    let subscriptions = vec![
        Subscription::email("bounce@example.com"),
        text,
        Subscription::email("parent@example.com"),
    ];

    let notice = SubscriberNotice::builder()
        .service(&service)
        .closure(&closure)
        .template_file(template.path())
        .subscriptions(&subscriptions)
        .build()?;

    let transport = RecordingTransport::new().failing_for("bounce@example.com");
    let report = SubscriberNotifier::new(&transport).send_email_notifications(&notice)?;

    assert_eq!(report.sent, 1);
    assert_eq!(report.skipped_unsupported, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].address, "bounce@example.com");
    assert!(!report.all_delivered());
    assert_eq!(transport.sent()[0].to, vec!["parent@example.com".to_string()]);
    Ok(())
}

#[test]
fn test_missing_arguments_and_template_fail_fast() -> Result<()> {
    let service = greenfield();
    let closure = snow_day();
    let subscriptions: Vec<Subscription> = Vec::new();

    let missing_template = SubscriberNotice::builder()
        .service(&service)
        .closure(&closure)
        .subscriptions(&subscriptions)
        .build();
    assert!(matches!(
        missing_template,
        Err(ClosureError::MissingArgument { .. })
    ));

    let missing_service = SubscriberNotice::builder()
        .closure(&closure)
        .template_file("template.xml")
        .subscriptions(&subscriptions)
        .build();
    assert!(matches!(missing_service, Err(ClosureError::MissingArgument { .. })));

    let notice = SubscriberNotice::builder()
        .service(&service)
        .closure(&closure)
        .template_file("/definitely/not/here.xml")
        .subscriptions(&subscriptions)
        .build()?;
    let transport = RecordingTransport::new();
    let result = SubscriberNotifier::new(&transport).send_email_notifications(&notice);
    assert!(matches!(result, Err(ClosureError::Template { .. })));
    Ok(())
}

fn overdue_service(name: &str, count: usize) -> Service {
    let mut service = Service::new(name.to_lowercase(), name);
    for i in 0..count {
        let mut closure = Closure::new(day(2024, 1, 8), day(2024, 1, 19 + i as u32))
            .with_status(ClosureStatus::PartlyClosed)
            .with_reason(ClosureReason {
                id: 1,
                reason: "Flooding".to_string(),
                emergency: true,
                ..ClosureReason::default()
            });
        closure.confirmation_required = true;
        closure.confirmation_overdue = true;
        service.closures.push(closure);
    }
    service
        .closures
        .push(Closure::new(day(2024, 2, 1), day(2024, 2, 1)));
    service
}

#[test]
fn test_moderators_get_one_alert_with_count() {
    let services = vec![overdue_service("Hillside", 2), overdue_service("Riverside", 1)];
    let overdue = find_overdue(&services);
    let moderators = vec![
        Moderator::new("mod1@example.org"),
        Moderator::new("mod2@example.org"),
    ];

    let transport = RecordingTransport::new();
    let notifier = ModeratorNotifier::new(&transport, "closures@example.org");
    let alert = notifier.notify_overdue_confirmations(
        &ServiceType::new("school", "schools"),
        &overdue,
        &moderators,
    );

    assert_eq!(alert.overdue_count, 3);
    assert_eq!(alert.delivery, Delivery::Sent);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].to,
        vec!["mod1@example.org".to_string(), "mod2@example.org".to_string()]
    );
    assert!(sent[0].subject.contains('3'));
    assert!(sent[0]
        .body
        .contains("Hillside partly closed due to Flooding, 8 to 19 January 2024"));
    assert!(sent[0].body.ends_with("++ Disclaimer\n\n"));
}

#[test]
fn test_no_alert_without_overdue_or_moderators() {
    let transport = RecordingTransport::new();
    let notifier = ModeratorNotifier::new(&transport, "closures@example.org");
    let service_type = ServiceType::default();

    let nothing_overdue = find_overdue(&[overdue_service("Hillside", 0)]);
    let alert = notifier.notify_overdue_confirmations(
        &service_type,
        &nothing_overdue,
        &[Moderator::new("mod@example.org")],
    );
    assert_eq!(alert.overdue_count, 0);
    assert_eq!(alert.delivery, Delivery::NotRequired);

    let overdue = find_overdue(&[overdue_service("Hillside", 2)]);
    let alert = notifier.notify_overdue_confirmations(&service_type, &overdue, &[]);
    assert_eq!(alert.overdue_count, 2);
    assert_eq!(alert.delivery, Delivery::NotRequired);

    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn test_failed_alert_still_reports_count() {
    let transport = RecordingTransport::new().failing_for("mod@example.org");
    let dyn_transport: &dyn MailTransport = &transport;
    let notifier = ModeratorNotifier::new(dyn_transport, "closures@example.org");

    let overdue = find_overdue(&[overdue_service("Hillside", 1)]);
    let alert = notifier.notify_overdue_confirmations(
        &ServiceType::default(),
        &overdue,
        &[Moderator::new("mod@example.org")],
    );

    assert_eq!(alert.overdue_count, 1);
    assert!(matches!(alert.delivery, Delivery::Failed(_)));
}
