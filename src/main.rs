use clap::Parser;
use service_closures::adapters::{read_subscriptions, RecordingTransport, SmtpTransport, SystemClock};
use service_closures::core::notify::{Delivery, DispatchReport};
use service_closures::core::overdue::confirm_closure;
use service_closures::core::query::display_day;
use service_closures::core::{
    Clock, ClosureDataSource, ClosureDocument, ClosureRepository, MailTransport, Moderator,
    Subscription,
};
use service_closures::utils::error::ErrorCategory;
use service_closures::utils::{logger, validation::Validate};
use service_closures::{
    find_overdue, AppConfig, CliConfig, ClosureError, ClosureQuery, Command, ModeratorNotifier,
    SubscriberNotifier,
};

fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting closures CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli) {
        tracing::error!("❌ {} (Category: {:?})", e, e.category());
        eprintln!("❌ {}", e);

        let exit_code = match e.category() {
            ErrorCategory::Usage | ErrorCategory::Configuration => 2,
            ErrorCategory::Delivery => 3,
            ErrorCategory::Storage | ErrorCategory::Data => 1,
        };
        std::process::exit(exit_code);
    }
}

fn run(cli: &CliConfig) -> Result<(), ClosureError> {
    let config = AppConfig::from_file(&cli.config)?;
    config.validate()?;

    let service_type = config.service_type();
    let mut document = config.data_source().read_closure_data(&service_type)?;

    // Dry runs record messages instead of sending them
    let recorder = RecordingTransport::new();
    let smtp = match &cli.command {
        Command::Overdue { dry_run: false, .. } | Command::Notify { dry_run: false, .. } => {
            Some(SmtpTransport::new(config.smtp()?)?)
        }
        _ => None,
    };
    let transport: &dyn MailTransport = match &smtp {
        Some(smtp) => smtp,
        None => &recorder,
    };

    match &cli.command {
        Command::Status {
            code,
            date,
            emergency_only,
            json,
        } => {
            let day = (*date).unwrap_or_else(|| display_day(SystemClock.now(), config.cutoff_hour()));
            let closures = ClosureQuery::new(&document).closures_by_date_and_service_code(
                day,
                Some(code.as_str()),
                *emergency_only,
            );
            if *json {
                println!("{}", to_json(&closures)?);
            } else if closures.is_empty() {
                println!("No closures for {} on {}", code, day);
            } else {
                for closure in closures {
                    println!(
                        "{} {} to {}: {}",
                        closure.status.name(),
                        closure.start_date,
                        closure.end_date,
                        closure.reason.reason
                    );
                }
            }
        }
        Command::Services { json } => {
            let services = ClosureQuery::new(&document).all_services();
            if *json {
                println!("{}", to_json(&services)?);
            } else {
                for service in services {
                    println!("{}\t{}", service.code, service.name);
                }
            }
        }
        Command::Overdue {
            moderators,
            dry_run,
        } => {
            let moderators: Vec<Moderator> = moderators.iter().map(Moderator::new).collect();
            alert_moderators(&config, &document, transport, &moderators, *dry_run)?;
        }
        Command::Notify {
            code,
            closure_id,
            subscriptions,
            dry_run,
        } => {
            let subscriptions = read_subscriptions(subscriptions)?;
            let report = notify_subscribers(
                &config,
                &document,
                transport,
                code,
                *closure_id,
                &subscriptions,
            )?;
            if *dry_run {
                for message in recorder.sent() {
                    println!(
                        "To: {}\nSubject: {}\n\n{}\n",
                        message.to.join(", "),
                        message.subject,
                        message.body
                    );
                }
            }
            println!(
                "{} sent, {} duplicate, {} unsupported, {} failed",
                report.sent,
                report.skipped_duplicates,
                report.skipped_unsupported,
                report.failures.len()
            );
            if let Some(failure) = report.failures.first() {
                return Err(ClosureError::transport(failure.address.clone(), failure.error.clone()));
            }
        }
        Command::Confirm { code, closure_id } => {
            let closure = confirm_closure(&mut document, code, *closure_id, SystemClock.now())?;
            config.repository().save_closure_info(&service_type, &document)?;
            println!(
                "Confirmed closure {} ({} to {})",
                closure.id, closure.start_date, closure.end_date
            );
        }
    }

    Ok(())
}

fn alert_moderators(
    config: &AppConfig,
    document: &ClosureDocument,
    transport: &dyn MailTransport,
    moderators: &[Moderator],
    dry_run: bool,
) -> Result<(), ClosureError> {
    let service_type = config.service_type();
    let overdue = find_overdue(&document.services);
    let notifier = ModeratorNotifier::new(transport, config.notifications.moderator_from.clone());

    if dry_run {
        if !overdue.is_empty() {
            let message = notifier.compose(&service_type, &overdue, moderators);
            println!("To: {}\nSubject: {}\n\n{}", message.to.join(", "), message.subject, message.body);
        }
        println!("{} overdue", overdue.len());
        return Ok(());
    }

    let alert = notifier.notify_overdue_confirmations(&service_type, &overdue, moderators);
    println!("{} overdue ({:?})", alert.overdue_count, alert.delivery);
    match alert.delivery {
        Delivery::Failed(message) => Err(ClosureError::transport(
            moderators
                .iter()
                .map(|m| m.email_address.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            message,
        )),
        _ => Ok(()),
    }
}

fn notify_subscribers(
    config: &AppConfig,
    document: &ClosureDocument,
    transport: &dyn MailTransport,
    code: &str,
    closure_id: i32,
    subscriptions: &[Subscription],
) -> Result<DispatchReport, ClosureError> {
    let service = ClosureQuery::new(document)
        .service_by_code(Some(code))
        .ok_or_else(|| ClosureError::not_found(format!("service {}", code)))?;
    let closure = service
        .closures
        .iter()
        .find(|c| c.id == closure_id)
        .ok_or_else(|| ClosureError::not_found(format!("closure {} for {}", closure_id, code)))?;

    let relevant: Vec<Subscription> = subscriptions
        .iter()
        .filter(|s| s.applies_to(service))
        .cloned()
        .collect();
    let notice = config
        .notice_builder()?
        .service(service)
        .closure(closure)
        .subscriptions(&relevant)
        .build()?;

    SubscriberNotifier::new(transport).send_email_notifications(&notice)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ClosureError> {
    serde_json::to_string_pretty(value).map_err(|e| ClosureError::document(e.to_string()))
}
