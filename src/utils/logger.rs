use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` overrides these. SMTP chatter from lettre stays at warn unless verbose.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,service_closures=debug,lettre=info"
    } else {
        "warn,service_closures=info"
    }
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Human output for interactive use: no timestamps cluttering short command runs.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// For scheduled overdue checks whose output is collected by a log shipper.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false),
        )
        .init();
}
