use sentry::ClientInitGuard;
use sentry_tracing::EventFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::Env;

/// Keeps the log writer and the Sentry client alive. Dropping it flushes
/// whatever is still buffered.
pub struct TracingGuards {
    _writer: WorkerGuard,
    _sentry: Option<ClientInitGuard>,
}

/// JSON lines in production, human readable output everywhere else. Warnings
/// and errors also go to Sentry when a DSN is set.
pub fn init_tracing(env: &Env, sentry_dsn: Option<&str>) -> TracingGuards {
    let (writer, writer_guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));

    let (json, pretty) = match env {
        Env::Production => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .log_internal_errors(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_span_list(true)
                    .with_target(true),
            ),
            None,
        ),
        Env::Development | Env::Test => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true),
            ),
        ),
    };

    let sentry = sentry_dsn.map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(env.to_string().into()),
                debug: *env != Env::Production,
                ..Default::default()
            },
        ))
    });
    let sentry_layer = sentry.as_ref().map(|_| {
        sentry_tracing::layer().event_filter(|md| match *md.level() {
            tracing::Level::ERROR | tracing::Level::WARN => EventFilter::Event,
            tracing::Level::INFO => EventFilter::Breadcrumb,
            _ => EventFilter::Ignore,
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .with(sentry_layer)
        .init();

    TracingGuards {
        _writer: writer_guard,
        _sentry: sentry,
    }
}
