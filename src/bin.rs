//! Binary entry point for `support-triage`.
//!
//! This module provides the command-line interface for support-triage with options
//! for configuration file paths, logging verbosity, and trace export. It initializes
//! the necessary components and starts a console chat session.

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use support_triage::base::{config::Config, types::Void};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Support-triage: a supportive chat with triage and escalation.
///
/// Configuration can come from `config.toml` or environment variables
/// prefixed with `SUPPORT_TRIAGE_`. Chat happens on stdin / stdout;
/// logs are written to stderr.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the config file at `.hidden/config.toml`
    /// in the current directory is used, if present.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: WARN level
    /// - -v: INFO level
    /// - -vv: DEBUG level
    /// - -vvv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Export traces over OTLP (HTTP), configured via the standard `OTEL_EXPORTER_OTLP_*` variables.
    #[arg(long)]
    otlp: bool,
}

/// Main entry point for the support-triage binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the chat.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    // The console is also the chat surface, so stay quiet by default.
    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("support-triage");

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stderr).init();

    let config = Config::load(args.config.as_deref())?;

    support_triage::start(config).await
}
