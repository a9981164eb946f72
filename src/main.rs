//! DB Gateway - Main entry point.
//!
//! Reads one JSON request per line from stdin and writes one JSON response per
//! line to stdout. Logs go to stderr.

use clap::Parser;
use db_gateway::config::Config;
use db_gateway::db::ConnectionManager;
use db_gateway::protocol::GatewayService;
use db_gateway::transport::{ShutdownReason, StdioTransport, wait_for_signal};
use tokio::io::BufReader;
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries protocol lines only
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let db_config = config.database_config();
    let session = info_span!("session", session_id = %Uuid::new_v4());

    info!(
        parent: &session,
        backend = %db_config.backend,
        database = %db_config.display_name(),
        "Starting DB Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let connection_manager = ConnectionManager::new(db_config)
        .with_connect_timeout(config.connect_timeout())
        .with_query_timeout(config.query_timeout());
    let mut transport = StdioTransport::new(GatewayService::new(connection_manager));

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let result = transport
        .serve(stdin, stdout, wait_for_signal())
        .instrument(session.clone())
        .await;

    match result {
        Ok(ShutdownReason::EndOfInput) => {
            info!(parent: &session, "Gateway shutdown complete");
            Ok(())
        }
        Ok(ShutdownReason::Signal) => {
            // The stdin reader runs on a blocking thread the runtime cannot interrupt
            info!(parent: &session, "Shutdown signal received, exiting");
            std::process::exit(0);
        }
        Err(e) => {
            error!(parent: &session, error = %e, "Gateway error");
            Err(e.into())
        }
    }
}
