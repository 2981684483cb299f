mod config;

use std::sync::Arc;
use std::time::Duration;

use dispatch_worker::DispatchWorker;
use spanfan_postgres::{PostgresClient, PostgresPeriodRepository, PostgresQueryExecutor};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use config::ServiceConfig;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!(
        max_connections = config.max_connections,
        use_batching = config.use_batching,
        batch_size = config.batch_size,
        "Starting spanfan dispatch run"
    );
    debug!("Configuration: {:?}", config);

    // Pool establishment is the only fatal path: no partial results exist
    // before the first dispatch, so abort outright.
    let client = match PostgresClient::new(&config.postgres()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create connection pool: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = client.ping().await {
        error!("Failed to establish database connection: {:#}", e);
        std::process::exit(1);
    }
    if let Err(e) = client.warm(config.min_connections).await {
        error!("Failed to warm connection pool: {:#}", e);
        std::process::exit(1);
    }

    let repository = Arc::new(PostgresPeriodRepository::new(client.clone()));
    let executor = Arc::new(PostgresQueryExecutor::new(
        client,
        Duration::from_secs(config.command_timeout_secs),
    ));
    let worker = DispatchWorker::new(repository, executor, config.dispatch());

    // An operator interrupt stops admission of further queries; in-flight
    // ones are abandoned and the outcomes gathered so far are reported.
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                signal_token.cancel();
            }
            Err(err) => {
                error!("Error setting up signal handler: {}", err);
            }
        }
    });

    match worker.run(cancel).await {
        Ok(run) => {
            println!("{}", run.summary);
        }
        Err(e) => {
            error!("Dispatch run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
