mod utils;

use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common::directory::spawn_poller;

use crate::http;
use crate::{Config, ServiceState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Install the global subscriber; logs go to stdout until the guard drops
pub fn init_logging(log_level: tracing::Level) -> WorkerGuard {
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();
    guard
}

/// Run a node from `config` until SIGINT or SIGTERM
pub async fn spawn_service(config: &Config) {
    let _guard = init_logging(config.log_level());

    utils::register_panic_logger();
    utils::report_build_info();

    let (graceful_waiter, _shutdown_tx, shutdown_rx) = match utils::graceful_shutdown_blocker() {
        Ok(blocker) => blocker,
        Err(e) => {
            tracing::error!("unable to install signal handlers: {}", e);
            std::process::exit(2);
        }
    };

    let state = match ServiceState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    };

    let handles = start_service(config, &state, shutdown_rx);

    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }

    if let Err(e) = state.peer().store().close().await {
        tracing::error!("failed to close record store: {}", e);
    }
    tracing::info!("node stopped");
}

/// Spawn the HTTP server and the directory poller for `state`
///
/// Both stop once `shutdown_rx` fires.
pub fn start_service(
    config: &Config,
    state: &ServiceState,
    shutdown_rx: watch::Receiver<()>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    let http_config = http::Config::from(config);
    let http_state = state.clone();
    let http_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        tracing::info!("Starting node server on {}", http_config.listen_addr);
        if let Err(e) = http::run(http_config, http_state, http_rx).await {
            tracing::error!("node server error: {}", e);
        }
    }));

    handles.push(spawn_poller(
        state.peer().directory().clone(),
        config.poll_interval(),
        shutdown_rx,
    ));

    handles
}
