//! `reel-watch` -- analysis status watcher.
//!
//! Polls the analysis status of one script version, logs progress on
//! every change, and exits once the pipeline is quiescent (or on Ctrl-C).
//!
//! # Environment variables
//!
//! | Variable            | Required | Default | Description                         |
//! |---------------------|----------|---------|-------------------------------------|
//! | `API_BASE_URL`      | yes      | --      | Backend base URL                    |
//! | `SCRIPT_ID`         | yes      | --      | Script to watch                     |
//! | `VERSION_ID`        | yes      | --      | Version of the script               |
//! | `API_TOKEN`         | no       | --      | Bearer token                        |
//! | `POLL_INTERVAL_MS`  | no       | `5000`  | Milliseconds between refetches      |
//! | `STEP_CATALOG_PATH` | no       | --      | JSON step catalog override          |
//! | `EXIT_WHEN_IDLE`    | no       | `true`  | Exit once polling goes idle         |

use std::sync::Arc;

use reel_client::{PollMode, StatusApi, StatusPoller, StatusTarget};
use reel_watch::config::WatchConfig;
use reel_watch::report;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reel_watch=info,reel_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatchConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let catalog = config.load_catalog().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load step catalog");
        std::process::exit(1);
    });

    tracing::info!(
        api_base_url = %config.api_base_url,
        script_id = %config.script_id,
        version_id = %config.version_id,
        interval_ms = catalog.polling.interval.as_millis() as u64,
        "Starting reel-watch",
    );

    let mut api = StatusApi::new(config.api_base_url.clone());
    if let Some(token) = &config.api_token {
        api = api.with_token(token.clone());
    }

    let target = StatusTarget::new(config.script_id.clone(), config.version_id.clone());
    let handle = StatusPoller::new(Arc::new(api), target, catalog).spawn();
    let mut updates = handle.subscribe();

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                report::log_state(&state);

                match state.mode {
                    PollMode::Idle(_) if config.exit_when_idle => break,
                    PollMode::Stopped => break,
                    _ => {}
                }
            }
        }
    }

    handle.shutdown().await;
}
