//! Watch command: load rules, start sessions, run until Ctrl-C.

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::{CONFIG_FILE_NAME, Settings};
use crate::operation::OperationKind;
use crate::watcher::Dispatcher;

/// Load `config.json` from the working directory and watch until stopped.
///
/// Configuration problems are returned before any watch is registered.
pub async fn run(operation: OperationKind) -> anyhow::Result<()> {
    let settings =
        Settings::load().with_context(|| format!("Error with {CONFIG_FILE_NAME} file"))?;
    settings
        .validate(operation)
        .with_context(|| format!("Error with {CONFIG_FILE_NAME} file"))?;

    crate::logging::init_with_config(&settings.logging);

    let shutdown = CancellationToken::new();
    tokio::spawn(stop_on_ctrl_c(shutdown.clone()));

    let report = Dispatcher::new(&settings, operation)
        .run(shutdown)
        .await
        .context("Nothing to watch")?;

    for error in &report.failed {
        tracing::warn!("[watch] {error}");
    }
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C.
///
/// If the handler cannot be installed the run continues until killed.
async fn stop_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            crate::log_event!("watch", "stop requested");
            shutdown.cancel();
        }
        Err(e) => {
            tracing::warn!("[watch] cannot listen for Ctrl-C: {e}");
        }
    }
}
