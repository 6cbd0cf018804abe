use std::time::Duration;

use serde_json::{json, Value};
use tracing::info;

use floradex_core::AlertWatcher;

use crate::cli::WatchArgs;
use crate::context::AppContext;
use crate::error::CliError;

/// Run the periodic alert check loop until interrupted.
pub async fn run(args: &WatchArgs, context: &AppContext) -> Result<Value, CliError> {
    let dispatcher = context.dispatcher();
    let watcher = AlertWatcher::new(
        dispatcher.clone(),
        context.clients().to_vec(),
        Duration::from_secs(args.interval_secs.max(1)),
    );

    info!(interval_secs = args.interval_secs, "alert watcher started");
    let handle = watcher.spawn();

    tokio::signal::ctrl_c().await?;
    info!("shutting down alert watcher");
    handle.shutdown().await;

    let history = dispatcher.history();
    Ok(json!({
        "alerts_fired": history.len(),
        "alerts": history,
    }))
}
