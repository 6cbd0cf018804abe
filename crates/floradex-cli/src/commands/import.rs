use serde_json::Value;

use floradex_core::SyncConfig;

use crate::cli::ImportArgs;
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run(args: &ImportArgs, context: &AppContext) -> Result<Value, CliError> {
    let mut config = SyncConfig::default();
    if let Some(pages) = args.pages {
        config.pages_per_run = pages;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }

    let engine = context.engine(args.provider.into(), config);
    let report = engine.run_import().await?;

    Ok(serde_json::to_value(report)?)
}
