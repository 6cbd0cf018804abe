use serde_json::Value;

use floradex_core::SyncConfig;

use crate::cli::EnrichArgs;
use crate::context::AppContext;
use crate::error::CliError;

pub async fn run(args: &EnrichArgs, context: &AppContext) -> Result<Value, CliError> {
    let mut config = SyncConfig::default();
    if let Some(limit) = args.limit {
        config.enrichment_batch = limit;
    }

    let engine = context.engine(args.provider.into(), config);
    let report = engine.run_enrichment().await?;

    Ok(serde_json::to_value(report)?)
}
