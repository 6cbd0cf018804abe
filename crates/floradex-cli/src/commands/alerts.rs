use serde_json::Value;

use crate::cli::AlertsArgs;
use crate::context::AppContext;
use crate::error::CliError;

pub fn run(args: &AlertsArgs, context: &AppContext) -> Result<Value, CliError> {
    let alerts = context.store.recent_alerts(args.limit)?;
    Ok(serde_json::to_value(alerts)?)
}
