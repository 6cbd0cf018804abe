use serde_json::{json, Value};

use floradex_core::ProviderId;

use crate::cli::ResetArgs;
use crate::context::AppContext;
use crate::error::CliError;

pub fn run(args: &ResetArgs, context: &AppContext) -> Result<Value, CliError> {
    let provider: ProviderId = args.provider.into();

    context.client(provider).reset();
    if args.checkpoint {
        context.store.reset_checkpoint(provider)?;
    }

    Ok(json!({
        "provider": provider,
        "stats_reset": true,
        "checkpoint_reset": args.checkpoint,
    }))
}
