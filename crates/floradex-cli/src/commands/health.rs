use serde::Serialize;
use serde_json::Value;

use floradex_core::{health_score, HealthScore, ProviderId};

use crate::cli::StatusArgs;
use crate::context::AppContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ProviderHealth {
    provider: ProviderId,
    health: HealthScore,
}

pub fn run(args: &StatusArgs, context: &AppContext) -> Result<Value, CliError> {
    let mut report = Vec::new();

    for client in context.clients() {
        let provider = client.provider();
        if let Some(selected) = args.provider {
            if ProviderId::from(selected) != provider {
                continue;
            }
        }

        report.push(ProviderHealth {
            provider,
            health: health_score(&client.stats()),
        });
    }

    Ok(serde_json::to_value(report)?)
}
