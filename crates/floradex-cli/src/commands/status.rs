use serde::Serialize;
use serde_json::Value;

use floradex_core::sync::CheckpointStore;
use floradex_core::{CircuitState, ProviderId, RequestStats, SyncCheckpoint};
use floradex_store::DraftCounts;

use crate::cli::StatusArgs;
use crate::context::AppContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct ProviderStatus {
    provider: ProviderId,
    configured: bool,
    circuit_state: CircuitState,
    stats: RequestStats,
    checkpoint: Option<SyncCheckpoint>,
    drafts: DraftCounts,
}

/// Best-effort snapshot: store hiccups degrade to defaults instead of
/// failing the whole status call.
pub fn run(args: &StatusArgs, context: &AppContext) -> Result<Value, CliError> {
    let mut statuses = Vec::new();

    for client in context.clients() {
        let provider = client.provider();
        if let Some(selected) = args.provider {
            if ProviderId::from(selected) != provider {
                continue;
            }
        }

        let checkpoint = context.store.get(provider).unwrap_or_default();
        let drafts = context.store.draft_counts(provider).unwrap_or_default();

        statuses.push(ProviderStatus {
            provider,
            configured: client.is_configured(),
            circuit_state: client.circuit_state(),
            stats: client.stats(),
            checkpoint,
            drafts,
        });
    }

    Ok(serde_json::to_value(statuses)?)
}
