//! Behavior-driven tests for the enrichment sync.
//!
//! These tests verify HOW stale drafts are refreshed: field-level merges,
//! discrepancy records on upstream misses, and partial-failure tolerance.

use std::sync::Arc;
use std::time::Duration;

use floradex_core::domain::StaleDraft;
use floradex_core::{
    CircuitBreakerConfig, HttpError, HttpResponse, ProviderClient, ProviderId, ProviderPolicy,
    RateLimits, RetryConfig, RunStatus, SyncConfig, SyncEngine, TrefleAdapter,
};
use floradex_tests::{MemoryCheckpointStore, MemoryContentStore, ScriptedHttpClient};

fn policy() -> ProviderPolicy {
    ProviderPolicy {
        retry: RetryConfig::no_retry(),
        rate_limits: RateLimits {
            per_minute: 10_000,
            per_day: 100_000,
        },
        ..ProviderPolicy::trefle_default()
    }
}

fn stale(id: &str, scientific_name: &str) -> StaleDraft {
    StaleDraft {
        id: id.to_owned(),
        provider: ProviderId::Trefle,
        external_id: format!("ext-{id}"),
        scientific_name: scientific_name.to_owned(),
        last_synced_at: None,
    }
}

fn engine_with(
    responses: Vec<Result<HttpResponse, HttpError>>,
    content: Arc<MemoryContentStore>,
    provider_policy: &ProviderPolicy,
) -> (SyncEngine, Arc<MemoryCheckpointStore>, Arc<ScriptedHttpClient>) {
    let http = Arc::new(ScriptedHttpClient::new(responses));
    let client = Arc::new(ProviderClient::new(
        Arc::new(TrefleAdapter::with_token("test-token")),
        http.clone(),
        provider_policy,
    ));
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let engine = SyncEngine::new(
        client,
        checkpoints.clone(),
        content,
        SyncConfig {
            enrichment_batch: 10,
            page_delay: Duration::from_millis(1),
            ..SyncConfig::default()
        },
    );
    (engine, checkpoints, http)
}

fn search_hit() -> String {
    serde_json::json!({
        "data": [{
            "id": 900,
            "scientific_name": "Allium sativum",
            "common_name": "Garlic",
            "edible": true
        }]
    })
    .to_string()
}

#[tokio::test]
async fn matches_merge_provided_fields_and_misses_become_discrepancies() {
    // Given: two stale drafts, one with an upstream match and one without
    let content = Arc::new(MemoryContentStore::new());
    content.seed_stale(stale("d-1", "Allium sativum"));
    content.seed_stale(stale("d-2", "Ghostus plantus"));

    let responses = vec![
        Ok(HttpResponse::ok_json(search_hit())),
        Ok(HttpResponse::ok_json(r#"{"data": []}"#)),
    ];
    let (engine, checkpoints, _http) = engine_with(responses, content.clone(), &policy());

    // When: the enrichment batch runs
    let report = engine.run_enrichment().await.expect("enrichment runs");

    // Then: the match is merged and stamped, the miss is recorded untouched
    assert_eq!(report.selected, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.discrepancies, 1);

    let patched = content.patched("d-1").expect("patched draft");
    let patch = patched.patch.expect("patch applied");
    assert_eq!(patch.common_name.as_deref(), Some("Garlic"));
    assert_eq!(patch.edible, Some(true));
    assert!(patch.family.is_none(), "absent upstream fields stay absent");
    assert!(patched.last_synced_at.is_some());

    assert!(content.patched("d-2").is_none(), "miss left untouched");
    assert_eq!(content.discrepancies().len(), 1);
    assert_eq!(content.discrepancies()[0].0, "d-2");

    // And: the checkpoint's update counter advanced
    let checkpoint = checkpoints.current(ProviderId::Trefle).expect("persisted");
    assert_eq!(checkpoint.items_updated, 1);
}

#[tokio::test]
async fn one_failing_record_does_not_abort_the_batch() {
    // Given: three stale drafts where the middle lookup hits a 404
    let content = Arc::new(MemoryContentStore::new());
    content.seed_stale(stale("d-1", "Allium sativum"));
    content.seed_stale(stale("d-2", "Brokenus lookupus"));
    content.seed_stale(stale("d-3", "Allium sativum"));

    let responses = vec![
        Ok(HttpResponse::ok_json(search_hit())),
        Ok(HttpResponse::with_status(404, "{}")),
        Ok(HttpResponse::ok_json(search_hit())),
    ];
    let (engine, _checkpoints, http) = engine_with(responses, content.clone(), &policy());

    // When: the enrichment batch runs
    let report = engine.run_enrichment().await.expect("enrichment runs");

    // Then: the bad record is counted and its neighbors still merged
    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.updated, 2);
    assert_eq!(report.item_errors, 1);
    assert_eq!(http.calls(), 3);
}

#[tokio::test]
async fn an_open_circuit_halts_the_batch_instead_of_hammering_upstream() {
    // Given: a breaker that opens on the first failure, and three drafts
    let content = Arc::new(MemoryContentStore::new());
    content.seed_stale(stale("d-1", "Allium sativum"));
    content.seed_stale(stale("d-2", "Allium cepa"));
    content.seed_stale(stale("d-3", "Allium porrum"));

    let tripping = ProviderPolicy {
        circuit: CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(60),
        },
        ..policy()
    };
    let responses = vec![Err(HttpError::connect("provider is down"))];
    let (engine, _checkpoints, http) = engine_with(responses, content.clone(), &tripping);

    // When: the enrichment batch runs
    let report = engine.run_enrichment().await.expect("enrichment runs");

    // Then: the first failure trips the breaker, the second is refused
    // locally, and the third is never attempted
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.item_errors, 1);
    assert!(report.error.is_some());
    assert_eq!(http.calls(), 1, "no further upstream attempts after the trip");
}
