//! Progressive sync engine: paginated, checkpointed import and stale-first
//! enrichment against one provider.
//!
//! The engine persists its checkpoint after every fully processed page, so a
//! crash mid-run loses at most the in-flight page and can never silently
//! skip one. Runs are single-flight per provider.

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::FetchErrorKind;
use crate::client::ProviderClient;
use crate::domain::{NewDraft, PlantPatch, PlantRecord, StaleDraft, UtcDateTime};
use crate::heuristic::{CandidateRules, CandidateVerdict};
use crate::ProviderId;

/// Error reported by checkpoint/content store backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Durable import progress, one row per provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCheckpoint {
    /// Last fully committed page; the next run resumes at `current_page + 1`.
    pub current_page: u32,
    pub items_created: u64,
    pub items_updated: u64,
    pub items_skipped: u64,
    pub last_run_at: Option<UtcDateTime>,
    /// One-way latch set when the provider reports end-of-data.
    pub is_complete: bool,
}

/// Narrow persistence seam for import progress.
pub trait CheckpointStore: Send + Sync {
    fn get(&self, provider: ProviderId) -> Result<Option<SyncCheckpoint>, StoreError>;
    fn upsert(&self, provider: ProviderId, checkpoint: &SyncCheckpoint) -> Result<(), StoreError>;
}

/// Narrow persistence seam for drafts. The backing content database is
/// opaque to the engine.
pub trait ContentStore: Send + Sync {
    fn exists(&self, provider: ProviderId, external_id: &str) -> Result<bool, StoreError>;

    /// Create an unpublished draft; returns its id.
    fn create_draft(&self, draft: &NewDraft) -> Result<String, StoreError>;

    /// Merge only the `Some` fields of the patch and stamp `last_synced_at`.
    fn update_fields(
        &self,
        draft_id: &str,
        patch: &PlantPatch,
        synced_at: UtcDateTime,
    ) -> Result<(), StoreError>;

    /// Never-synced first, then stalest, bounded by `limit`.
    fn select_for_enrichment(
        &self,
        provider: ProviderId,
        stale_before: UtcDateTime,
        limit: usize,
    ) -> Result<Vec<StaleDraft>, StoreError>;

    /// Record an enrichment miss for manual review.
    fn record_discrepancy(
        &self,
        provider: ProviderId,
        draft_id: &str,
        query: &str,
        detail: &str,
    ) -> Result<(), StoreError>;
}

/// Pacing knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub pages_per_run: u32,
    pub page_size: u32,
    /// Politeness delay between pages.
    pub page_delay: Duration,
    pub enrichment_batch: usize,
    /// Drafts last synced earlier than this are considered stale.
    pub staleness: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pages_per_run: 5,
            page_size: 20,
            page_delay: Duration::from_millis(500),
            enrichment_batch: 25,
            staleness: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// Why an import run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The page budget was consumed; more data may remain upstream.
    BudgetExhausted,
    /// The provider reported end-of-data; the checkpoint is complete.
    Complete,
    /// The checkpoint was already complete; nothing was fetched.
    AlreadyComplete,
    /// Another run for this provider was in flight; nothing was touched.
    AlreadyRunning,
    /// A page failed after retries; pagination stopped for this run.
    Failed,
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::Complete => "complete",
            Self::AlreadyComplete => "already_complete",
            Self::AlreadyRunning => "already_running",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub provider: ProviderId,
    pub status: RunStatus,
    pub pages_processed: u32,
    pub created: u64,
    pub skipped: u64,
    pub already_present: u64,
    pub item_errors: u64,
    pub error: Option<String>,
}

impl ImportReport {
    fn new(provider: ProviderId, status: RunStatus) -> Self {
        Self {
            provider,
            status,
            pages_processed: 0,
            created: 0,
            skipped: 0,
            already_present: 0,
            item_errors: 0,
            error: None,
        }
    }
}

/// Outcome of one enrichment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub provider: ProviderId,
    pub status: RunStatus,
    pub selected: usize,
    pub updated: u64,
    pub discrepancies: u64,
    pub item_errors: u64,
    pub error: Option<String>,
}

/// Engine errors that abort a run before or between page commits.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials are absent: aborts immediately, consumes no quota,
    /// advances no checkpoint.
    #[error("provider {0} is not configured")]
    NotConfigured(ProviderId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Progressive sync engine for one provider.
pub struct SyncEngine {
    client: Arc<ProviderClient>,
    checkpoints: Arc<dyn CheckpointStore>,
    content: Arc<dyn ContentStore>,
    rules: CandidateRules,
    config: SyncConfig,
    in_flight: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        client: Arc<ProviderClient>,
        checkpoints: Arc<dyn CheckpointStore>,
        content: Arc<dyn ContentStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            client,
            checkpoints,
            content,
            rules: CandidateRules::default(),
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_rules(mut self, rules: CandidateRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn provider(&self) -> ProviderId {
        self.client.provider()
    }

    /// Run one bounded import batch: up to `pages_per_run` pages, committing
    /// the checkpoint after each page.
    pub async fn run_import(&self) -> Result<ImportReport, SyncError> {
        let provider = self.provider();

        if !self.client.is_configured() {
            return Err(SyncError::NotConfigured(provider));
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(provider = %provider, "import skipped: run already in flight");
            return Ok(ImportReport::new(provider, RunStatus::AlreadyRunning));
        };

        let mut checkpoint = self.checkpoints.get(provider)?.unwrap_or_default();
        if checkpoint.is_complete {
            return Ok(ImportReport::new(provider, RunStatus::AlreadyComplete));
        }

        let mut report = ImportReport::new(provider, RunStatus::BudgetExhausted);

        for page_index in 0..self.config.pages_per_run {
            let page_number = checkpoint.current_page + 1;

            let page = match self
                .client
                .fetch_page(page_number, self.config.page_size)
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    warn!(
                        provider = %provider,
                        page = page_number,
                        error = %error,
                        "import stopped on failed page"
                    );
                    report.status = RunStatus::Failed;
                    report.error = Some(error.to_string());
                    break;
                }
            };

            if page.is_empty() {
                checkpoint.is_complete = true;
                checkpoint.last_run_at = Some(UtcDateTime::now());
                self.checkpoints.upsert(provider, &checkpoint)?;
                info!(provider = %provider, page = page_number, "import reached end of upstream data");
                report.status = RunStatus::Complete;
                break;
            }

            let outcome = self.import_page_items(&page.records);
            checkpoint.current_page = page_number;
            checkpoint.items_created += outcome.created;
            checkpoint.items_skipped += outcome.skipped;
            checkpoint.last_run_at = Some(UtcDateTime::now());
            self.checkpoints.upsert(provider, &checkpoint)?;

            report.pages_processed += 1;
            report.created += outcome.created;
            report.skipped += outcome.skipped;
            report.already_present += outcome.already_present;
            report.item_errors += outcome.item_errors;

            debug!(
                provider = %provider,
                page = page_number,
                created = outcome.created,
                skipped = outcome.skipped,
                "page committed"
            );

            if page_index + 1 < self.config.pages_per_run {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        Ok(report)
    }

    /// Process one page's items. Per-item errors are logged and counted but
    /// never abort the page.
    fn import_page_items(&self, records: &[PlantRecord]) -> PageOutcome {
        let provider = self.provider();
        let mut outcome = PageOutcome::default();

        for record in records {
            let needs_review = match self.rules.evaluate(record) {
                CandidateVerdict::Reject { reason } => {
                    debug!(
                        provider = %provider,
                        external_id = %record.external_id,
                        reason = %reason,
                        "candidate rejected"
                    );
                    outcome.skipped += 1;
                    continue;
                }
                CandidateVerdict::Accept { .. } => false,
                CandidateVerdict::Review => true,
            };

            match self.content.exists(provider, &record.external_id) {
                Ok(true) => {
                    outcome.already_present += 1;
                }
                Ok(false) => {
                    let draft = NewDraft {
                        provider,
                        record: record.clone(),
                        needs_review,
                        imported_at: UtcDateTime::now(),
                    };
                    match self.content.create_draft(&draft) {
                        Ok(_) => outcome.created += 1,
                        Err(error) => {
                            warn!(
                                provider = %provider,
                                external_id = %record.external_id,
                                error = %error,
                                "draft creation failed; continuing batch"
                            );
                            outcome.item_errors += 1;
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        provider = %provider,
                        external_id = %record.external_id,
                        error = %error,
                        "existence check failed; continuing batch"
                    );
                    outcome.item_errors += 1;
                }
            }
        }

        outcome
    }

    /// Run one enrichment batch over stale or never-synced drafts.
    pub async fn run_enrichment(&self) -> Result<EnrichmentReport, SyncError> {
        let provider = self.provider();

        if !self.client.is_configured() {
            return Err(SyncError::NotConfigured(provider));
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(provider = %provider, "enrichment skipped: run already in flight");
            return Ok(EnrichmentReport {
                provider,
                status: RunStatus::AlreadyRunning,
                selected: 0,
                updated: 0,
                discrepancies: 0,
                item_errors: 0,
                error: None,
            });
        };

        let stale_before = UtcDateTime::now().saturating_sub(self.config.staleness);
        let batch =
            self.content
                .select_for_enrichment(provider, stale_before, self.config.enrichment_batch)?;

        let mut report = EnrichmentReport {
            provider,
            status: RunStatus::Complete,
            selected: batch.len(),
            updated: 0,
            discrepancies: 0,
            item_errors: 0,
            error: None,
        };

        for draft in &batch {
            match self.client.enrich(&draft.scientific_name).await {
                Ok(Some(patch)) => {
                    let synced_at = UtcDateTime::now();
                    match self.content.update_fields(&draft.id, &patch, synced_at) {
                        Ok(()) => report.updated += 1,
                        Err(error) => {
                            warn!(
                                provider = %provider,
                                draft_id = %draft.id,
                                error = %error,
                                "enrichment merge failed; continuing batch"
                            );
                            report.item_errors += 1;
                        }
                    }
                }
                Ok(None) => {
                    report.discrepancies += 1;
                    if let Err(error) = self.content.record_discrepancy(
                        provider,
                        &draft.id,
                        &draft.scientific_name,
                        "no upstream match for enrichment lookup",
                    ) {
                        warn!(
                            provider = %provider,
                            draft_id = %draft.id,
                            error = %error,
                            "failed to record discrepancy"
                        );
                    }
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        FetchErrorKind::CircuitOpen | FetchErrorKind::RateLimited
                    ) =>
                {
                    // Self-protection kicked in; there is no point hammering
                    // the remaining records this run.
                    warn!(provider = %provider, error = %error, "enrichment halted early");
                    report.status = RunStatus::Failed;
                    report.error = Some(error.to_string());
                    break;
                }
                Err(error) => {
                    warn!(
                        provider = %provider,
                        draft_id = %draft.id,
                        error = %error,
                        "enrichment lookup failed; continuing batch"
                    );
                    report.item_errors += 1;
                }
            }
        }

        if report.updated > 0 {
            let mut checkpoint = self.checkpoints.get(provider)?.unwrap_or_default();
            checkpoint.items_updated += report.updated;
            checkpoint.last_run_at = Some(UtcDateTime::now());
            self.checkpoints.upsert(provider, &checkpoint)?;
        }

        Ok(report)
    }
}

#[derive(Debug, Default)]
struct PageOutcome {
    created: u64,
    skipped: u64,
    already_present: u64,
    item_errors: u64,
}

/// Single-flight guard: released on drop.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_guard_is_exclusive_until_dropped() {
        let flag = AtomicBool::new(false);

        let guard = InFlightGuard::acquire(&flag).expect("first acquire succeeds");
        assert!(InFlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn checkpoint_default_starts_at_page_zero_incomplete() {
        let checkpoint = SyncCheckpoint::default();
        assert_eq!(checkpoint.current_page, 0);
        assert!(!checkpoint.is_complete);
        assert!(checkpoint.last_run_at.is_none());
    }
}
