//! # Floradex Store
//!
//! DuckDB-backed persistence for floradex: plant drafts with provenance,
//! per-provider sync checkpoints, the durable alert log, and enrichment
//! discrepancies.
//!
//! The core stays persistence-agnostic; this crate implements its
//! [`CheckpointStore`], [`ContentStore`], and [`AlertSink`] seams. All
//! user-provided values go through parameterized queries.

pub mod migrations;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use duckdb::{Connection, ToSql};
use serde::Serialize;
use thiserror::Error;

use floradex_core::alert::{Alert, AlertSink};
use floradex_core::domain::{NewDraft, PlantPatch, StaleDraft, UtcDateTime};
use floradex_core::sync::{CheckpointStore, ContentStore, StoreError, SyncCheckpoint};
use floradex_core::ProviderId;

/// Backend-level store errors (open, migrate, admin queries).
#[derive(Debug, Error)]
pub enum BackendError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for the store database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for floradex data.
    pub floradex_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let floradex_home = resolve_floradex_home();
        let db_path = floradex_home.join("floradex.duckdb");
        Self {
            floradex_home,
            db_path,
        }
    }
}

fn resolve_floradex_home() -> PathBuf {
    if let Some(path) = env::var_os("FLORADEX_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".floradex");
    }

    PathBuf::from(".floradex")
}

/// Per-provider draft counts for the admin status surface.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DraftCounts {
    pub total: u64,
    pub needs_review: u64,
    pub enriched: u64,
}

/// One row of the durable alert log.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAlert {
    pub id: String,
    pub provider: String,
    pub severity: String,
    pub event: String,
    pub circuit_state: String,
    pub health_score: i64,
    pub created_at: String,
}

/// The content database handle.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open a store with default configuration.
    pub fn open_default() -> Result<Self, BackendError> {
        Self::open(StoreConfig::default())
    }

    /// Open a store with the specified configuration.
    pub fn open(config: StoreConfig) -> Result<Self, BackendError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&config.db_path)?;
        migrations::apply_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, BackendError> {
        let connection = Connection::open_in_memory()?;
        migrations::apply_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store connection mutex poisoned")
    }

    /// Draft counts for one provider.
    pub fn draft_counts(&self, provider: ProviderId) -> Result<DraftCounts, BackendError> {
        let connection = self.lock();
        let provider = provider.as_str();
        let params: [&dyn ToSql; 1] = [&provider];
        let counts = connection.query_row(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE needs_review), \
                    COUNT(*) FILTER (WHERE last_synced_at IS NOT NULL) \
             FROM plant_drafts WHERE provider = ?",
            params.as_slice(),
            |row| {
                Ok(DraftCounts {
                    total: row.get::<_, i64>(0)? as u64,
                    needs_review: row.get::<_, i64>(1)? as u64,
                    enriched: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;

        Ok(counts)
    }

    /// Most recent durable alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<StoredAlert>, BackendError> {
        let connection = self.lock();
        let limit = limit as i64;
        let params: [&dyn ToSql; 1] = [&limit];
        let mut statement = connection.prepare(
            "SELECT id, provider, severity, event, circuit_state, health_score, created_at \
             FROM alert_log ORDER BY created_at DESC LIMIT ?",
        )?;

        let rows = statement.query_map(params.as_slice(), |row| {
            Ok(StoredAlert {
                id: row.get(0)?,
                provider: row.get(1)?,
                severity: row.get(2)?,
                event: row.get(3)?,
                circuit_state: row.get(4)?,
                health_score: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(BackendError::from)
    }

    /// Admin reset: forget import progress for one provider.
    pub fn reset_checkpoint(&self, provider: ProviderId) -> Result<(), BackendError> {
        let connection = self.lock();
        let provider = provider.as_str();
        let params: [&dyn ToSql; 1] = [&provider];
        connection.execute(
            "DELETE FROM sync_checkpoints WHERE provider = ?",
            params.as_slice(),
        )?;
        Ok(())
    }
}

fn db_err(error: duckdb::Error) -> StoreError {
    StoreError(error.to_string())
}

impl CheckpointStore for Store {
    fn get(&self, provider: ProviderId) -> Result<Option<SyncCheckpoint>, StoreError> {
        let connection = self.lock();
        let provider = provider.as_str();
        let params: [&dyn ToSql; 1] = [&provider];
        let row = connection.query_row(
            "SELECT current_page, items_created, items_updated, items_skipped, \
                    last_run_at, is_complete \
             FROM sync_checkpoints WHERE provider = ?",
            params.as_slice(),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, bool>(5)?,
                ))
            },
        );

        match row {
            Ok((current_page, created, updated, skipped, last_run_at, is_complete)) => {
                let last_run_at = match last_run_at {
                    Some(value) => Some(
                        UtcDateTime::parse(&value)
                            .map_err(|e| StoreError(format!("corrupt last_run_at: {e}")))?,
                    ),
                    None => None,
                };

                Ok(Some(SyncCheckpoint {
                    current_page: current_page as u32,
                    items_created: created as u64,
                    items_updated: updated as u64,
                    items_skipped: skipped as u64,
                    last_run_at,
                    is_complete,
                }))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(db_err(error)),
        }
    }

    fn upsert(&self, provider: ProviderId, checkpoint: &SyncCheckpoint) -> Result<(), StoreError> {
        let connection = self.lock();
        let last_run_at = checkpoint.last_run_at.map(UtcDateTime::format_rfc3339);
        let provider = provider.as_str();
        let current_page = checkpoint.current_page as i64;
        let items_created = checkpoint.items_created as i64;
        let items_updated = checkpoint.items_updated as i64;
        let items_skipped = checkpoint.items_skipped as i64;
        let params: [&dyn ToSql; 7] = [
            &provider,
            &current_page,
            &items_created,
            &items_updated,
            &items_skipped,
            &last_run_at,
            &checkpoint.is_complete,
        ];
        connection
            .execute(
                "INSERT OR REPLACE INTO sync_checkpoints \
                 (provider, current_page, items_created, items_updated, items_skipped, \
                  last_run_at, is_complete) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )
            .map_err(db_err)?;

        Ok(())
    }
}

impl ContentStore for Store {
    fn exists(&self, provider: ProviderId, external_id: &str) -> Result<bool, StoreError> {
        let connection = self.lock();
        let provider = provider.as_str();
        let params: [&dyn ToSql; 2] = [&provider, &external_id];
        let count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM plant_drafts WHERE provider = ? AND external_id = ?",
                params.as_slice(),
                |row| row.get(0),
            )
            .map_err(db_err)?;

        Ok(count > 0)
    }

    fn create_draft(&self, draft: &NewDraft) -> Result<String, StoreError> {
        let connection = self.lock();
        let id = uuid::Uuid::new_v4().to_string();
        let provider = draft.provider.as_str();
        let record = &draft.record;
        let edible_parts = serde_json::to_string(&record.edible_parts)
            .map_err(|e| StoreError(e.to_string()))?;
        let categories =
            serde_json::to_string(&record.categories).map_err(|e| StoreError(e.to_string()))?;
        let imported_at = draft.imported_at.format_rfc3339();

        let params: [&dyn ToSql; 15] = [
            &id,
            &provider,
            &record.external_id,
            &record.scientific_name,
            &record.common_name,
            &record.family,
            &record.genus,
            &record.edible,
            &edible_parts,
            &record.toxicity,
            &record.growth_habit,
            &categories,
            &record.image_url,
            &draft.needs_review,
            &imported_at,
        ];
        connection
            .execute(
                "INSERT INTO plant_drafts \
                 (id, provider, external_id, scientific_name, common_name, family, genus, \
                  edible, edible_parts, toxicity, growth_habit, categories, image_url, \
                  needs_review, imported_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )
            .map_err(db_err)?;

        Ok(id)
    }

    fn update_fields(
        &self,
        draft_id: &str,
        patch: &PlantPatch,
        synced_at: UtcDateTime,
    ) -> Result<(), StoreError> {
        let connection = self.lock();
        let edible_parts = match &patch.edible_parts {
            Some(parts) => {
                Some(serde_json::to_string(parts).map_err(|e| StoreError(e.to_string()))?)
            }
            None => None,
        };
        let synced_at = synced_at.format_rfc3339();

        // COALESCE keeps the stored value wherever the patch carries no
        // data, so empty upstream fields can never clobber curated content.
        let params: [&dyn ToSql; 9] = [
            &patch.common_name,
            &patch.family,
            &patch.genus,
            &patch.edible,
            &edible_parts,
            &patch.toxicity,
            &patch.growth_habit,
            &synced_at,
            &draft_id,
        ];
        let updated = connection
            .execute(
                "UPDATE plant_drafts SET \
                 common_name = COALESCE(?, common_name), \
                 family = COALESCE(?, family), \
                 genus = COALESCE(?, genus), \
                 edible = COALESCE(?, edible), \
                 edible_parts = COALESCE(?, edible_parts), \
                 toxicity = COALESCE(?, toxicity), \
                 growth_habit = COALESCE(?, growth_habit), \
                 last_synced_at = ? \
                 WHERE id = ?",
                params.as_slice(),
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(StoreError(format!("draft '{draft_id}' does not exist")));
        }

        Ok(())
    }

    fn select_for_enrichment(
        &self,
        provider: ProviderId,
        stale_before: UtcDateTime,
        limit: usize,
    ) -> Result<Vec<StaleDraft>, StoreError> {
        let connection = self.lock();
        let stale_before = stale_before.format_rfc3339();
        let limit = limit as i64;
        let provider_name = provider.as_str();
        let params: [&dyn ToSql; 3] = [&provider_name, &stale_before, &limit];

        let mut statement = connection
            .prepare(
                "SELECT id, external_id, scientific_name, last_synced_at \
                 FROM plant_drafts \
                 WHERE provider = ? \
                   AND (last_synced_at IS NULL OR last_synced_at < ?) \
                 ORDER BY last_synced_at ASC NULLS FIRST, imported_at ASC \
                 LIMIT ?",
            )
            .map_err(db_err)?;

        let rows = statement
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut drafts = Vec::new();
        for row in rows {
            let (id, external_id, scientific_name, last_synced_at) = row.map_err(db_err)?;
            let last_synced_at = match last_synced_at {
                Some(value) => Some(
                    UtcDateTime::parse(&value)
                        .map_err(|e| StoreError(format!("corrupt last_synced_at: {e}")))?,
                ),
                None => None,
            };
            drafts.push(StaleDraft {
                id,
                provider,
                external_id,
                scientific_name,
                last_synced_at,
            });
        }

        Ok(drafts)
    }

    fn record_discrepancy(
        &self,
        provider: ProviderId,
        draft_id: &str,
        query: &str,
        detail: &str,
    ) -> Result<(), StoreError> {
        let connection = self.lock();
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = UtcDateTime::now().format_rfc3339();
        let provider = provider.as_str();
        let params: [&dyn ToSql; 6] = [
            &id,
            &provider,
            &draft_id,
            &query,
            &detail,
            &created_at,
        ];
        connection
            .execute(
                "INSERT INTO sync_discrepancies (id, provider, draft_id, query, detail, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )
            .map_err(db_err)?;

        Ok(())
    }
}

impl AlertSink for Store {
    fn append(&self, alert: &Alert) -> Result<(), StoreError> {
        let connection = self.lock();
        let stats = serde_json::to_string(&alert.stats).map_err(|e| StoreError(e.to_string()))?;
        let channels = serde_json::to_string(&alert.channels_notified)
            .map_err(|e| StoreError(e.to_string()))?;
        let created_at = alert.timestamp.format_rfc3339();
        let provider = alert.provider.as_str();
        let severity = alert.severity.as_str();
        let event = alert.event.as_str();
        let circuit_state = alert.circuit_state.as_str();
        let health_score = i64::from(alert.health_score);

        let params: [&dyn ToSql; 9] = [
            &alert.id,
            &provider,
            &severity,
            &event,
            &circuit_state,
            &health_score,
            &stats,
            &channels,
            &created_at,
        ];
        connection
            .execute(
                "INSERT INTO alert_log \
                 (id, provider, severity, event, circuit_state, health_score, stats, channels, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params.as_slice(),
            )
            .map_err(db_err)?;

        Ok(())
    }
}
