use duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_core_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS plant_drafts (
    id TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    external_id TEXT NOT NULL,
    scientific_name TEXT NOT NULL,
    common_name TEXT,
    family TEXT,
    genus TEXT,
    edible BOOLEAN,
    edible_parts TEXT,
    toxicity TEXT,
    growth_habit TEXT,
    categories TEXT,
    image_url TEXT,
    needs_review BOOLEAN NOT NULL DEFAULT FALSE,
    published BOOLEAN NOT NULL DEFAULT FALSE,
    imported_at TEXT NOT NULL,
    last_synced_at TEXT,
    UNIQUE(provider, external_id)
);

CREATE TABLE IF NOT EXISTS sync_checkpoints (
    provider TEXT PRIMARY KEY,
    current_page INTEGER NOT NULL DEFAULT 0,
    items_created BIGINT NOT NULL DEFAULT 0,
    items_updated BIGINT NOT NULL DEFAULT 0,
    items_skipped BIGINT NOT NULL DEFAULT 0,
    last_run_at TEXT,
    is_complete BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS alert_log (
    id TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    severity TEXT NOT NULL,
    event TEXT NOT NULL,
    circuit_state TEXT NOT NULL,
    health_score INTEGER NOT NULL,
    stats TEXT NOT NULL,
    channels TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sync_discrepancies (
    id TEXT PRIMARY KEY,
    provider TEXT NOT NULL,
    draft_id TEXT NOT NULL,
    query TEXT NOT NULL,
    detail TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#,
    },
    Migration {
        version: "0002_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_plant_drafts_provider_external ON plant_drafts(provider, external_id);
CREATE INDEX IF NOT EXISTS idx_plant_drafts_provider_synced ON plant_drafts(provider, last_synced_at);
CREATE INDEX IF NOT EXISTS idx_alert_log_provider_created ON alert_log(provider, created_at);
CREATE INDEX IF NOT EXISTS idx_sync_discrepancies_provider ON sync_discrepancies(provider, created_at);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
