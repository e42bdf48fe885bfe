use anyhow::Context;
use sqlx::SqlitePool;

/// Create the history and evaluation tables. `(brand_id, version)` is the
/// history primary key, so two writers can never both store the same version.
pub(super) async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS signature_history (
            brand_id    TEXT    NOT NULL,
            version     INTEGER NOT NULL,
            signature   TEXT    NOT NULL,
            embedding   BLOB    NOT NULL,
            recorded_at TEXT    NOT NULL,
            PRIMARY KEY (brand_id, version)
        );
        CREATE INDEX IF NOT EXISTS idx_signature_history_recorded
            ON signature_history(recorded_at);
        CREATE TABLE IF NOT EXISTS evaluations (
            evaluation_id TEXT PRIMARY KEY,
            brand_id      TEXT,
            original      TEXT NOT NULL,
            rewritten     TEXT NOT NULL,
            evaluation    TEXT NOT NULL,
            recorded_at   TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_evaluations_brand
            ON evaluations(brand_id);",
    )
    .execute(pool)
    .await
    .context("create store schema")?;
    Ok(())
}
