use crate::evaluator::EvaluationResult;
use crate::signature::ToneSignature;
use crate::store::traits::{AppendOutcome, EvaluationRecord, HistoryEntry, ProfileVector};
use crate::store::vector::{bytes_to_vec, vec_to_bytes};
use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

type HistoryRow = (i64, String, String);
type VectorRow = (String, i64, String, Vec<u8>);
type EvaluationRow = (String, Option<String>, String, String, String, String);

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid recorded_at {raw:?}"))?
        .with_timezone(&Utc))
}

fn version_from_row(raw: i64) -> anyhow::Result<u64> {
    u64::try_from(raw).with_context(|| format!("negative version {raw}"))
}

pub(super) async fn load_history(
    pool: &SqlitePool,
    brand_id: &str,
) -> anyhow::Result<Vec<HistoryEntry>> {
    let rows: Vec<HistoryRow> = sqlx::query_as(
        "SELECT version, signature, recorded_at
         FROM signature_history
         WHERE brand_id = ?1
         ORDER BY version ASC",
    )
    .bind(brand_id)
    .fetch_all(pool)
    .await
    .context("query signature history")?;

    rows.into_iter()
        .map(|(version, signature, recorded_at)| {
            let signature: ToneSignature = serde_json::from_str(&signature)
                .with_context(|| format!("decode signature v{version} of {brand_id}"))?;
            Ok(HistoryEntry {
                version: version_from_row(version)?,
                signature,
                recorded_at: parse_timestamp(&recorded_at)?,
            })
        })
        .collect()
}

/// Insert `entry` only when it directly follows the stored maximum version.
pub(super) async fn append(
    pool: &SqlitePool,
    brand_id: &str,
    entry: &HistoryEntry,
) -> anyhow::Result<AppendOutcome> {
    let signature =
        serde_json::to_string(&entry.signature).context("encode signature for storage")?;
    let version = i64::try_from(entry.version).context("version exceeds i64")?;

    let result = sqlx::query(
        "INSERT INTO signature_history (brand_id, version, signature, embedding, recorded_at)
         SELECT ?1, ?2, ?3, ?4, ?5
         WHERE ?2 = COALESCE(
             (SELECT MAX(version) FROM signature_history WHERE brand_id = ?1), 0
         ) + 1",
    )
    .bind(brand_id)
    .bind(version)
    .bind(&signature)
    .bind(vec_to_bytes(&entry.signature.embedding()))
    .bind(entry.recorded_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 1 => Ok(AppendOutcome::Appended),
        Ok(_) => Ok(AppendOutcome::Conflict),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(AppendOutcome::Conflict),
        Err(err) => Err(err).context("append signature history"),
    }
}

pub(super) async fn scan_vectors(pool: &SqlitePool) -> anyhow::Result<Vec<ProfileVector>> {
    let rows: Vec<VectorRow> = sqlx::query_as(
        "SELECT h.brand_id, h.version, h.recorded_at, h.embedding
         FROM signature_history h
         JOIN (
             SELECT brand_id, MAX(version) AS version
             FROM signature_history
             GROUP BY brand_id
         ) latest ON latest.brand_id = h.brand_id AND latest.version = h.version",
    )
    .fetch_all(pool)
    .await
    .context("scan signature embeddings")?;

    rows.into_iter()
        .map(|(brand_id, version, recorded_at, embedding)| {
            Ok(ProfileVector {
                version: version_from_row(version)?,
                recorded_at: parse_timestamp(&recorded_at)?,
                embedding: bytes_to_vec(&embedding),
                brand_id,
            })
        })
        .collect()
}

pub(super) async fn insert_evaluation(
    pool: &SqlitePool,
    record: &EvaluationRecord,
) -> anyhow::Result<()> {
    let evaluation =
        serde_json::to_string(&record.evaluation).context("encode evaluation for storage")?;
    sqlx::query(
        "INSERT INTO evaluations
             (evaluation_id, brand_id, original, rewritten, evaluation, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&record.evaluation_id)
    .bind(record.brand_id.as_deref())
    .bind(&record.original)
    .bind(&record.rewritten)
    .bind(&evaluation)
    .bind(record.recorded_at.to_rfc3339())
    .execute(pool)
    .await
    .with_context(|| format!("insert evaluation {}", record.evaluation_id))?;
    Ok(())
}

pub(super) async fn load_evaluation(
    pool: &SqlitePool,
    evaluation_id: &str,
) -> anyhow::Result<Option<EvaluationRecord>> {
    let row: Option<EvaluationRow> = sqlx::query_as(
        "SELECT evaluation_id, brand_id, original, rewritten, evaluation, recorded_at
         FROM evaluations
         WHERE evaluation_id = ?1",
    )
    .bind(evaluation_id)
    .fetch_optional(pool)
    .await
    .context("query evaluation")?;

    row.map(
        |(evaluation_id, brand_id, original, rewritten, evaluation, recorded_at)| -> anyhow::Result<EvaluationRecord> {
            let evaluation: EvaluationResult = serde_json::from_str(&evaluation)
                .with_context(|| format!("decode evaluation {evaluation_id}"))?;
            Ok(EvaluationRecord {
                recorded_at: parse_timestamp(&recorded_at)?,
                evaluation_id,
                brand_id,
                original,
                rewritten,
                evaluation,
            })
        },
    )
    .transpose()
}
