use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use crate::models::candidate::CandidateRow;
use crate::retrieval::types::CandidateRecord;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the candidates table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            id                TEXT PRIMARY KEY,
            normalized_text   TEXT NOT NULL,
            embedding         REAL[] NOT NULL,
            structured_fields JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// All persisted candidates, ordered by id.
pub async fn load_candidates(pool: &PgPool) -> Result<Vec<CandidateRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CandidateRow>(
        "SELECT * FROM candidates ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CandidateRecord::from).collect())
}

/// Replaces the persisted corpus in one transaction.
pub async fn replace_candidates(
    pool: &PgPool,
    records: &[Arc<CandidateRecord>],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM candidates").execute(&mut *tx).await?;
    for record in records {
        insert(&mut tx, record).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn insert_candidate(pool: &PgPool, record: &CandidateRecord) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    insert(&mut tx, record).await?;
    tx.commit().await?;
    Ok(())
}

async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    record: &CandidateRecord,
) -> Result<(), sqlx::Error> {
    let fields = Value::Object(
        record
            .structured_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    sqlx::query(
        r#"
        INSERT INTO candidates (id, normalized_text, embedding, structured_fields)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&record.id)
    .bind(&record.normalized_text)
    .bind(&record.embedding)
    .bind(fields)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
