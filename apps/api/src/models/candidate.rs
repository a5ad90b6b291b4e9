use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use crate::retrieval::types::CandidateRecord;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: String,
    pub normalized_text: String,
    pub embedding: Vec<f32>,
    pub structured_fields: Value,
    pub created_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateRecord {
    /// A non-object `structured_fields` column loads as no fields.
    fn from(row: CandidateRow) -> Self {
        let structured_fields = match row.structured_fields {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        CandidateRecord {
            id: row.id,
            normalized_text: row.normalized_text,
            embedding: row.embedding,
            structured_fields,
        }
    }
}
