//! Candidate store — the published corpus and its two indexes.
//!
//! # Snapshot model
//! The corpus is an immutable `CorpusSnapshot` behind `RwLock<Arc<_>>`. Readers
//! clone the `Arc` once at call start and keep querying that snapshot even if a
//! rebuild publishes a newer one mid-query. Writers stage a complete snapshot
//! off the executor (`spawn_blocking`), then publish with a single pointer swap.
//! A half-built corpus is never visible.
//!
//! Writers are serialized by an async write gate so two concurrent `add` calls
//! cannot both stage from the same base snapshot and lose a record.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::retrieval::error::CorpusError;
use crate::retrieval::lexical::{Bm25Params, LexicalIndex};
use crate::retrieval::types::CandidateRecord;
use crate::retrieval::vector::{validate_dimension, ExactVectorIndex, VectorBackend, VectorIndex};

/// How each snapshot's indexes are built.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndexSettings {
    pub bm25: Bm25Params,
    pub vector_backend: VectorBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub candidate_count: usize,
    pub dimension: Option<usize>,
    pub generation: u64,
    pub indexed_at: DateTime<Utc>,
}

/// One published corpus: records plus both indexes, built from the same records.
#[derive(Debug)]
pub struct CorpusSnapshot {
    generation: u64,
    indexed_at: DateTime<Utc>,
    /// `None` only for the empty corpus.
    dimension: Option<usize>,
    records: Vec<Arc<CandidateRecord>>,
    positions: HashMap<String, usize>,
    lexical: LexicalIndex,
    vector: Arc<dyn VectorIndex>,
}

impl CorpusSnapshot {
    fn empty(settings: IndexSettings) -> Self {
        Self {
            generation: 0,
            indexed_at: Utc::now(),
            dimension: None,
            records: Vec::new(),
            positions: HashMap::new(),
            lexical: LexicalIndex::build(&Vec::<CandidateRecord>::new(), settings.bm25),
            vector: Arc::new(ExactVectorIndex::default()),
        }
    }

    /// Validates the batch and builds both indexes. CPU-bound; call from a
    /// blocking context.
    fn build(
        records: Vec<Arc<CandidateRecord>>,
        settings: IndexSettings,
        generation: u64,
    ) -> Result<Self, CorpusError> {
        let dimension = records.first().map(|r| r.dimension());
        let mut positions = HashMap::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            record.validate()?;
            if let Some(expected) = dimension {
                validate_dimension(expected, record.dimension())?;
            }
            if positions.insert(record.id.clone(), position).is_some() {
                return Err(CorpusError::DuplicateId(record.id.clone()));
            }
        }

        let lexical = LexicalIndex::build(&records, settings.bm25);
        let vector = settings
            .vector_backend
            .build(&records, dimension.unwrap_or(0))?;

        Ok(Self {
            generation,
            indexed_at: Utc::now(),
            dimension,
            records,
            positions,
            lexical,
            vector,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vector(&self) -> &dyn VectorIndex {
        self.vector.as_ref()
    }

    pub fn records(&self) -> &[Arc<CandidateRecord>] {
        &self.records
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<CandidateRecord>, CorpusError> {
        self.positions
            .get(id)
            .map(|&position| Arc::clone(&self.records[position]))
            .ok_or_else(|| CorpusError::NotFound(id.to_string()))
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            candidate_count: self.records.len(),
            dimension: self.dimension,
            generation: self.generation,
            indexed_at: self.indexed_at,
        }
    }
}

pub struct CandidateStore {
    settings: IndexSettings,
    current: RwLock<Arc<CorpusSnapshot>>,
    write_gate: Mutex<()>,
}

impl CandidateStore {
    pub fn new(settings: IndexSettings) -> Self {
        Self {
            settings,
            current: RwLock::new(Arc::new(CorpusSnapshot::empty(settings))),
            write_gate: Mutex::new(()),
        }
    }

    /// The currently published corpus. Hold on to it for the whole query.
    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn get(&self, id: &str) -> Result<Arc<CandidateRecord>, CorpusError> {
        self.snapshot().get(id)
    }

    pub fn stats(&self) -> CorpusStats {
        self.snapshot().stats()
    }

    /// Acquires the write gate. Stage, do any side work (e.g. persistence),
    /// then publish; dropping the writer without publishing discards the stage.
    pub async fn writer(&self) -> CorpusWriter<'_> {
        CorpusWriter {
            store: self,
            _gate: self.write_gate.lock().await,
        }
    }

    /// Atomically replaces the whole corpus.
    pub async fn rebuild(&self, records: Vec<CandidateRecord>) -> Result<CorpusStats, CorpusError> {
        let writer = self.writer().await;
        let staged = writer.stage_rebuild(records).await?;
        Ok(writer.publish(staged))
    }

    /// Adds one candidate, publishing a new snapshot that includes it.
    pub async fn add(&self, record: CandidateRecord) -> Result<CorpusStats, CorpusError> {
        let writer = self.writer().await;
        let staged = writer.stage_add(record).await?;
        Ok(writer.publish(staged))
    }

    fn swap(&self, snapshot: CorpusSnapshot) -> CorpusStats {
        let stats = snapshot.stats();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        info!(
            "Published corpus generation {} ({} candidates, dimension {:?})",
            stats.generation, stats.candidate_count, stats.dimension
        );
        stats
    }
}

/// Exclusive write access to a `CandidateStore`.
pub struct CorpusWriter<'a> {
    store: &'a CandidateStore,
    _gate: MutexGuard<'a, ()>,
}

impl CorpusWriter<'_> {
    pub fn current(&self) -> Arc<CorpusSnapshot> {
        self.store.snapshot()
    }

    /// Builds a replacement corpus without publishing it.
    pub async fn stage_rebuild(
        &self,
        records: Vec<CandidateRecord>,
    ) -> Result<CorpusSnapshot, CorpusError> {
        let records: Vec<Arc<CandidateRecord>> = records.into_iter().map(Arc::new).collect();
        self.stage(records).await
    }

    /// Builds the current corpus plus `record` without publishing it.
    pub async fn stage_add(&self, record: CandidateRecord) -> Result<CorpusSnapshot, CorpusError> {
        let current = self.current();
        if current.contains(&record.id) {
            return Err(CorpusError::DuplicateId(record.id));
        }
        if let Some(expected) = current.dimension() {
            validate_dimension(expected, record.dimension())?;
        }
        record.validate()?;

        let mut records = current.records().to_vec();
        records.push(Arc::new(record));
        self.stage(records).await
    }

    pub fn publish(self, staged: CorpusSnapshot) -> CorpusStats {
        self.store.swap(staged)
    }

    async fn stage(&self, records: Vec<Arc<CandidateRecord>>) -> Result<CorpusSnapshot, CorpusError> {
        let settings = self.store.settings;
        let generation = self.current().generation() + 1;
        tokio::task::spawn_blocking(move || CorpusSnapshot::build(records, settings, generation))
            .await?
    }
}
