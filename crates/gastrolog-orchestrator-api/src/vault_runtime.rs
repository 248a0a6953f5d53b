//! In-memory chunk storage backing the reference `OrchestratorApi`
//! implementation. Production deployments back this with real memory/file
//! vault backends; this type exists so the frontend (and its tests) can run
//! against `--orchestrator=memory` without any external dependency.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use gastrolog_repr::{ChunkMeta, ChunkValidation, FrontendError, Record, RecordRef};
use uuid::Uuid;

struct Chunk {
    meta: ChunkMeta,
    records: Vec<Record>,
    indexed: bool,
}

/// One vault's chunk list: zero or more sealed chunks plus at most one
/// active (unsealed) chunk that appends land in.
pub struct VaultRuntime {
    enabled: AtomicBool,
    inner: Mutex<Inner>,
    backend: String,
}

struct Inner {
    chunks: Vec<Chunk>,
    active: Option<usize>,
}

impl VaultRuntime {
    pub fn new(backend: impl Into<String>) -> VaultRuntime {
        VaultRuntime {
            enabled: AtomicBool::new(true),
            inner: Mutex::new(Inner {
                chunks: Vec::new(),
                active: None,
            }),
            backend: backend.into(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn append(&self, mut records: Vec<Record>) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let idx = match inner.active {
            Some(idx) => idx,
            None => {
                let meta = fresh_chunk_meta();
                inner.chunks.push(Chunk {
                    meta,
                    records: Vec::new(),
                    indexed: false,
                });
                let idx = inner.chunks.len() - 1;
                inner.active = Some(idx);
                idx
            }
        };
        let n = records.len() as u64;
        let chunk = &mut inner.chunks[idx];
        for r in &records {
            chunk.meta.logical_bytes += r.payload.len() as u64;
            chunk.meta.on_disk_bytes += r.payload.len() as u64;
            chunk.meta.start = chunk.meta.start.min(r.write_ts);
            chunk.meta.end = chunk.meta.end.max(r.write_ts);
        }
        chunk.meta.record_count += n;
        chunk.records.append(&mut records);
        n
    }

    /// Seals the active chunk, if any. Idempotent: sealing with no active
    /// chunk is a no-op (design §4.5 SealVault).
    pub fn seal_active(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(idx) = inner.active.take() {
            inner.chunks[idx].meta.sealed = true;
        }
    }

    pub fn list_chunks(&self) -> Vec<ChunkMeta> {
        self.inner.lock().unwrap().chunks.iter().map(|c| c.meta).collect()
    }

    pub fn get_chunk(&self, chunk_id: Uuid) -> Result<ChunkMeta, FrontendError> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .iter()
            .find(|c| c.meta.chunk_id == chunk_id)
            .map(|c| c.meta)
            .ok_or_else(|| FrontendError::NotFound(format!("chunk {chunk_id} not found")))
    }

    pub fn get_indexes(&self, chunk_id: Uuid) -> Result<Vec<String>, FrontendError> {
        let inner = self.inner.lock().unwrap();
        let chunk = inner
            .chunks
            .iter()
            .find(|c| c.meta.chunk_id == chunk_id)
            .ok_or_else(|| FrontendError::NotFound(format!("chunk {chunk_id} not found")))?;
        Ok(if chunk.indexed {
            vec!["primary".to_string()]
        } else {
            Vec::new()
        })
    }

    pub fn delete_index(&self, chunk_id: Uuid) -> Result<(), FrontendError> {
        let mut inner = self.inner.lock().unwrap();
        let chunk = inner
            .chunks
            .iter_mut()
            .find(|c| c.meta.chunk_id == chunk_id)
            .ok_or_else(|| FrontendError::NotFound(format!("chunk {chunk_id} not found")))?;
        chunk.indexed = false;
        Ok(())
    }

    pub fn build_index(&self, chunk_id: Uuid) -> Result<(), FrontendError> {
        let mut inner = self.inner.lock().unwrap();
        let chunk = inner
            .chunks
            .iter_mut()
            .find(|c| c.meta.chunk_id == chunk_id)
            .ok_or_else(|| FrontendError::NotFound(format!("chunk {chunk_id} not found")))?;
        chunk.indexed = true;
        Ok(())
    }

    pub fn validate(&self) -> Vec<ChunkValidation> {
        let inner = self.inner.lock().unwrap();
        inner
            .chunks
            .iter()
            .map(|c| {
                let mut issues = Vec::new();
                if c.meta.record_count != c.records.len() as u64 {
                    issues.push("record count mismatch".to_string());
                }
                if c.meta.sealed && !c.indexed {
                    issues.push("sealed chunk missing index".to_string());
                }
                ChunkValidation {
                    chunk_id: c.meta.chunk_id,
                    valid: issues.is_empty(),
                    issues,
                }
            })
            .collect()
    }

    pub fn export_chunk(&self, chunk_id: Uuid) -> Result<Vec<Record>, FrontendError> {
        let inner = self.inner.lock().unwrap();
        inner
            .chunks
            .iter()
            .find(|c| c.meta.chunk_id == chunk_id)
            .map(|c| c.records.clone())
            .ok_or_else(|| FrontendError::NotFound(format!("chunk {chunk_id} not found")))
    }

    pub fn total_record_count(&self) -> u64 {
        self.inner.lock().unwrap().chunks.iter().map(|c| c.meta.record_count).sum()
    }

    pub fn stats(&self) -> (u64, u64, u64, Option<chrono::DateTime<Utc>>, Option<chrono::DateTime<Utc>>) {
        let inner = self.inner.lock().unwrap();
        let mut record_count = 0;
        let mut logical_bytes = 0;
        let mut on_disk_bytes = 0;
        let mut oldest = None;
        let mut newest = None;
        for c in &inner.chunks {
            record_count += c.meta.record_count;
            logical_bytes += c.meta.logical_bytes;
            on_disk_bytes += c.meta.on_disk_bytes;
            if c.meta.record_count > 0 {
                oldest = Some(oldest.map_or(c.meta.start, |o: chrono::DateTime<Utc>| o.min(c.meta.start)));
                newest = Some(newest.map_or(c.meta.end, |n: chrono::DateTime<Utc>| n.max(c.meta.end)));
            }
        }
        (record_count, logical_bytes, on_disk_bytes, oldest, newest)
    }

    /// Flattens every record across every chunk, in chunk-then-position
    /// order, paired with its cursor -- the ordering a `QueryEngine`
    /// iterates in (design §5 "within a single stream, batches are emitted
    /// in the engine's iteration order").
    pub fn all_records_with_refs(&self) -> Vec<(RecordRef, Record)> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for chunk in &inner.chunks {
            for (pos, record) in chunk.records.iter().enumerate() {
                out.push((
                    RecordRef {
                        chunk_id: chunk.meta.chunk_id,
                        position: pos as u64,
                    },
                    record.clone(),
                ));
            }
        }
        out
    }

    pub fn take_all_sealed_chunks(&self) -> Vec<(ChunkMeta, Vec<Record>)> {
        let mut inner = self.inner.lock().unwrap();
        let sealed: Vec<usize> = inner
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.meta.sealed)
            .map(|(i, _)| i)
            .collect();
        let mut out = Vec::new();
        for &idx in sealed.iter().rev() {
            let chunk = inner.chunks.remove(idx);
            out.push((chunk.meta, chunk.records));
        }
        out.reverse();
        out
    }

    pub fn ingest_sealed_chunk(&self, meta: ChunkMeta, records: Vec<Record>) {
        let mut inner = self.inner.lock().unwrap();
        inner.chunks.push(Chunk {
            meta,
            records,
            indexed: meta.sealed,
        });
    }
}

fn fresh_chunk_meta() -> ChunkMeta {
    let now = Utc::now();
    ChunkMeta {
        chunk_id: Uuid::now_v7(),
        start: now,
        end: now,
        sealed: false,
        record_count: 0,
        logical_bytes: 0,
        on_disk_bytes: 0,
        compressed: false,
    }
}
