//! A single ingested record (design §3: "Record").

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque byte payload plus the timestamps and attributes the frontend
/// and query engine reason about.
///
/// `source_ts` is optional because not every ingester can recover the
/// upstream event time; `ingest_ts` and `write_ts` are always present:
/// `ingest_ts` is stamped when the record enters the vault, `write_ts` when it
/// is durably appended to a chunk (monotonic within a chunk, used to order
/// records during migrate/merge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub payload: Vec<u8>,
    pub source_ts: Option<DateTime<Utc>>,
    pub ingest_ts: DateTime<Utc>,
    pub write_ts: DateTime<Utc>,
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(payload: Vec<u8>, ingest_ts: DateTime<Utc>, write_ts: DateTime<Utc>) -> Record {
        Record {
            payload,
            source_ts: None,
            ingest_ts,
            write_ts,
            attributes: BTreeMap::new(),
        }
    }
}
