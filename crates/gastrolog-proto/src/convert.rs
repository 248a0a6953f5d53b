//! `gastrolog_repr` <-> wire message conversions.
//!
//! Kept in one module rather than scattered `impl From` blocks next to each
//! generated type, because conversions here need fallible paths (a malformed
//! UUID string, a resume token of the wrong length) that a blanket `From`
//! can't express; every conversion that can fail returns `FrontendError`.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use gastrolog_repr::{
    ChunkMeta, ChunkValidation, Claims, ExplainPlan, FrontendError, JobInfo, JobProgress,
    JobSchedule, JobStatus, PipelineStep, Query, RecordRef, Record, ResumeToken, RetentionRule,
    Role, VaultConfig,
};
use uuid::Uuid;

use crate::gen;

pub fn uuid_to_bytes(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

pub fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, FrontendError> {
    Uuid::from_slice(bytes).map_err(|e| FrontendError::InvalidArgument(e.to_string()))
}

pub fn uuid_from_str(s: &str) -> Result<Uuid, FrontendError> {
    Uuid::parse_str(s).map_err(|e| FrontendError::InvalidArgument(format!("invalid id: {e}")))
}

pub fn ts_to_proto(ts: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: ts.timestamp(),
        nanos: ts.timestamp_subsec_nanos() as i32,
    }
}

pub fn ts_from_proto(ts: prost_types::Timestamp) -> Result<DateTime<Utc>, FrontendError> {
    Utc.timestamp_opt(ts.seconds, ts.nanos.max(0) as u32)
        .single()
        .ok_or_else(|| FrontendError::InvalidArgument("invalid timestamp".into()))
}

pub fn opt_ts_from_proto(
    ts: Option<prost_types::Timestamp>,
) -> Result<Option<DateTime<Utc>>, FrontendError> {
    ts.map(ts_from_proto).transpose()
}

// ---- Record ----

pub fn record_to_proto(r: &Record) -> gen::Record {
    gen::Record {
        payload: r.payload.clone(),
        source_ts: r.source_ts.map(ts_to_proto),
        ingest_ts: Some(ts_to_proto(r.ingest_ts)),
        write_ts: Some(ts_to_proto(r.write_ts)),
        attributes: r.attributes.clone().into_iter().collect(),
    }
}

pub fn record_from_proto(r: gen::Record) -> Result<Record, FrontendError> {
    let ingest_ts = r
        .ingest_ts
        .ok_or_else(|| FrontendError::InvalidArgument("record missing ingest_ts".into()))?;
    let write_ts = r
        .write_ts
        .ok_or_else(|| FrontendError::InvalidArgument("record missing write_ts".into()))?;
    Ok(Record {
        payload: r.payload,
        source_ts: opt_ts_from_proto(r.source_ts)?,
        ingest_ts: ts_from_proto(ingest_ts)?,
        write_ts: ts_from_proto(write_ts)?,
        attributes: r.attributes.into_iter().collect::<BTreeMap<_, _>>(),
    })
}

// ---- ChunkMeta / ChunkValidation ----

pub fn chunk_meta_to_proto(c: &ChunkMeta) -> gen::ChunkMeta {
    gen::ChunkMeta {
        chunk_id: uuid_to_bytes(c.chunk_id),
        start: Some(ts_to_proto(c.start)),
        end: Some(ts_to_proto(c.end)),
        sealed: c.sealed,
        record_count: c.record_count,
        logical_bytes: c.logical_bytes,
        on_disk_bytes: c.on_disk_bytes,
        compressed: c.compressed,
    }
}

pub fn chunk_validation_to_proto(v: &ChunkValidation) -> gen::ChunkValidation {
    gen::ChunkValidation {
        chunk_id: uuid_to_bytes(v.chunk_id),
        valid: v.valid,
        issues: v.issues.clone(),
    }
}

// ---- VaultConfig ----

pub fn vault_to_proto(v: &VaultConfig) -> gen::VaultConfig {
    gen::VaultConfig {
        id: v.id.to_string(),
        name: v.name.clone(),
        backend: v.backend.clone(),
        params: v.params.clone().into_iter().collect(),
        enabled: v.enabled,
        node_id: v.node_id.clone(),
        filter_id: v.filter_id.map(|id| id.to_string()),
        policy_id: v.policy_id.map(|id| id.to_string()),
        retention: v
            .retention
            .iter()
            .map(|r| gen::RetentionRule {
                max_age_secs: r.max_age_secs,
                max_bytes: r.max_bytes,
            })
            .collect(),
        ingester_id: v.ingester_id.map(|id| id.to_string()),
    }
}

pub fn vault_from_proto(v: gen::VaultConfig) -> Result<VaultConfig, FrontendError> {
    let id = if v.id.is_empty() {
        Uuid::nil()
    } else {
        uuid_from_str(&v.id)?
    };
    let filter_id = v.filter_id.as_deref().map(uuid_from_str).transpose()?;
    let policy_id = v.policy_id.as_deref().map(uuid_from_str).transpose()?;
    let ingester_id = v.ingester_id.as_deref().map(uuid_from_str).transpose()?;
    Ok(VaultConfig {
        id,
        name: v.name,
        backend: v.backend,
        params: v.params.into_iter().collect::<BTreeMap<_, _>>(),
        enabled: v.enabled,
        node_id: v.node_id,
        filter_id,
        policy_id,
        retention: v
            .retention
            .into_iter()
            .map(|r| RetentionRule {
                max_age_secs: r.max_age_secs,
                max_bytes: r.max_bytes,
            })
            .collect(),
        ingester_id,
    })
}

// ---- Query / ExplainPlan ----

pub fn query_from_proto(q: Option<gen::Query>) -> Result<Query, FrontendError> {
    let Some(q) = q else {
        return Ok(Query::default());
    };
    Ok(Query {
        tokens: q.tokens,
        start: opt_ts_from_proto(q.start)?,
        end: opt_ts_from_proto(q.end)?,
        limit: q.limit,
        context_before: q.context_before,
        context_after: q.context_after,
    })
}

pub fn query_to_proto(q: &Query) -> gen::Query {
    gen::Query {
        tokens: q.tokens.clone(),
        start: q.start.map(ts_to_proto),
        end: q.end.map(ts_to_proto),
        limit: q.limit,
        context_before: q.context_before,
        context_after: q.context_after,
    }
}

pub fn explain_plan_to_proto(plan: &ExplainPlan) -> gen::ExplainPlan {
    gen::ExplainPlan {
        chunk_plans: plan
            .chunk_plans
            .iter()
            .map(|cp| gen::ChunkPlan {
                chunk_id: uuid_to_bytes(cp.chunk_id),
                steps: cp
                    .steps
                    .iter()
                    .map(|s| gen::PipelineStep {
                        name: s.name.clone(),
                        detail: s.detail.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

// ---- ResumeToken ----

pub fn resume_token_from_bytes(bytes: &[u8]) -> Result<Option<RecordRef>, FrontendError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(ResumeToken::decode(bytes)?))
}

pub fn resume_token_to_bytes(r: Option<RecordRef>) -> Vec<u8> {
    match r {
        Some(r) => ResumeToken::from_record_ref(r).as_bytes().to_vec(),
        None => Vec::new(),
    }
}

// ---- Jobs ----

pub fn job_status_to_proto(s: JobStatus) -> i32 {
    match s {
        JobStatus::Pending => gen::JobStatus::Pending as i32,
        JobStatus::Running => gen::JobStatus::Running as i32,
        JobStatus::Completed => gen::JobStatus::Completed as i32,
        JobStatus::Failed => gen::JobStatus::Failed as i32,
    }
}

pub fn job_progress_to_proto(p: &JobProgress) -> gen::JobProgress {
    gen::JobProgress {
        status: job_status_to_proto(p.status),
        chunks_total: p.chunks_total,
        chunks_done: p.chunks_done,
        records_done: p.records_done,
        started_at: p.started_at.map(ts_to_proto),
        completed_at: p.completed_at.map(ts_to_proto),
        error_summary: p.error_summary.clone(),
        error_details: p.error_details.clone(),
    }
}

pub fn job_info_to_proto(j: &JobInfo) -> gen::JobInfo {
    gen::JobInfo {
        id: j.id.clone(),
        name: j.name.clone(),
        description: j.description.clone(),
        schedule: match &j.schedule {
            JobSchedule::Once => "once".to_string(),
            JobSchedule::Cron(expr) => expr.clone(),
        },
        last_run: j.last_run.map(ts_to_proto),
        next_run: j.next_run.map(ts_to_proto),
        progress: j.progress.as_ref().map(job_progress_to_proto),
        node_id: j.node_id.clone(),
    }
}

// ---- Claims (forwarding envelope only; never sent over the wire to clients) ----

pub fn claims_to_json(c: &Claims) -> Result<Vec<u8>, FrontendError> {
    #[derive(serde::Serialize)]
    struct Wire<'a> {
        user_id: Uuid,
        username: &'a str,
        role: Role,
        issued_at: DateTime<Utc>,
    }
    serde_json::to_vec(&Wire {
        user_id: c.user_id,
        username: &c.username,
        role: c.role,
        issued_at: c.issued_at,
    })
    .map_err(FrontendError::internal)
}

pub fn claims_from_json(bytes: &[u8]) -> Result<Claims, FrontendError> {
    #[derive(serde::Deserialize)]
    struct Wire {
        user_id: Uuid,
        username: String,
        role: Role,
        issued_at: DateTime<Utc>,
    }
    let w: Wire = serde_json::from_slice(bytes).map_err(FrontendError::internal)?;
    Ok(Claims {
        user_id: w.user_id,
        username: w.username,
        role: w.role,
        issued_at: w.issued_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_through_proto() {
        let now = Utc::now();
        // prost_types::Timestamp truncates to nanosecond precision, which
        // chrono already uses, so this should be exact.
        let proto = ts_to_proto(now);
        let back = ts_from_proto(proto).unwrap();
        assert_eq!(now.timestamp(), back.timestamp());
        assert_eq!(now.timestamp_subsec_nanos(), back.timestamp_subsec_nanos());
    }

    #[test]
    fn resume_token_empty_bytes_means_no_token() {
        assert_eq!(resume_token_from_bytes(&[]).unwrap(), None);
    }

    #[test]
    fn resume_token_wrong_length_is_invalid_argument() {
        let err = resume_token_from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, FrontendError::InvalidArgument(_)));
    }
}
