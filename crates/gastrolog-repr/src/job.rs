//! Background job metadata (design §3, §4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a job runs exactly once or on a recurring schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobSchedule {
    Once,
    Cron(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress of a running or finished job, as reported to `WatchJobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    pub chunks_total: u64,
    pub chunks_done: u64,
    pub records_done: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_summary: Option<String>,
    pub error_details: Vec<String>,
}

impl JobProgress {
    pub fn pending() -> JobProgress {
        JobProgress {
            status: JobStatus::Pending,
            chunks_total: 0,
            chunks_done: 0,
            records_done: 0,
            started_at: None,
            completed_at: None,
            error_summary: None,
            error_details: Vec::new(),
        }
    }
}

/// A scheduled or one-shot background task tracked by the job service.
///
/// `node_id` is populated when `JobInfo` is reported by a peer node during
/// `ListJobs`/`WatchJobs` aggregation; locally-owned jobs carry the local
/// node id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub schedule: JobSchedule,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub progress: Option<JobProgress>,
    pub node_id: String,
}

impl JobInfo {
    /// Sort key used by `ListJobs`: scheduled jobs before one-time jobs, then
    /// by description (falling back to name), then by node id.
    pub fn sort_key(&self) -> (bool, String, String) {
        let is_once = matches!(self.schedule, JobSchedule::Once);
        let label = self
            .description
            .clone()
            .unwrap_or_else(|| self.name.clone());
        (is_once, label, self.node_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduled_jobs_sort_before_one_time() {
        let mut jobs = vec![
            JobInfo {
                id: "a".into(),
                name: "once-job".into(),
                description: None,
                schedule: JobSchedule::Once,
                last_run: None,
                next_run: None,
                progress: None,
                node_id: "n1".into(),
            },
            JobInfo {
                id: "b".into(),
                name: "cron-job".into(),
                description: None,
                schedule: JobSchedule::Cron("0 * * * *".into()),
                last_run: None,
                next_run: None,
                progress: None,
                node_id: "n1".into(),
            },
        ];
        jobs.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        assert_eq!(jobs[0].id, "b");
    }
}
