use crate::eid::Eid;
use crate::storage::{self, StorageManager};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Exactly one owner is set per job: an authenticated user id, or the
/// fingerprint captured for an unauthenticated submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    User(String),
    Fingerprint(String),
}

impl Owner {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Owner::User(id) => Some(id),
            Owner::Fingerprint(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Eid,
    pub source_url: String,
    pub is_playlist: bool,
    pub owner: Owner,

    pub status: JobStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(source_url: String, is_playlist: bool, owner: Owner) -> Self {
        let now = Utc::now();
        Self {
            id: Eid::new(),
            source_url,
            is_playlist,
            owner,
            status: JobStatus::Pending,
            transcript: None,
            summary: None,
            resolved_video_id: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. None fields are left untouched; `clear_error` is an
/// explicit flag because `error_detail: None` means "don't change it".
#[derive(Clone, Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub resolved_video_id: Option<String>,
    pub error_detail: Option<String>,
    pub clear_error: bool,
}

pub trait JobStore: Send + Sync {
    fn create(&self, job: Job) -> anyhow::Result<Job>;
    fn get(&self, id: &Eid) -> anyhow::Result<Option<Job>>;
    fn update(&self, id: &Eid, update: JobUpdate) -> anyhow::Result<Job>;
    fn list_by_owner(&self, owner: &Owner) -> anyhow::Result<Vec<Job>>;
}

const JOBS_FILE: &str = "jobs.json";

/// Local JSON-backed job store. The whole table is held in memory and
/// rewritten atomically on every mutation.
#[derive(Clone)]
pub struct BackendJson {
    list: Arc<RwLock<Vec<Job>>>,
    store: storage::BackendLocal,
}

impl BackendJson {
    pub fn load(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        let list = if store.exists(JOBS_FILE) {
            serde_json::from_slice(&store.read(JOBS_FILE)?)?
        } else {
            log::info!("creating new job database at {base_path}/{JOBS_FILE}");
            Vec::new()
        };

        Ok(Self {
            list: Arc::new(RwLock::new(list)),
            store,
        })
    }

    fn persist(&self, list: &[Job]) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(list)?;
        self.store.write(JOBS_FILE, &data)?;
        Ok(())
    }
}

impl JobStore for BackendJson {
    fn create(&self, job: Job) -> anyhow::Result<Job> {
        let mut list = self.list.write().unwrap();
        list.push(job.clone());
        self.persist(&list)?;
        Ok(job)
    }

    fn get(&self, id: &Eid) -> anyhow::Result<Option<Job>> {
        let list = self.list.read().unwrap();
        Ok(list.iter().find(|job| &job.id == id).cloned())
    }

    fn update(&self, id: &Eid, update: JobUpdate) -> anyhow::Result<Job> {
        let mut list = self.list.write().unwrap();
        let job = list
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| anyhow!("job {id} not found"))?;

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(transcript) = update.transcript {
            job.transcript = Some(transcript);
        }
        if let Some(summary) = update.summary {
            job.summary = Some(summary);
        }
        if let Some(video_id) = update.resolved_video_id {
            job.resolved_video_id = Some(video_id);
        }
        if update.clear_error {
            job.error_detail = None;
        } else if let Some(detail) = update.error_detail {
            job.error_detail = Some(detail);
        }

        job.updated_at = Utc::now();

        let job = job.clone();
        self.persist(&list)?;
        Ok(job)
    }

    fn list_by_owner(&self, owner: &Owner) -> anyhow::Result<Vec<Job>> {
        let list = self.list.read().unwrap();
        Ok(list
            .iter()
            .filter(|job| &job.owner == owner)
            .cloned()
            .collect())
    }
}
