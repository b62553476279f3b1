use crate::{
    chat::{self, ChatMessage},
    classify,
    config::Config,
    credits::{self, CreditLedger, FingerprintGate},
    eid::Eid,
    errors::PipelineError,
    jobs::{self, Job, JobStatus, JobStore, JobUpdate, Owner},
    pipeline::{Pipeline, ProcessOutcome},
    providers::{
        captions::HttpCaptionProvider, genai::HttpGenAiProvider,
        metadata::HttpVideoMetadataProvider, playlist::HttpPlaylistProvider, CaptionProvider,
        GenAiProvider, PlaylistProvider, VideoMetadataProvider,
    },
    storage::{self, StorageManager},
    summarize::Summarizer,
    task_runner::{self, QueueDump, Task},
    trigger,
};
use std::sync::{mpsc, Arc, RwLock};

#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub url: String,
    pub owner: Owner,
}

pub struct App {
    pub jobs: Arc<dyn JobStore>,
    pub credits: Arc<dyn CreditLedger>,
    fingerprints: FingerprintGate,
    genai: Arc<dyn GenAiProvider>,
    pipeline: Arc<Pipeline>,
    storage_mgr: Arc<dyn StorageManager>,

    task_tx: Option<Arc<mpsc::Sender<Task>>>,
    task_queue_handle: Option<std::thread::JoinHandle<()>>,

    config: Arc<RwLock<Config>>,
}

fn env_api_key(name: &str) -> String {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            log::warn!("{name} is missing; calls to this provider will fail");
            String::new()
        }
    }
}

impl App {
    /// Wires the local JSON stores and the HTTP provider clients. API keys
    /// come from the environment, endpoints and knobs from config.yaml.
    pub fn new(base_path: &str, config: Arc<RwLock<Config>>) -> anyhow::Result<App> {
        let providers = config.read().unwrap().providers.clone();
        let timeout = providers.timeout_secs;

        let captions: Arc<dyn CaptionProvider> = Arc::new(HttpCaptionProvider::new(
            providers.captions_url,
            env_api_key("CAPTIONS_API_KEY"),
            timeout,
        ));
        let metadata: Arc<dyn VideoMetadataProvider> = Arc::new(HttpVideoMetadataProvider::new(
            providers.videos_url,
            env_api_key("YOUTUBE_API_KEY"),
            timeout,
        ));
        let playlists: Arc<dyn PlaylistProvider> = Arc::new(HttpPlaylistProvider::new(
            providers.playlist_url,
            env_api_key("CAPTIONS_API_KEY"),
            timeout,
        ));
        let genai: Arc<dyn GenAiProvider> = Arc::new(HttpGenAiProvider::new(
            providers.genai_url,
            providers.genai_model,
            env_api_key("GENAI_API_KEY"),
            timeout,
        ));

        let jobs: Arc<dyn JobStore> = Arc::new(jobs::BackendJson::load(base_path)?);
        let credit_ledger: Arc<dyn CreditLedger> = Arc::new(credits::BackendJson::load(base_path)?);
        let fingerprints = FingerprintGate::load(base_path)?;
        let storage_mgr: Arc<dyn StorageManager> = Arc::new(storage::BackendLocal::new(base_path)?);

        Ok(Self::new_with(
            jobs,
            credit_ledger,
            fingerprints,
            captions,
            metadata,
            playlists,
            genai,
            storage_mgr,
            config,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_with(
        jobs: Arc<dyn JobStore>,
        credits: Arc<dyn CreditLedger>,
        fingerprints: FingerprintGate,
        captions: Arc<dyn CaptionProvider>,
        metadata: Arc<dyn VideoMetadataProvider>,
        playlists: Arc<dyn PlaylistProvider>,
        genai: Arc<dyn GenAiProvider>,
        storage_mgr: Arc<dyn StorageManager>,
        config: Arc<RwLock<Config>>,
    ) -> App {
        let budget = config.read().unwrap().pipeline.summary_transcript_budget;
        let summarizer = Summarizer::new(genai.clone(), budget);

        let pipeline = Arc::new(Pipeline::new(
            jobs.clone(),
            credits.clone(),
            captions,
            metadata,
            playlists,
            summarizer,
            config.clone(),
        ));

        App {
            jobs,
            credits,
            fingerprints,
            genai,
            pipeline,
            storage_mgr,
            task_tx: None,
            task_queue_handle: None,
            config,
        }
    }

    /// Client submission: validate, gate, create the pending record, then
    /// kick off processing (outbound webhook when configured, local queue
    /// otherwise).
    pub fn submit(&self, request: SubmitRequest) -> Result<Job, PipelineError> {
        let url = request.url.trim().to_string();

        if !classify::validate_youtube_url(&url) {
            return Err(PipelineError::InvalidUrl(url));
        }

        let classification = classify::classify(&url);
        let is_playlist = classification.kind == classify::ContentKind::Playlist;

        match &request.owner {
            // single-video jobs are billed up front; playlists bill per
            // video inside the pipeline loop
            Owner::User(user_id) => {
                if !is_playlist && !self.credits.deduct(user_id, 1)? {
                    return Err(PipelineError::InsufficientCredits);
                }
            }
            Owner::Fingerprint(fingerprint) => {
                let limit = self.config.read().unwrap().anon_submission_limit;
                if !self.fingerprints.check_and_increment(fingerprint, limit)? {
                    return Err(PipelineError::SubmissionLimit);
                }
            }
        }

        let job = self
            .jobs
            .create(Job::new(url.clone(), is_playlist, request.owner))?;

        let webhook = self.config.read().unwrap().trigger_webhook_url.clone();
        match webhook {
            Some(webhook_url) => {
                let job_id = job.id.clone();
                std::thread::spawn(move || trigger::notify(&webhook_url, &job_id, &url));
            }
            None => self.enqueue(Task::ProcessJob {
                job_id: job.id.clone(),
                url,
            }),
        }

        Ok(job)
    }

    pub fn process(&self, job_id: &Eid, url: &str) -> Result<ProcessOutcome, PipelineError> {
        self.pipeline.process(job_id, url)
    }

    /// Manual retry. Clears error state, resets to pending, re-enters the
    /// pipeline from scratch (full restart, not checkpoint-resume).
    pub fn resume(&self, job_id: &Eid) -> Result<Job, PipelineError> {
        let job = self
            .jobs
            .get(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;

        if !matches!(job.status, JobStatus::Failed | JobStatus::Pending) {
            return Err(PipelineError::NotResumable(
                job_id.to_string(),
                job.status.as_str().to_string(),
            ));
        }

        // a failed single-video job had its credit refunded; restarting it
        // takes the credit again. Pending jobs still hold theirs.
        if job.status == JobStatus::Failed && !job.is_playlist {
            if let Owner::User(user_id) = &job.owner {
                if !self.credits.deduct(user_id, 1)? {
                    return Err(PipelineError::InsufficientCredits);
                }
            }
        }

        let job = self.jobs.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Pending),
                clear_error: true,
                ..Default::default()
            },
        )?;

        self.enqueue(Task::ProcessJob {
            job_id: job.id.clone(),
            url: job.source_url.clone(),
        });

        Ok(job)
    }

    pub fn chat(&self, job_id: &Eid, messages: &[ChatMessage]) -> Result<String, PipelineError> {
        let job = self
            .jobs
            .get(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;

        let transcript = job.transcript.as_deref().unwrap_or_default();
        chat::answer(self.genai.as_ref(), transcript, messages)
    }

    pub fn get(&self, job_id: &Eid) -> Result<Option<Job>, PipelineError> {
        Ok(self.jobs.get(job_id)?)
    }

    pub fn list(&self, owner: &Owner) -> Result<Vec<Job>, PipelineError> {
        Ok(self.jobs.list_by_owner(owner)?)
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    pub fn queue_dump(&self) -> QueueDump {
        task_runner::read_queue_dump(self.storage_mgr.clone())
    }

    fn enqueue(&self, task: Task) {
        match &self.task_tx {
            Some(task_tx) => {
                if let Err(err) = task_tx.send(task) {
                    log::error!("task queue is gone: {err}");
                }
            }
            None => log::warn!("task queue is not running, job stays pending"),
        }
    }

    pub fn run_queue(&mut self) {
        let (task_tx, task_rx) = mpsc::channel::<Task>();
        let handle = std::thread::spawn({
            let pipeline = self.pipeline.clone();
            let storage_mgr = self.storage_mgr.clone();
            let config = self.config.clone();
            move || task_runner::start_queue(task_rx, pipeline, storage_mgr, config)
        });

        self.task_tx = Some(Arc::new(task_tx));
        self.task_queue_handle = Some(handle);
    }

    pub fn shutdown(&self) {
        if let Some(task_tx) = &self.task_tx {
            let _ = task_tx.send(Task::Shutdown);
        }
    }

    pub fn wait_task_queue_finish(&mut self) {
        if let Some(handle) = self.task_queue_handle.take() {
            let _ = handle.join();
        }
    }
}
