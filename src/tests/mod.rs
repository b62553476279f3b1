mod chat;
mod jobs;

use crate::app::App;
use crate::config::Config;
use crate::credits::{CreditLedger, FingerprintGate};
use crate::eid::Eid;
use crate::errors::ProviderError;
use crate::jobs::{Job, JobStatus, JobStore, JobUpdate, Owner};
use crate::providers::{
    metadata::VideoMetadata, CaptionProvider, ChatTurn, GenAiProvider, PlaylistProvider,
    VideoMetadataProvider,
};
use crate::storage;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Default)]
pub struct MockCaptions {
    transcripts: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl MockCaptions {
    pub fn set(&self, video_id: &str, transcript: &str) {
        self.failing.lock().unwrap().remove(video_id);
        self.transcripts
            .lock()
            .unwrap()
            .insert(video_id.to_string(), transcript.to_string());
    }

    pub fn fail(&self, video_id: &str) {
        self.failing.lock().unwrap().insert(video_id.to_string());
    }
}

impl CaptionProvider for MockCaptions {
    fn fetch_transcript(&self, video_id: &str) -> Result<String, ProviderError> {
        if self.failing.lock().unwrap().contains(video_id) {
            return Err(ProviderError::Status {
                provider: "captions",
                status: 404,
                body: "no transcript available".to_string(),
            });
        }

        self.transcripts
            .lock()
            .unwrap()
            .get(video_id)
            .cloned()
            .ok_or(ProviderError::Malformed {
                provider: "captions",
                detail: "missing transcript content".to_string(),
            })
    }
}

#[derive(Default)]
pub struct MockMetadata {
    videos: Mutex<HashMap<String, VideoMetadata>>,
    failing: Mutex<HashSet<String>>,
}

impl MockMetadata {
    pub fn set(&self, video_id: &str, title: &str) {
        self.videos.lock().unwrap().insert(
            video_id.to_string(),
            VideoMetadata {
                title: title.to_string(),
                description: format!("description of {title}"),
                duration: Some("PT4M13S".to_string()),
            },
        );
    }

    pub fn fail(&self, video_id: &str) {
        self.failing.lock().unwrap().insert(video_id.to_string());
    }
}

impl VideoMetadataProvider for MockMetadata {
    fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, ProviderError> {
        if self.failing.lock().unwrap().contains(video_id) {
            return Err(ProviderError::Status {
                provider: "video metadata",
                status: 500,
                body: "backend error".to_string(),
            });
        }

        self.videos
            .lock()
            .unwrap()
            .get(video_id)
            .cloned()
            .ok_or(ProviderError::Malformed {
                provider: "video metadata",
                detail: "video not found".to_string(),
            })
    }
}

#[derive(Default)]
pub struct MockPlaylists {
    playlists: Mutex<HashMap<String, Vec<String>>>,
}

impl MockPlaylists {
    pub fn set(&self, playlist_id: &str, video_ids: &[&str]) {
        self.playlists.lock().unwrap().insert(
            playlist_id.to_string(),
            video_ids.iter().map(|id| id.to_string()).collect(),
        );
    }
}

impl PlaylistProvider for MockPlaylists {
    fn fetch_video_ids(&self, playlist_id: &str) -> Result<Vec<String>, ProviderError> {
        self.playlists
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or(ProviderError::Status {
                provider: "playlist membership",
                status: 404,
                body: "playlist not found".to_string(),
            })
    }
}

pub struct MockGenAi {
    reply: Mutex<Option<String>>,
    pub calls: Mutex<Vec<Vec<ChatTurn>>>,
}

impl MockGenAi {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Mutex::new(Some(reply.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Simulates a 200 response with no generated text at the expected path.
    pub fn set_failing(&self) {
        *self.reply.lock().unwrap() = None;
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = Some(reply.to_string());
    }
}

impl GenAiProvider for MockGenAi {
    fn generate(&self, turns: &[ChatTurn]) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(turns.to_vec());

        self.reply
            .lock()
            .unwrap()
            .clone()
            .ok_or(ProviderError::Malformed {
                provider: "generative ai",
                detail: r#"no generated text in response: {"promptFeedback":{}}"#.to_string(),
            })
    }
}

/// JobStore wrapper recording the status and transcript of every update,
/// for asserting the sequence of writes a poller would observe mid-run.
pub struct RecordingJobStore {
    inner: crate::jobs::BackendJson,
    pub updates: Mutex<Vec<(Option<JobStatus>, Option<String>)>>,
}

impl RecordingJobStore {
    pub fn load(base_path: &str) -> Self {
        Self {
            inner: crate::jobs::BackendJson::load(base_path).expect("failed to create job store"),
            updates: Mutex::new(Vec::new()),
        }
    }
}

impl JobStore for RecordingJobStore {
    fn create(&self, job: Job) -> anyhow::Result<Job> {
        self.inner.create(job)
    }

    fn get(&self, id: &Eid) -> anyhow::Result<Option<Job>> {
        self.inner.get(id)
    }

    fn update(&self, id: &Eid, update: JobUpdate) -> anyhow::Result<Job> {
        self.updates
            .lock()
            .unwrap()
            .push((update.status, update.transcript.clone()));
        self.inner.update(id, update)
    }

    fn list_by_owner(&self, owner: &Owner) -> anyhow::Result<Vec<Job>> {
        self.inner.list_by_owner(owner)
    }
}

pub struct TestApp {
    pub app: App,
    pub captions: Arc<MockCaptions>,
    pub metadata: Arc<MockMetadata>,
    pub playlists: Arc<MockPlaylists>,
    pub genai: Arc<MockGenAi>,
    pub tmp: tempfile::TempDir,
}

/// Isolated App over mock providers and temp-dir stores. Each test gets its
/// own directory so parallel tests never collide.
pub fn create_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap().to_string();

    let jobs: Arc<dyn JobStore> =
        Arc::new(crate::jobs::BackendJson::load(&base_path).expect("failed to create job store"));
    build_app(jobs, tmp)
}

/// Variant keeping a handle on the recording job store.
pub fn create_recording_app() -> (TestApp, Arc<RecordingJobStore>) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let base_path = tmp.path().to_str().unwrap().to_string();

    let recording = Arc::new(RecordingJobStore::load(&base_path));
    (build_app(recording.clone(), tmp), recording)
}

fn build_app(jobs: Arc<dyn JobStore>, tmp: tempfile::TempDir) -> TestApp {
    let base_path = tmp.path().to_str().unwrap().to_string();

    let mut config = Config::default();
    config.pipeline.inter_call_delay_secs = 0;
    let config = Arc::new(RwLock::new(config));

    let captions = Arc::new(MockCaptions::default());
    let metadata = Arc::new(MockMetadata::default());
    let playlists = Arc::new(MockPlaylists::default());
    let genai = Arc::new(MockGenAi::new("a generated summary"));

    let credits: Arc<dyn CreditLedger> = Arc::new(
        crate::credits::BackendJson::load(&base_path).expect("failed to create credit store"),
    );
    let fingerprints =
        FingerprintGate::load(&base_path).expect("failed to create fingerprint gate");
    let storage_mgr = Arc::new(
        storage::BackendLocal::new(&base_path).expect("failed to create storage"),
    );

    let app = App::new_with(
        jobs,
        credits,
        fingerprints,
        captions.clone(),
        metadata.clone(),
        playlists.clone(),
        genai.clone(),
        storage_mgr,
        config,
    );

    TestApp {
        app,
        captions,
        metadata,
        playlists,
        genai,
        tmp,
    }
}

/// Tops up a user's balance through the ledger's refund operation, standing
/// in for the external billing collaborator.
pub fn grant_credits(t: &TestApp, user_id: &str, n: u32) {
    t.app.credits.refund(user_id, n).unwrap();
}
