use crate::storage::{self, StorageManager};
use serde::{Deserialize, Serialize};

const TASK_QUEUE_MAX_THREADS: u16 = 4;

/// Seconds to wait before each per-video provider call inside a playlist.
const DEFAULT_INTER_CALL_DELAY_SECS: u64 = 2;
/// Flush partial playlist transcript to the job store every N videos.
const DEFAULT_FLUSH_EVERY: usize = 3;
/// Character budget for transcript text embedded in summary prompts.
const DEFAULT_SUMMARY_TRANSCRIPT_BUDGET: usize = 8000;
/// Per-request timeout for all provider calls.
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
/// Free submissions allowed per anonymous fingerprint.
const DEFAULT_ANON_SUBMISSION_LIMIT: u32 = 3;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CAPTIONS_URL: &str = "https://api.supadata.ai/v1/youtube/transcript";
const DEFAULT_VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const DEFAULT_PLAYLIST_URL: &str = "https://api.supadata.ai/v1/youtube/playlist/videos";
const DEFAULT_GENAI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_GENAI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_captions_url")]
    pub captions_url: String,

    #[serde(default = "default_videos_url")]
    pub videos_url: String,

    #[serde(default = "default_playlist_url")]
    pub playlist_url: String,

    #[serde(default = "default_genai_url")]
    pub genai_url: String,

    #[serde(default = "default_genai_model")]
    pub genai_model: String,

    /// Per-request timeout in seconds, applied to every provider call.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            captions_url: default_captions_url(),
            videos_url: default_videos_url(),
            playlist_url: default_playlist_url(),
            genai_url: default_genai_url(),
            genai_model: default_genai_model(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_inter_call_delay_secs")]
    pub inter_call_delay_secs: u64,

    #[serde(default = "default_flush_every")]
    pub flush_every: usize,

    #[serde(default = "default_summary_transcript_budget")]
    pub summary_transcript_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_call_delay_secs: default_inter_call_delay_secs(),
            flush_every: default_flush_every(),
            summary_transcript_budget: default_summary_transcript_budget(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "task_queue_max_threads")]
    pub task_queue_max_threads: u16,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub providers: ProviderConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default = "default_anon_submission_limit")]
    pub anon_submission_limit: u32,

    /// Outbound automation webhook notified after job creation.
    /// When unset, created jobs are enqueued on the local task queue instead.
    #[serde(default)]
    pub trigger_webhook_url: Option<String>,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_queue_max_threads: task_queue_max_threads(),
            listen_addr: default_listen_addr(),
            providers: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            anon_submission_limit: default_anon_submission_limit(),
            trigger_webhook_url: None,
            base_path: String::new(),
        }
    }
}

fn task_queue_max_threads() -> u16 {
    TASK_QUEUE_MAX_THREADS
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_captions_url() -> String {
    DEFAULT_CAPTIONS_URL.to_string()
}

fn default_videos_url() -> String {
    DEFAULT_VIDEOS_URL.to_string()
}

fn default_playlist_url() -> String {
    DEFAULT_PLAYLIST_URL.to_string()
}

fn default_genai_url() -> String {
    DEFAULT_GENAI_URL.to_string()
}

fn default_genai_model() -> String {
    DEFAULT_GENAI_MODEL.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    DEFAULT_PROVIDER_TIMEOUT_SECS
}

fn default_inter_call_delay_secs() -> u64 {
    DEFAULT_INTER_CALL_DELAY_SECS
}

fn default_flush_every() -> usize {
    DEFAULT_FLUSH_EVERY
}

fn default_summary_transcript_budget() -> usize {
    DEFAULT_SUMMARY_TRANSCRIPT_BUDGET
}

fn default_anon_submission_limit() -> u32 {
    DEFAULT_ANON_SUBMISSION_LIMIT
}

impl Config {
    fn validate(&mut self) -> anyhow::Result<()> {
        if self.task_queue_max_threads == 0 {
            self.task_queue_max_threads = 1
        }

        if self.pipeline.flush_every == 0 {
            anyhow::bail!("pipeline.flush_every must be greater than 0");
        }

        if self.pipeline.summary_transcript_budget == 0 {
            anyhow::bail!("pipeline.summary_transcript_budget must be greater than 0");
        }

        if self.providers.timeout_secs == 0 {
            anyhow::bail!("providers.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists("config.yaml") {
            store.write(
                "config.yaml",
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read("config.yaml")?)
            .map_err(|_| anyhow::anyhow!("config file is not valid utf8"))?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write("config.yaml", config_str.as_bytes())?;
        Ok(())
    }
}
