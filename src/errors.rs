/// Errors surfaced by external providers. The status/body variants carry the
/// provider's own response so failures stay diagnosable from the job record.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request timed out after {timeout_secs}s")]
    Timeout {
        provider: &'static str,
        timeout_secs: u64,
    },

    #[error("{provider} returned an unusable response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },

    #[error("{provider} transport error: {source:?}")]
    Transport {
        provider: &'static str,
        source: reqwest::Error,
    },
}

impl ProviderError {
    /// Maps a reqwest error, distinguishing timeouts from other transport
    /// failures so hung providers show up as their own error kind.
    pub fn from_reqwest(provider: &'static str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                timeout_secs,
            }
        } else {
            ProviderError::Transport {
                provider,
                source: err,
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("not a valid youtube url: {0}")]
    InvalidUrl(String),

    #[error("no video id could be extracted from url: {0}")]
    NoVideoId(String),

    #[error("no playlist id could be extracted from url: {0}")]
    NoPlaylistId(String),

    #[error("playlist {0} has no videos")]
    EmptyPlaylist(String),

    #[error("insufficient credits")]
    InsufficientCredits,

    #[error("free submission limit reached")]
    SubmissionLimit,

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job {0} is already {1}, refusing to resume")]
    NotResumable(String, String),

    #[error("not enough transcript content to analyze")]
    TranscriptTooShort,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
