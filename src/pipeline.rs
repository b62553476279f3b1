use crate::classify::{self, ContentKind};
use crate::config::Config;
use crate::credits::CreditLedger;
use crate::eid::Eid;
use crate::errors::PipelineError;
use crate::jobs::{Job, JobStatus, JobStore, JobUpdate, Owner};
use crate::providers::{
    metadata::VideoMetadata, CaptionProvider, PlaylistProvider, VideoMetadataProvider,
};
use crate::summarize::Summarizer;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::{
    sync::{Arc, RwLock},
    thread::sleep,
    time::Duration,
};

const SECTION_RULE: &str = "========================================";

#[derive(Clone, Debug, Serialize)]
pub struct ProcessOutcome {
    pub video_id: Option<String>,
    pub video_type: &'static str,
    pub credits_used: u32,
}

/// Delimited per-video transcript section. Playlist transcripts are a
/// concatenation of these, in submission order, never reshuffled.
pub(crate) fn transcript_section(n: usize, title: &str, video_id: &str, body: &str) -> String {
    format!("{SECTION_RULE}\nVIDEO {n}: {title}\nID: {video_id}\n{SECTION_RULE}\n{body}\n\n")
}

/// Error section written in place of transcript text for a failed sub-video.
pub(crate) fn error_section(n: usize, video_id: &str, message: &str) -> String {
    format!("{SECTION_RULE}\nVIDEO {n}: ERROR\nID: {video_id}\n{SECTION_RULE}\n[error] {message}\n\n")
}

/// Drives a job record through pending → processing → completed/failed,
/// sequencing the provider calls and the per-video credit accounting.
pub struct Pipeline {
    jobs: Arc<dyn JobStore>,
    credits: Arc<dyn CreditLedger>,
    captions: Arc<dyn CaptionProvider>,
    metadata: Arc<dyn VideoMetadataProvider>,
    playlists: Arc<dyn PlaylistProvider>,
    summarizer: Summarizer,
    config: Arc<RwLock<Config>>,
}

impl Pipeline {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        credits: Arc<dyn CreditLedger>,
        captions: Arc<dyn CaptionProvider>,
        metadata: Arc<dyn VideoMetadataProvider>,
        playlists: Arc<dyn PlaylistProvider>,
        summarizer: Summarizer,
        config: Arc<RwLock<Config>>,
    ) -> Self {
        Self {
            jobs,
            credits,
            captions,
            metadata,
            playlists,
            summarizer,
            config,
        }
    }

    /// Top-level entry point. Writes failure state (and refunds where
    /// applicable) before propagating any error; never retries on its own.
    pub fn process(&self, job_id: &Eid, url: &str) -> Result<ProcessOutcome, PipelineError> {
        let job = self
            .jobs
            .get(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;

        // mark processing before any external call so the record is never
        // silently stuck at pending while work is in flight
        self.jobs.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Processing),
                clear_error: true,
                ..Default::default()
            },
        )?;

        match self.run(&job, url) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.record_failure(&job, url, &err);
                Err(err)
            }
        }
    }

    fn run(&self, job: &Job, url: &str) -> Result<ProcessOutcome, PipelineError> {
        if !classify::validate_youtube_url(url) {
            return Err(PipelineError::InvalidUrl(url.to_string()));
        }

        let classification = classify::classify(url);
        log::info!(
            "job {}: classified as {} (video={:?} playlist={:?})",
            job.id,
            classification.kind.as_str(),
            classification.video_id,
            classification.playlist_id
        );

        match classification.kind {
            ContentKind::Playlist => {
                let playlist_id = classification
                    .playlist_id
                    .ok_or_else(|| PipelineError::NoPlaylistId(url.to_string()))?;
                self.run_playlist(job, &playlist_id)
            }
            kind => {
                let video_id = classification
                    .video_id
                    .ok_or_else(|| PipelineError::NoVideoId(url.to_string()))?;
                self.run_single(job, &video_id, kind)
            }
        }
    }

    /// metadata → transcript → summary → one final write. The single credit
    /// for this job was pre-deducted by the submission layer.
    fn run_single(
        &self,
        job: &Job,
        video_id: &str,
        kind: ContentKind,
    ) -> Result<ProcessOutcome, PipelineError> {
        let meta = self.metadata.fetch_metadata(video_id)?;
        let transcript = self.captions.fetch_transcript(video_id)?;
        let summary = self.summarizer.summarize_video(&meta, &transcript)?;

        self.jobs.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Completed),
                transcript: Some(transcript),
                summary: Some(summary),
                resolved_video_id: Some(video_id.to_string()),
                ..Default::default()
            },
        )?;

        let credits_used = if job.owner.user_id().is_some() { 1 } else { 0 };
        Ok(ProcessOutcome {
            video_id: Some(video_id.to_string()),
            video_type: kind.as_str(),
            credits_used,
        })
    }

    fn run_playlist(&self, job: &Job, playlist_id: &str) -> Result<ProcessOutcome, PipelineError> {
        let video_ids = self.playlists.fetch_video_ids(playlist_id)?;
        if video_ids.is_empty() {
            return Err(PipelineError::EmptyPlaylist(playlist_id.to_string()));
        }

        let (delay_secs, flush_every) = {
            let config = self.config.read().unwrap();
            (
                config.pipeline.inter_call_delay_secs,
                config.pipeline.flush_every,
            )
        };

        self.jobs.update(
            &job.id,
            JobUpdate {
                resolved_video_id: Some(video_ids[0].clone()),
                ..Default::default()
            },
        )?;

        let mut transcript = String::new();
        let mut titles: Vec<String> = Vec::new();
        let mut credits_used = 0u32;

        for (idx, video_id) in video_ids.iter().enumerate() {
            let n = idx + 1;

            // bill per video, not per job: the loop stops (but the job does
            // not fail) once the balance runs out
            if let Owner::User(user_id) = &job.owner {
                if !self.credits.deduct(user_id, 1)? {
                    log::warn!(
                        "job {}: insufficient credits at video {n}/{}, keeping what's done",
                        job.id,
                        video_ids.len()
                    );
                    break;
                }
            }

            // fixed pacing against the external provider's rate limit
            if delay_secs > 0 {
                sleep(Duration::from_secs(delay_secs));
            }

            match self.process_member(video_id) {
                Ok((meta, text)) => {
                    transcript.push_str(&transcript_section(n, &meta.title, video_id, &text));
                    titles.push(meta.title);
                    if job.owner.user_id().is_some() {
                        credits_used += 1;
                    }
                }
                Err(err) => {
                    log::warn!("job {}: video {video_id} failed: {err}", job.id);
                    if let Owner::User(user_id) = &job.owner {
                        self.credits.refund(user_id, 1)?;
                    }
                    transcript.push_str(&error_section(n, video_id, &err.to_string()));
                }
            }

            // partial progress for external pollers
            if n % flush_every == 0 {
                self.flush_partial(&job.id, &transcript)?;
            }
        }

        self.flush_partial(&job.id, &transcript)?;

        // a playlist without a summary is not a completed playlist
        let summary = self.summarizer.summarize_playlist(&titles, &transcript)?;

        self.jobs.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Completed),
                transcript: Some(transcript),
                summary: Some(summary),
                ..Default::default()
            },
        )?;

        Ok(ProcessOutcome {
            video_id: Some(video_ids[0].clone()),
            video_type: ContentKind::Playlist.as_str(),
            credits_used,
        })
    }

    fn process_member(&self, video_id: &str) -> Result<(VideoMetadata, String), PipelineError> {
        let meta = self.metadata.fetch_metadata(video_id)?;
        let transcript = self.captions.fetch_transcript(video_id)?;
        Ok((meta, transcript))
    }

    fn flush_partial(&self, job_id: &Eid, transcript: &str) -> Result<(), PipelineError> {
        self.jobs.update(
            job_id,
            JobUpdate {
                status: Some(JobStatus::Processing),
                transcript: Some(transcript.to_string()),
                ..Default::default()
            },
        )?;
        Ok(())
    }

    fn record_failure(&self, job: &Job, url: &str, err: &PipelineError) {
        // hand back the credit the submission layer deducted for this job;
        // playlist sub-video refunds already happened inline. `job` is the
        // entry snapshot: a job that was already failed or completed holds no
        // deducted credit, so re-running it must not refund again
        let holds_credit = matches!(job.status, JobStatus::Pending | JobStatus::Processing);
        if !job.is_playlist && holds_credit {
            if let Some(user_id) = job.owner.user_id() {
                if let Err(refund_err) = self.credits.refund(user_id, 1) {
                    log::error!("job {}: refund failed: {refund_err}", job.id);
                }
            }
        }

        let detail = json!({
            "message": err.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
            "url": url,
        })
        .to_string();

        if let Err(store_err) = self.jobs.update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Failed),
                error_detail: Some(detail),
                ..Default::default()
            },
        ) {
            log::error!("job {}: failed to record failure: {store_err}", job.id);
        }
    }
}
