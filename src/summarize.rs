use crate::errors::ProviderError;
use crate::providers::{metadata::VideoMetadata, ChatTurn, GenAiProvider};
use std::sync::Arc;

/// Hard cutoff with an ellipsis marker. No attempt at smart re-summarization;
/// the budget exists to respect the provider's input-size limit.
pub fn truncate_transcript(transcript: &str, budget: usize) -> String {
    if transcript.chars().count() <= budget {
        return transcript.to_string();
    }

    let mut out: String = transcript.chars().take(budget).collect();
    out.push_str("...");
    out
}

fn single_video_prompt(meta: &VideoMetadata, transcript: &str, budget: usize) -> String {
    format!(
        "Summarize the following YouTube video. Write a concise summary of the \
         main points, followed by key takeaways.\n\n\
         Title: {}\n\
         Description: {}\n\n\
         Transcript:\n{}",
        meta.title,
        meta.description,
        truncate_transcript(transcript, budget),
    )
}

fn playlist_prompt(titles: &[String], transcript: &str, budget: usize) -> String {
    let roster = titles
        .iter()
        .enumerate()
        .map(|(idx, title)| format!("{}. {title}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summarize the following YouTube playlist. Give an overview of what the \
         playlist covers as a whole, then the main points per video.\n\n\
         Videos:\n{roster}\n\n\
         Combined transcript (may be partial):\n{}",
        truncate_transcript(transcript, budget),
    )
}

/// Builds single-turn summary prompts and runs them through the generative
/// provider. Parsing strictness lives in the provider itself.
pub struct Summarizer {
    genai: Arc<dyn GenAiProvider>,
    transcript_budget: usize,
}

impl Summarizer {
    pub fn new(genai: Arc<dyn GenAiProvider>, transcript_budget: usize) -> Self {
        Self {
            genai,
            transcript_budget,
        }
    }

    pub fn summarize_video(
        &self,
        meta: &VideoMetadata,
        transcript: &str,
    ) -> Result<String, ProviderError> {
        let prompt = single_video_prompt(meta, transcript, self.transcript_budget);
        self.genai.generate(&[ChatTurn::user(prompt)])
    }

    pub fn summarize_playlist(
        &self,
        titles: &[String],
        transcript: &str,
    ) -> Result<String, ProviderError> {
        let prompt = playlist_prompt(titles, transcript, self.transcript_budget);
        self.genai.generate(&[ChatTurn::user(prompt)])
    }
}
