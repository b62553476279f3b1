use crate::errors::PipelineError;
use crate::providers::{ChatTurn, GenAiProvider};
use serde::{Deserialize, Serialize};

/// Transcripts shorter than this are rejected before any provider call.
pub const MIN_TRANSCRIPT_CHARS: usize = 10;

const INSTRUCTION: &str = "You are answering questions about a YouTube video. \
Base your answers strictly on the transcript below. If the transcript does \
not contain the answer, say so.";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "model"
    pub role: String,
    pub text: String,
}

/// Stateless per-request handler: the full transcript (untruncated, unlike
/// the summarizer) is re-sent on every call, with the running history
/// replayed as alternating turns. The last message is the caller's question.
pub fn answer(
    genai: &dyn GenAiProvider,
    transcript: &str,
    messages: &[ChatMessage],
) -> Result<String, PipelineError> {
    if transcript.trim().chars().count() < MIN_TRANSCRIPT_CHARS {
        return Err(PipelineError::TranscriptTooShort);
    }

    let mut turns = Vec::with_capacity(messages.len() + 1);
    turns.push(ChatTurn::user(format!(
        "{INSTRUCTION}\n\nTranscript:\n{transcript}"
    )));

    for message in messages {
        let turn = match message.role.as_str() {
            "model" => ChatTurn::model(message.text.clone()),
            _ => ChatTurn::user(message.text.clone()),
        };
        turns.push(turn);
    }

    Ok(genai.generate(&turns)?)
}
