use crate::app::SubmitRequest;
use crate::chat::{self, ChatMessage};
use crate::errors::PipelineError;
use crate::jobs::Owner;
use crate::tests::{create_app, grant_credits, MockGenAi};

fn msg(role: &str, text: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        text: text.to_string(),
    }
}

#[test]
fn short_transcript_is_rejected_before_any_provider_call() {
    let genai = MockGenAi::new("reply");

    let result = chat::answer(&genai, "too short", &[msg("user", "what is this about?")]);
    assert!(matches!(result, Err(PipelineError::TranscriptTooShort)));
    assert!(genai.calls.lock().unwrap().is_empty());
}

#[test]
fn first_turn_embeds_full_transcript_and_history_is_replayed() {
    let genai = MockGenAi::new("the answer");
    let transcript = "a transcript long enough to pass the length check";

    let history = [
        msg("user", "what is discussed?"),
        msg("model", "rust programming"),
        msg("user", "who is speaking?"),
    ];

    let reply = chat::answer(&genai, transcript, &history).unwrap();
    assert_eq!(reply, "the answer");

    let calls = genai.calls.lock().unwrap();
    let turns = &calls[0];
    assert_eq!(turns.len(), 4);

    assert_eq!(turns[0].role, "user");
    assert!(turns[0].text.contains(transcript));

    assert_eq!(turns[1].role, "user");
    assert_eq!(turns[1].text, "what is discussed?");
    assert_eq!(turns[2].role, "model");
    assert_eq!(turns[2].text, "rust programming");
    assert_eq!(turns[3].role, "user");
    assert_eq!(turns[3].text, "who is speaking?");
}

#[test]
fn provider_failure_surfaces_to_the_caller() {
    let genai = MockGenAi::new("reply");
    genai.set_failing();

    let result = chat::answer(
        &genai,
        "a transcript long enough to pass the length check",
        &[msg("user", "question?")],
    );

    match result {
        Err(PipelineError::Provider(err)) => {
            assert!(err.to_string().contains("no generated text"))
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[test]
fn chat_against_a_completed_job() {
    let t = create_app();
    grant_credits(&t, "u1", 1);

    t.metadata.set("dQw4w9WgXcQ", "A video");
    t.captions
        .set("dQw4w9WgXcQ", "a transcript long enough to chat about");

    let job = t
        .app
        .submit(SubmitRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            owner: Owner::User("u1".to_string()),
        })
        .unwrap();
    t.app.process(&job.id, &job.source_url).unwrap();

    t.genai.set_reply("it is about love");
    let reply = t.app.chat(&job.id, &[msg("user", "what is it about?")]).unwrap();
    assert_eq!(reply, "it is about love");
}

#[test]
fn chat_against_a_job_without_transcript_is_rejected() {
    let t = create_app();
    grant_credits(&t, "u1", 1);

    let job = t
        .app
        .submit(SubmitRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            owner: Owner::User("u1".to_string()),
        })
        .unwrap();

    let result = t.app.chat(&job.id, &[msg("user", "anyone home?")]);
    assert!(matches!(result, Err(PipelineError::TranscriptTooShort)));
}
