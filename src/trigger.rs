use crate::eid::Eid;
use crate::providers::http_client;
use serde_json::json;

const TRIGGER_TIMEOUT_SECS: u64 = 10;

/// Best-effort outbound webhook kicking off asynchronous processing after a
/// job record is created. Failure is logged and swallowed: the job stays
/// pending and can be resumed manually.
pub fn notify(webhook_url: &str, job_id: &Eid, youtube_url: &str) {
    let payload = json!({
        "id": job_id.to_string(),
        "youtube_url": youtube_url,
    });

    let client = http_client(TRIGGER_TIMEOUT_SECS);
    match client.post(webhook_url).json(&payload).send() {
        Ok(response) if response.status().is_success() => {
            log::debug!("job {job_id}: trigger delivered");
        }
        Ok(response) => {
            log::warn!(
                "job {job_id}: trigger webhook returned {}",
                response.status()
            );
        }
        Err(err) => {
            log::warn!("job {job_id}: trigger webhook failed: {err}");
        }
    }
}
