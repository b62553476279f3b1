use crate::jobs::{BackendJson, Job, JobStatus, JobStore, JobUpdate, Owner};

fn create_store() -> (BackendJson, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = BackendJson::load(tmp.path().to_str().unwrap()).unwrap();
    (store, tmp)
}

fn sample_job() -> Job {
    Job::new(
        "https://youtu.be/dQw4w9WgXcQ".to_string(),
        false,
        Owner::User("u1".to_string()),
    )
}

#[test]
fn create_and_get_roundtrip() {
    let (store, _tmp) = create_store();

    let job = store.create(sample_job()).unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.transcript.is_none());
    assert!(job.summary.is_none());

    let fetched = store.get(&job.id).unwrap().unwrap();
    assert_eq!(fetched.source_url, job.source_url);

    assert!(store.get(&"01UNKNOWN".into()).unwrap().is_none());
}

#[test]
fn update_applies_partial_fields_and_bumps_updated_at() {
    let (store, _tmp) = create_store();
    let job = store.create(sample_job()).unwrap();
    let created_at = job.created_at;
    let updated_before = job.updated_at;

    let job = store
        .update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Processing),
                transcript: Some("partial text".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.transcript.as_deref(), Some("partial text"));
    // untouched fields stay untouched
    assert!(job.summary.is_none());
    assert_eq!(job.created_at, created_at);
    assert!(job.updated_at >= updated_before);
}

#[test]
fn clear_error_is_explicit() {
    let (store, _tmp) = create_store();
    let job = store.create(sample_job()).unwrap();

    let job = store
        .update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Failed),
                error_detail: Some("boom".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(job.error_detail.as_deref(), Some("boom"));

    // an update without clear_error leaves the detail in place
    let job = store
        .update(
            &job.id,
            JobUpdate {
                transcript: Some("text".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(job.error_detail.as_deref(), Some("boom"));

    let job = store
        .update(
            &job.id,
            JobUpdate {
                status: Some(JobStatus::Pending),
                clear_error: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(job.error_detail.is_none());
    // prior transcript survives the reset
    assert_eq!(job.transcript.as_deref(), Some("text"));
}

#[test]
fn list_by_owner_filters() {
    let (store, _tmp) = create_store();

    store.create(sample_job()).unwrap();
    store.create(sample_job()).unwrap();
    store
        .create(Job::new(
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
            false,
            Owner::Fingerprint("fp".to_string()),
        ))
        .unwrap();

    let mine = store.list_by_owner(&Owner::User("u1".to_string())).unwrap();
    assert_eq!(mine.len(), 2);

    let anon = store
        .list_by_owner(&Owner::Fingerprint("fp".to_string()))
        .unwrap();
    assert_eq!(anon.len(), 1);

    // user id and fingerprint namespaces never overlap
    let crossed = store.list_by_owner(&Owner::User("fp".to_string())).unwrap();
    assert!(crossed.is_empty());
}

#[test]
fn jobs_survive_a_reload() {
    let tmp = tempfile::tempdir().unwrap();
    let base_path = tmp.path().to_str().unwrap();

    let id = {
        let store = BackendJson::load(base_path).unwrap();
        let job = store.create(sample_job()).unwrap();
        store
            .update(
                &job.id,
                JobUpdate {
                    status: Some(JobStatus::Completed),
                    summary: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        job.id
    };

    let store = BackendJson::load(base_path).unwrap();
    let job = store.get(&id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.summary.as_deref(), Some("done"));
}
