use std::{
    sync::{
        atomic::{AtomicU16, Ordering},
        mpsc, Arc, RwLock,
    },
    thread::sleep,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    eid::Eid,
    pipeline::Pipeline,
    storage::StorageManager,
};

const QUEUE_FILE: &str = "task-queue.json";

pub fn now() -> u128 {
    let start = SystemTime::now();
    let since_the_epoch = start
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards");
    since_the_epoch.as_millis()
}

pub fn throttle(counter: Arc<AtomicU16>, config: Arc<RwLock<Config>>) {
    while counter.load(Ordering::Relaxed) >= config.read().unwrap().task_queue_max_threads {
        sleep(Duration::from_millis(100));
    }
}

pub fn start_queue(
    task_rx: mpsc::Receiver<Task>,
    pipeline: Arc<Pipeline>,
    storage_mgr: Arc<dyn StorageManager>,
    config: Arc<RwLock<Config>>,
) {
    let thread_ctr = Arc::new(AtomicU16::new(0));

    log::debug!("waiting for job");
    while let Ok(task) = task_rx.recv() {
        log::debug!("got the job");
        let pipeline = pipeline.clone();
        let storage_mgr = storage_mgr.clone();
        let thread_counter = thread_ctr.clone();

        let config = config.clone();

        // graceful shutdown
        if let Task::Shutdown = &task {
            while thread_counter.load(Ordering::Relaxed) > 0 {
                sleep(Duration::from_millis(100));
            }
            return;
        };

        let id = save_task(storage_mgr.clone(), task.clone(), Status::Pending);
        let task_handle = std::thread::spawn({
            let thread_counter = thread_counter.clone();
            let storage_mgr = storage_mgr.clone();
            let id = id.clone();
            move || {
                throttle(thread_counter.clone(), config.clone());

                thread_counter.fetch_add(1, Ordering::Relaxed);
                set_status(storage_mgr.clone(), id.clone(), Status::InProgress);

                // no automatic retry here: a failed pipeline run is retried
                // only through the explicit resume action
                let status = task.run(pipeline);
                set_status(storage_mgr.clone(), id.clone(), status);

                // remove task a bit later to give client an opportunity to react
                std::thread::spawn(move || {
                    sleep(Duration::from_secs(10));
                    remove_task(storage_mgr, id);
                });
            }
        });

        // handle thread panics
        let storage_mgr = storage_mgr.clone();
        std::thread::spawn(move || {
            if let Err(err) = task_handle.join() {
                log::error!("task_handle panicked: {err:?}");
                remove_task(storage_mgr, id);
            }

            thread_counter.fetch_sub(1, Ordering::Relaxed);
        });
    }
}

pub fn read_queue_dump(storage_mgr: Arc<dyn StorageManager>) -> QueueDump {
    if storage_mgr.exists(QUEUE_FILE) {
        match storage_mgr.read(QUEUE_FILE) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or(QueueDump {
                queue: vec![],
                now: now(),
            }),
            Err(e) => {
                log::error!("failed to read queue dump: {e}");
                QueueDump {
                    queue: vec![],
                    now: now(),
                }
            }
        }
    } else {
        QueueDump {
            queue: vec![],
            now: now(),
        }
    }
}

pub fn write_queue_dump(storage_mgr: Arc<dyn StorageManager>, queue_dump: &QueueDump) {
    let queue_dump_str = serde_json::to_string_pretty(&queue_dump).unwrap();
    if let Err(e) = storage_mgr.write(QUEUE_FILE, queue_dump_str.as_bytes()) {
        log::error!("failed to write queue dump: {e}");
    }
}

pub fn remove_task(storage_mgr: Arc<dyn StorageManager>, id: Eid) {
    let mut queue_dump = read_queue_dump(storage_mgr.clone());
    queue_dump.queue.retain(|td| td.id != id);
    queue_dump.now = now();
    write_queue_dump(storage_mgr, &queue_dump);
}

pub fn set_status(storage_mgr: Arc<dyn StorageManager>, id: Eid, status: Status) {
    let mut queue_dump = read_queue_dump(storage_mgr.clone());
    if let Some(task_dump) = queue_dump.queue.iter_mut().find(|td| td.id == id) {
        task_dump.status = status;
    }

    queue_dump.now = now();
    write_queue_dump(storage_mgr, &queue_dump);
}

pub fn save_task(storage_mgr: Arc<dyn StorageManager>, task: Task, status: Status) -> Eid {
    let eid = Eid::new();

    let task_dump = TaskDump {
        id: eid.clone(),
        task,
        status,
    };

    let mut queue_dump = read_queue_dump(storage_mgr.clone());

    queue_dump.queue.push(task_dump);
    queue_dump.now = now();
    write_queue_dump(storage_mgr, &queue_dump);

    eid
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Status {
    Pending,
    InProgress,
    Done,
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueDump {
    pub queue: Vec<TaskDump>,
    pub now: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskDump {
    pub id: Eid,
    pub task: Task,
    pub status: Status,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Task {
    /// request to run the ingestion pipeline for an existing job record
    ProcessJob { job_id: Eid, url: String },

    /// request to gracefully shutdown task queue
    Shutdown,
}

impl Task {
    pub fn run(&self, pipeline: Arc<Pipeline>) -> Status {
        match self {
            Task::ProcessJob { job_id, url } => match pipeline.process(job_id, url) {
                Ok(outcome) => {
                    log::info!(
                        "job {job_id}: completed, type={} credits_used={}",
                        outcome.video_type,
                        outcome.credits_used
                    );
                    Status::Done
                }
                Err(err) => {
                    log::error!("job {job_id}: pipeline failed: {err}");
                    Status::Error(err.to_string())
                }
            },
            Task::Shutdown => unreachable!(),
        }
    }
}
