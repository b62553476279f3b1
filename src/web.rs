use crate::{
    app::{App, SubmitRequest},
    chat::ChatMessage,
    errors::PipelineError,
    jobs::{Job, Owner},
    task_runner::QueueDump,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

#[derive(Clone)]
struct SharedState {
    app: Arc<RwLock<App>>,
}

async fn start_app(app: App) {
    let listen_addr = app.config().read().unwrap().listen_addr.clone();
    let app = Arc::new(RwLock::new(app));

    let signal = shutdown_signal(app.clone());
    let shared_state = Arc::new(SharedState { app: app.clone() });

    async fn shutdown_signal(app: Arc<RwLock<App>>) {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {
                let mut app = app.write().await;
                app.shutdown();

                // join on queue thread handle
                log::warn!("waiting for queue to stop");
                app.wait_task_queue_finish();
            },
            _ = terminate => {},
        }
    }

    let router = Router::new()
        .route("/api/jobs/create", post(create))
        .route("/api/jobs/process", post(process))
        .route("/api/jobs/resume", post(resume))
        .route("/api/jobs/get", post(get_job))
        .route("/api/jobs/list", post(list))
        .route("/api/chat", post(chat))
        .route("/api/task_queue", get(task_queue))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await
        .unwrap();
}

pub fn start_daemon(app: App) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app).await });
}

#[derive(Debug)]
struct HttpError(PipelineError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            PipelineError::InvalidUrl(_)
            | PipelineError::NoVideoId(_)
            | PipelineError::NoPlaylistId(_)
            | PipelineError::TranscriptTooShort => StatusCode::BAD_REQUEST,
            PipelineError::JobNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
            PipelineError::SubmissionLimit => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::NotResumable(_, _) => StatusCode::CONFLICT,
            PipelineError::EmptyPlaylist(_)
            | PipelineError::Provider(_)
            | PipelineError::IO(_)
            | PipelineError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<PipelineError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn owner_from_fields(
    user_id: Option<String>,
    fingerprint: Option<String>,
) -> Result<Owner, (StatusCode, Json<serde_json::Value>)> {
    match (user_id, fingerprint) {
        (Some(user_id), None) if !user_id.is_empty() => Ok(Owner::User(user_id)),
        (None, Some(fingerprint)) if !fingerprint.is_empty() => Ok(Owner::Fingerprint(fingerprint)),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "exactly one of user_id/fingerprint is required"})),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct CreateJobRequest {
    url: Option<String>,
    user_id: Option<String>,
    fingerprint: Option<String>,
}

async fn create(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<CreateJobRequest>,
) -> axum::response::Response {
    log::debug!("payload: {payload:?}");

    let Some(url) = payload.url.filter(|url| !url.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "url is required"})),
        )
            .into_response();
    };

    let owner = match owner_from_fields(payload.user_id, payload.fingerprint) {
        Ok(owner) => owner,
        Err(rejection) => return rejection.into_response(),
    };

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        match app.submit(SubmitRequest { url, owner }) {
            Ok(job) => Json(job).into_response(),
            Err(err) => HttpError(err).into_response(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    id: Option<String>,
    url: Option<String>,
}

/// The orchestrator's own HTTP surface: 200 + outcome, 400 for malformed
/// input, 500 + `{error, details, url}` on internal failure.
async fn process(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ProcessRequest>,
) -> axum::response::Response {
    log::debug!("payload: {payload:?}");

    let (Some(id), Some(url)) = (
        payload.id.filter(|id| !id.is_empty()),
        payload.url.filter(|url| !url.is_empty()),
    ) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "id and url are required"})),
        )
            .into_response();
    };

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        match app.process(&id.as_str().into(), &url) {
            Ok(outcome) => Json(json!({
                "success": true,
                "videoId": outcome.video_id,
                "videoType": outcome.video_type,
                "creditsUsed": outcome.credits_used,
            }))
            .into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "details": format!("{err:?}"),
                    "url": url,
                })),
            )
                .into_response(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct JobIdRequest {
    id: String,
}

async fn resume(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<JobIdRequest>,
) -> Result<Json<Job>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        app.resume(&payload.id.as_str().into())
            .map(Json)
            .map_err(Into::into)
    })
}

async fn get_job(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<JobIdRequest>,
) -> Result<Json<Job>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let id = payload.id.as_str().into();
        app.get(&id)?
            .ok_or(PipelineError::JobNotFound(payload.id))
            .map(Json)
            .map_err(Into::into)
    })
}

#[derive(Debug, Deserialize)]
struct ListJobsRequest {
    user_id: Option<String>,
    fingerprint: Option<String>,
}

async fn list(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ListJobsRequest>,
) -> axum::response::Response {
    let owner = match owner_from_fields(payload.user_id, payload.fingerprint) {
        Ok(owner) => owner,
        Err(rejection) => return rejection.into_response(),
    };

    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        match app.list(&owner) {
            Ok(jobs) => Json(jobs).into_response(),
            Err(err) => HttpError(err).into_response(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    id: String,
    messages: Vec<ChatMessage>,
}

async fn chat(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        let reply = app.chat(&payload.id.as_str().into(), &payload.messages)?;
        Ok(Json(json!({"reply": reply})))
    })
}

async fn task_queue(State(state): State<Arc<SharedState>>) -> Json<QueueDump> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || {
        let app = app.blocking_read();
        Json(app.queue_dump())
    })
}
