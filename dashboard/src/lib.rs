use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use dashstore::{
    backend::{BlobFetcher, PortalBackend},
    config::PortalConfig,
    errors::DataError,
    models::{
        BulkImportSummary, Enquiry, EnquiryStatus, EnquirySubmission, EventDraft, EventMedia,
        EventPatch, EventRecord, GradeRecord, GradeRow, MediaKind, Parent, ParentInput, Role,
        Student, StudentInput,
    },
    upload::{LocalFile, MediaSource},
    PortalSession, SessionStatus,
};
use portalfetcher::{HttpBackend, ReqwestBlobFetcher};
use serde::Deserialize;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Runs the command line interface for the portal dashboard service.
pub async fn run_cli() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Serve(args)) => run_serve(args).await?,
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Starts the dashboard JSON service over one portal session
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Portal REST API base URL; falls back to `.env` when omitted
    #[arg(long, env = "PORTAL_API_BASE_URL")]
    api_base_url: Option<String>,
    /// Bearer token forwarded to the portal API
    #[arg(long, env = "PORTAL_AUTH_TOKEN")]
    auth_token: Option<String>,
    /// Base used to resolve relative media paths
    #[arg(long, env = "PORTAL_MEDIA_BASE_URL")]
    media_base_url: Option<String>,
    /// Socket address to bind the dashboard service
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,
    /// Role to sign in as on startup (parent, franchise or admin)
    #[arg(long, env = "PORTAL_ROLE")]
    role: Option<Role>,
}

impl ServeArgs {
    fn portal_config(&self) -> anyhow::Result<PortalConfig> {
        let mut config = match &self.api_base_url {
            Some(base) => PortalConfig::new(base.clone()),
            None => PortalConfig::from_env().context("failed to load portal config")?,
        };
        if self.auth_token.is_some() {
            config = config.with_token(self.auth_token.clone());
        }
        if let Some(media_base) = &self.media_base_url {
            config.media_base_url = Some(media_base.clone());
        }
        Ok(config)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<PortalSession>,
}

impl AppState {
    pub fn new(session: Arc<PortalSession>) -> Self {
        Self { session }
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        let message = err.to_string();
        match err {
            DataError::Authorization(_) => ApiError::Forbidden(message),
            DataError::Validation(_) => ApiError::BadRequest(message),
            DataError::NotFound(_) => ApiError::NotFound(message),
            DataError::Network(_) => ApiError::BadGateway(message),
            DataError::Config(_) => ApiError::Internal(message),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct SessionRequest {
    #[serde(default)]
    role: Option<Role>,
}

#[derive(Deserialize)]
struct MediaQuery {
    #[serde(default)]
    event_id: Option<String>,
}

#[derive(Deserialize)]
struct UploadedFile {
    name: String,
    #[serde(default)]
    content_type: Option<String>,
    data_base64: String,
}

#[derive(Deserialize)]
struct MediaRequest {
    #[serde(default)]
    kind: MediaKind,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    file: Option<UploadedFile>,
}

impl MediaRequest {
    fn into_source(self) -> ApiResult<(MediaSource, MediaKind, Option<String>)> {
        let file = match self.file {
            Some(file) => {
                let bytes = STANDARD
                    .decode(file.data_base64.trim())
                    .map_err(|err| ApiError::BadRequest(format!("invalid file data: {err}")))?;
                Some(LocalFile {
                    file_name: file.name,
                    content_type: file.content_type,
                    bytes,
                })
            }
            None => None,
        };
        let source = MediaSource {
            file,
            url: self.url,
        };
        Ok((source, self.kind, self.caption))
    }
}

#[derive(Deserialize)]
struct StatusRequest {
    status: EnquiryStatus,
}

#[derive(Deserialize)]
struct GradeImportRequest {
    rows: Vec<GradeRow>,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let addr: SocketAddr = args.bind.parse().context("failed to parse bind address")?;
    let config = args.portal_config()?;

    let backend = HttpBackend::new(&config).context("failed to build portal client")?;
    let blobs = ReqwestBlobFetcher::new(&config).context("failed to build media fetcher")?;
    info!("Portal backend at {}", backend.base_url());
    let session = Arc::new(PortalSession::new(
        Arc::new(backend) as Arc<dyn PortalBackend>,
        Arc::new(blobs) as Arc<dyn BlobFetcher>,
    ));

    if let Some(role) = args.role {
        let state = session.set_role(Some(role)).await;
        info!("Signed in as {role}: {:?}", state);
    }

    let router = build_router(AppState::new(session));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind dashboard listener")?;

    info!("Dashboard listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("dashboard server error")?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/session", put(put_session))
        .route("/api/session/refresh", post(refresh_session))
        .route("/api/events", get(list_events).post(create_event))
        .route("/api/events/:id", patch(update_event).delete(delete_event))
        .route("/api/events/:id/media", post(create_event_media))
        .route("/api/media", get(list_media))
        .route("/api/enquiries", get(list_enquiries).post(create_enquiry))
        .route("/api/enquiries/:id/status", patch(update_enquiry_status))
        .route("/api/parents", get(list_parents).post(add_parent))
        .route("/api/students", get(list_students).post(upsert_student))
        .route("/api/grades", get(list_grades))
        .route("/api/grades/bulk", post(import_grades))
        .route("/api/parents/:id/students", get(parent_students))
        .route("/api/parents/:id/grades", get(parent_grades))
        .route("/api/parents/:id/media", get(parent_media))
        .with_state(state)
}

async fn get_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session.status())
}

async fn put_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Json<SessionStatus> {
    let sync = state.session.set_role(body.role).await;
    info!("Session role set to {:?}: {:?}", body.role, sync);
    Json(state.session.status())
}

async fn refresh_session(State(state): State<AppState>) -> Json<SessionStatus> {
    state.session.refresh().await;
    Json(state.session.status())
}

async fn list_events(State(state): State<AppState>) -> Json<Vec<EventRecord>> {
    Json(state.session.store().events())
}

async fn create_event(
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> ApiResult<(StatusCode, Json<EventRecord>)> {
    let event = state.session.create_event(draft).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EventPatch>,
) -> ApiResult<Json<EventRecord>> {
    Ok(Json(state.session.patch_event(&id, patch).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.session.delete_event(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_event_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MediaRequest>,
) -> ApiResult<(StatusCode, Json<EventMedia>)> {
    let (source, kind, caption) = body.into_source()?;
    let media = state
        .session
        .create_event_media(Some(&id), source, kind, caption)
        .await?;
    Ok((StatusCode::CREATED, Json(media)))
}

async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
) -> Json<Vec<EventMedia>> {
    let store = state.session.store();
    let media: Vec<EventMedia> = match query.event_id {
        Some(event_id) => store.view(|store| {
            store
                .media_for_event(&event_id)
                .into_iter()
                .cloned()
                .collect()
        }),
        None => store.event_media(),
    };
    Json(media)
}

async fn list_enquiries(State(state): State<AppState>) -> Json<Vec<Enquiry>> {
    Json(state.session.store().enquiries())
}

async fn create_enquiry(
    State(state): State<AppState>,
    Json(submission): Json<EnquirySubmission>,
) -> ApiResult<(StatusCode, Json<Enquiry>)> {
    let enquiry = state.session.create_enquiry(submission).await?;
    Ok((StatusCode::CREATED, Json(enquiry)))
}

async fn update_enquiry_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Json<Enquiry>> {
    Ok(Json(
        state.session.update_enquiry_status(&id, body.status).await?,
    ))
}

async fn list_parents(State(state): State<AppState>) -> Json<Vec<Parent>> {
    Json(state.session.store().parents())
}

async fn add_parent(
    State(state): State<AppState>,
    Json(input): Json<ParentInput>,
) -> ApiResult<(StatusCode, Json<Parent>)> {
    let parent = state.session.add_parent(input)?;
    Ok((StatusCode::CREATED, Json(parent)))
}

async fn list_students(State(state): State<AppState>) -> Json<Vec<Student>> {
    Json(state.session.store().students())
}

async fn upsert_student(
    State(state): State<AppState>,
    Json(input): Json<StudentInput>,
) -> ApiResult<Json<Student>> {
    Ok(Json(state.session.upsert_student(input)?))
}

async fn list_grades(State(state): State<AppState>) -> Json<Vec<GradeRecord>> {
    Json(state.session.store().grades())
}

async fn import_grades(
    State(state): State<AppState>,
    Json(body): Json<GradeImportRequest>,
) -> ApiResult<Json<BulkImportSummary>> {
    Ok(Json(state.session.add_grades_bulk(body.rows)?))
}

async fn parent_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<Student>> {
    Json(state.session.store().students_for_parent(&id))
}

async fn parent_grades(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<GradeRecord>> {
    Json(state.session.store().grades_for_parent(&id))
}

async fn parent_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<EventMedia>> {
    Json(state.session.store().event_media_for_parent(&id))
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}
