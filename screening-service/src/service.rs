use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use view_flow::{FlowError, InMemorySessionStorage, SessionStorage};

use crate::{
    config::ServiceConfig,
    error::ScreeningError,
    gemini::{GeminiClient, InferenceClient, RequestFormatter},
    models::{
        KnowledgeQueryRequest, NavigateRequest, OccupationalHazard, RiskProfileUpdate, ScanImage,
        SessionResponse, Symptom, ToggleRequest,
    },
    shell::NavigationShell,
    views::{
        Submission,
        knowledge_query::{DEFAULT_QUERY, TOPICS},
    },
    workflow::{
        ScreeningSession, create_screening_session, spawn_session_sweeper, spawn_submission,
    },
};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);
type Accepted = Result<(StatusCode, Json<SessionResponse>), ApiError>;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn conflict_error(message: &str) -> ApiError {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn screening_error(err: ScreeningError) -> ApiError {
    let message = err.to_string();
    match err {
        ScreeningError::NoImageSelected
        | ScreeningError::UnsupportedImage(_)
        | ScreeningError::EmptyQuery => {
            warn!("Rejected input: {}", message);
            bad_request_error(&message)
        }
        ScreeningError::FormLocked
        | ScreeningError::WrongView { .. }
        | ScreeningError::Flow(FlowError::RequestInFlight) => conflict_error(&message),
        ScreeningError::Flow(FlowError::SessionNotFound(id)) => {
            not_found_error("Session not found", &id)
        }
        ScreeningError::Inference(_) | ScreeningError::Parse(_) => {
            error!("Unexpected inference error in handler: {}", message);
            internal_error("Inference failed", &message)
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStorage<ScreeningSession>>,
    pub client: Arc<dyn InferenceClient>,
    pub formatter: Arc<RequestFormatter>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: &ServiceConfig, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStorage::new()),
            client,
            formatter: Arc::new(RequestFormatter::new(config.models.clone())),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build the router and start evicting idle sessions. Must be called inside a
/// Tokio runtime.
pub fn create_app(config: &ServiceConfig) -> Router {
    let client: Arc<dyn InferenceClient> = Arc::new(GeminiClient::from_config(config));
    let app_state = AppState::new(config, client);
    spawn_session_sweeper(
        app_state.sessions.clone(),
        config.session_idle_timeout,
        SESSION_SWEEP_INTERVAL,
    );
    build_router(app_state)
}

pub fn build_router(app_state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(app_state.max_upload_bytes);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/knowledge/topics", get(knowledge_topics))
        .route("/sessions", post(start_session))
        .route(
            "/sessions/{session_id}",
            get(get_session_status).delete(end_session),
        )
        .route("/sessions/{session_id}/navigate", post(navigate))
        .route(
            "/sessions/{session_id}/scan/image",
            get(get_scan_image)
                .post(upload_scan_image)
                .delete(clear_scan_image)
                .layer(upload_limit),
        )
        .route("/sessions/{session_id}/scan/analyze", post(analyze_scan))
        .route("/sessions/{session_id}/risk/profile", put(update_risk_profile))
        .route("/sessions/{session_id}/risk/symptoms", post(toggle_symptom))
        .route("/sessions/{session_id}/risk/hazards", post(toggle_hazard))
        .route("/sessions/{session_id}/risk/assess", post(assess_risk))
        .route("/sessions/{session_id}/risk/edit", post(edit_risk_profile))
        .route("/sessions/{session_id}/knowledge/query", post(query_knowledge))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Lung Screening Assistant",
        "version": "0.1.0",
        "description": "AI-assisted scan analysis, risk profiling and grounded research for lung cancer screening",
        "endpoints": {
            "POST /sessions": "Start a new session on the home view",
            "GET /sessions/{session_id}": "Get the current view and its state",
            "DELETE /sessions/{session_id}": "End a session",
            "POST /sessions/{session_id}/navigate": "Switch view (home, analyze, risk, info)",
            "POST /sessions/{session_id}/scan/image": "Upload a scan image (raw bytes)",
            "GET /sessions/{session_id}/scan/image": "Fetch the selected scan for preview",
            "DELETE /sessions/{session_id}/scan/image": "Clear the selected scan",
            "POST /sessions/{session_id}/scan/analyze": "Analyze the selected scan",
            "PUT /sessions/{session_id}/risk/profile": "Edit the risk questionnaire",
            "POST /sessions/{session_id}/risk/symptoms": "Toggle a symptom",
            "POST /sessions/{session_id}/risk/hazards": "Toggle an occupational hazard",
            "POST /sessions/{session_id}/risk/assess": "Request a risk assessment",
            "POST /sessions/{session_id}/risk/edit": "Return from an assessment to the form",
            "POST /sessions/{session_id}/knowledge/query": "Ask a research question",
            "GET /knowledge/topics": "Suggested research topics",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn knowledge_topics() -> Json<Value> {
    Json(json!({
        "default_query": DEFAULT_QUERY,
        "topics": TOPICS
    }))
}

async fn start_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = create_screening_session();
    let session_id = session.id.clone();

    state
        .sessions
        .save(session_id.clone(), session.clone())
        .await
        .map_err(|e| {
            error!("Failed to create session: {}", e);
            internal_error("Failed to create session", &e.to_string())
        })?;

    info!("Session {} created", session_id);
    let shell = session.lock().await;
    Ok((StatusCode::CREATED, Json(session_response(&session, &shell))))
}

async fn load_session(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<ScreeningSession>, ApiError> {
    match state.sessions.get(session_id).await {
        Ok(Some(session)) => {
            session.touch();
            Ok(session)
        }
        Ok(None) => Err(screening_error(
            FlowError::SessionNotFound(session_id.to_string()).into(),
        )),
        Err(e) => {
            error!("Failed to load session {}: {}", session_id, e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

fn session_response(session: &ScreeningSession, shell: &NavigationShell) -> SessionResponse {
    SessionResponse {
        session_id: session.id.clone(),
        created_at: session.created_at,
        view: shell.snapshot(),
    }
}

/// Snapshot the view in its loading state, then hand the request to a
/// background task. The browser polls the session for the outcome.
fn dispatch(
    state: &AppState,
    session: &Arc<ScreeningSession>,
    shell: &NavigationShell,
    submission: Submission,
) -> (StatusCode, Json<SessionResponse>) {
    let response = session_response(session, shell);
    spawn_submission(session.clone(), state.client.clone(), submission);
    (StatusCode::ACCEPTED, Json(response))
}

async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let shell = session.lock().await;
    Ok(Json(session_response(&session, &shell)))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;

    session.close().await;

    state.sessions.delete(&session_id).await.map_err(|e| {
        error!("Failed to delete session {}: {}", session_id, e);
        internal_error("Failed to delete session", &e.to_string())
    })?;

    info!("Session {} ended", session_id);
    Ok(Json(json!({
        "session_id": session_id,
        "status": "deleted"
    })))
}

async fn navigate(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<NavigateRequest>,
) -> Accepted {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;

    match shell.navigate(request.view, &state.formatter) {
        Some(submission) => Ok(dispatch(&state, &session, &shell, submission)),
        None => Ok((StatusCode::OK, Json(session_response(&session, &shell)))),
    }
}

async fn upload_scan_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<SessionResponse> {
    if body.is_empty() {
        return Err(bad_request_error("Image body is required"));
    }

    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    let scan = shell.scan_mut().map_err(screening_error)?;
    let image = ScanImage::from_bytes(body.to_vec()).map_err(screening_error)?;
    scan.select_image(image);

    Ok(Json(session_response(&session, &shell)))
}

async fn get_scan_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    let image = shell
        .scan_mut()
        .map_err(screening_error)?
        .image()
        .ok_or_else(|| not_found_error("No scan image selected", &session_id))?;

    Ok((
        [(header::CONTENT_TYPE, image.mime_type())],
        image.bytes().to_vec(),
    ))
}

async fn clear_scan_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    shell.scan_mut().map_err(screening_error)?.clear_image();

    Ok(Json(session_response(&session, &shell)))
}

async fn analyze_scan(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Accepted {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    let submission = shell
        .scan_mut()
        .and_then(|scan| scan.begin_analysis(&state.formatter))
        .map_err(screening_error)?;

    Ok(dispatch(&state, &session, &shell, submission))
}

async fn update_risk_profile(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(update): Json<RiskProfileUpdate>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    shell
        .risk_mut()
        .and_then(|risk| risk.update_profile(update))
        .map_err(screening_error)?;

    Ok(Json(session_response(&session, &shell)))
}

async fn toggle_symptom(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ToggleRequest<Symptom>>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    shell
        .risk_mut()
        .and_then(|risk| risk.toggle_symptom(request.item))
        .map_err(screening_error)?;

    Ok(Json(session_response(&session, &shell)))
}

async fn toggle_hazard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ToggleRequest<OccupationalHazard>>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    shell
        .risk_mut()
        .and_then(|risk| risk.toggle_hazard(request.item))
        .map_err(screening_error)?;

    Ok(Json(session_response(&session, &shell)))
}

async fn assess_risk(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Accepted {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    let submission = shell
        .risk_mut()
        .and_then(|risk| risk.begin_assessment(&state.formatter))
        .map_err(screening_error)?;

    Ok(dispatch(&state, &session, &shell, submission))
}

async fn edit_risk_profile(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    shell.risk_mut().map_err(screening_error)?.edit();

    Ok(Json(session_response(&session, &shell)))
}

async fn query_knowledge(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<KnowledgeQueryRequest>,
) -> Accepted {
    let session = load_session(&state, &session_id).await?;
    let mut shell = session.lock().await;
    let submission = shell
        .knowledge_mut()
        .and_then(|knowledge| knowledge.submit_query(&request.query, &state.formatter))
        .map_err(screening_error)?;

    Ok(dispatch(&state, &session, &shell, submission))
}
