//! Quote studio routes: the browser UI and its JSON twin.
//!
//! HTML Endpoints:
//! - `GET  /`                                       open a new session and redirect to it
//! - `GET  /s/{session_id}`                         render the session
//! - `POST /s/{session_id}/generate`                submit keywords, start a generation
//!
//! JSON API Endpoints:
//! - `POST /api/v1/sessions`                        create a session
//! - `GET  /api/v1/sessions/{session_id}`           current state
//! - `PUT  /api/v1/sessions/{session_id}/keywords`  replace the keywords
//! - `POST /api/v1/sessions/{session_id}/generate`  run a generation to settlement

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::{get, post, put},
    Form, Json, Router,
};
use quotecraft_core::{
    failure_banner, ApplicationError, GenerationSnapshot, GenerationState, InterfaceError, Phase,
    RequestOutcome, UNKNOWN_ERROR_MESSAGE,
};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::sessions::{SessionController, SessionRegistry};

const STUDIO_TEMPLATE: &str = "studio/index.html";
const LOADING_REFRESH_SECS: u64 = 1;

#[derive(Clone)]
pub struct StudioState {
    sessions: SessionRegistry,
    templates: Arc<Tera>,
}

impl StudioState {
    pub fn new(sessions: SessionRegistry, templates: Arc<Tera>) -> Self {
        Self { sessions, templates }
    }
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub keywords: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: GenerationSnapshot,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub outcome: RequestOutcome,
    pub session_id: String,
    pub state: GenerationSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

#[derive(Debug, Serialize)]
struct QuoteView {
    text: String,
    author: Option<String>,
}

/// Everything the studio template renders; exactly one of the four views.
#[derive(Debug, Serialize)]
struct StudioView {
    session_id: String,
    view: &'static str,
    keywords: String,
    is_loading: bool,
    quotes: Vec<QuoteView>,
    error_banner: Option<String>,
    refresh_secs: u64,
}

impl StudioView {
    fn from_state(session_id: &str, state: &GenerationState) -> Self {
        let quotes = match state.phase() {
            Phase::Succeeded(quotes) => quotes
                .entries()
                .iter()
                .map(|entry| QuoteView { text: entry.text.clone(), author: entry.author.clone() })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            session_id: session_id.to_string(),
            view: state.phase_kind().as_str(),
            keywords: state.keywords().as_str().to_string(),
            is_loading: state.is_loading(),
            quotes,
            error_banner: state.error_message().map(failure_banner),
            refresh_secs: LOADING_REFRESH_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Compiles the studio templates embedded in the binary.
pub fn load_templates() -> Result<Arc<Tera>, tera::Error> {
    compile_templates(&[(STUDIO_TEMPLATE, include_str!("../../../templates/studio/index.html"))])
}

fn compile_templates(sources: &[(&str, &str)]) -> Result<Arc<Tera>, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(sources.iter().copied())?;
    Ok(Arc::new(tera))
}

pub fn router(state: StudioState) -> Router {
    Router::new()
        // HTML routes
        .route("/", get(open_studio))
        .route("/s/{session_id}", get(studio_page))
        .route("/s/{session_id}/generate", post(submit_generation))
        // JSON API routes
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{session_id}", get(get_session))
        .route("/api/v1/sessions/{session_id}/keywords", put(update_keywords))
        .route("/api/v1/sessions/{session_id}/generate", post(generate))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// HTML Handlers
// ---------------------------------------------------------------------------

async fn open_studio(
    State(state): State<StudioState>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    match state.sessions.create().await {
        Ok((session_id, _)) => Ok(Redirect::to(&format!("/s/{session_id}"))),
        Err(error) => {
            let interface = error.into_interface(Uuid::new_v4().to_string());
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Html(format!("<h1>Studio is busy</h1><p>{}</p>", interface.user_message())),
            ))
        }
    }
}

async fn studio_page(
    Path(session_id): Path<String>,
    State(state): State<StudioState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let Some(controller) = state.sessions.get(&session_id).await else {
        return Err((
            StatusCode::NOT_FOUND,
            Html(
                "<h1>Session not found</h1><p><a href=\"/\">Start a new session</a></p>"
                    .to_string(),
            ),
        ));
    };

    let view = StudioView::from_state(&session_id, &controller.state());
    let context = Context::from_serialize(&view).map_err(template_failure)?;
    let html = state.templates.render(STUDIO_TEMPLATE, &context).map_err(template_failure)?;

    Ok(Html(html))
}

async fn submit_generation(
    Path(session_id): Path<String>,
    State(state): State<StudioState>,
    Form(form): Form<GenerateForm>,
) -> Result<Redirect, (StatusCode, Html<String>)> {
    let Some(controller) = state.sessions.get(&session_id).await else {
        return Err((StatusCode::NOT_FOUND, Html("<h1>Session not found</h1>".to_string())));
    };

    controller.set_keywords(form.keywords);
    match controller.start_generation() {
        Ok(pending) => {
            info!(
                event_name = "server.studio.generation_spawned",
                correlation_id = pending.correlation_id(),
                session_id = %session_id,
                "generation started from studio form"
            );
            tokio::spawn(pending.run());
        }
        Err(reason) => {
            info!(
                event_name = "server.studio.generation_ignored",
                session_id = %session_id,
                reason = reason.as_str(),
                "generation request ignored"
            );
        }
    }

    Ok(Redirect::to(&format!("/s/{session_id}")))
}

fn template_failure(error: tera::Error) -> (StatusCode, Html<String>) {
    error!(event_name = "server.studio.render_failed", error = ?error, "studio render failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Html("<h1>Template Error</h1>".to_string()))
}

// ---------------------------------------------------------------------------
// JSON Handlers
// ---------------------------------------------------------------------------

async fn create_session(
    State(state): State<StudioState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiFailure> {
    let (session_id, controller) = state
        .sessions
        .create()
        .await
        .map_err(|error| api_error(error.into_interface(Uuid::new_v4().to_string())))?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse { session_id: session_id.to_string(), state: controller.snapshot() }),
    ))
}

async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<StudioState>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let controller = lookup(&state, &session_id).await?;
    Ok(Json(SessionResponse { session_id, state: controller.snapshot() }))
}

async fn update_keywords(
    Path(session_id): Path<String>,
    State(state): State<StudioState>,
    Json(request): Json<KeywordsRequest>,
) -> Result<Json<SessionResponse>, ApiFailure> {
    let controller = lookup(&state, &session_id).await?;
    controller.set_keywords(request.keywords);
    Ok(Json(SessionResponse { session_id, state: controller.snapshot() }))
}

/// Runs the request in its own task so it still settles if the client goes away.
async fn generate(
    Path(session_id): Path<String>,
    State(state): State<StudioState>,
) -> Result<Json<GenerateResponse>, ApiFailure> {
    let controller = lookup(&state, &session_id).await?;

    let outcome = match controller.start_generation() {
        Err(reason) => RequestOutcome::Rejected { reason },
        Ok(pending) => {
            let correlation_id = pending.correlation_id().to_string();
            match tokio::spawn(pending.run()).await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    warn!(
                        event_name = "server.api.generation_aborted",
                        correlation_id = %correlation_id,
                        session_id = %session_id,
                        error = %join_error,
                        "generation task did not complete"
                    );
                    RequestOutcome::Failed { message: UNKNOWN_ERROR_MESSAGE.to_string() }
                }
            }
        }
    };

    Ok(Json(GenerateResponse { outcome, session_id, state: controller.snapshot() }))
}

async fn lookup(
    state: &StudioState,
    session_id: &str,
) -> Result<Arc<SessionController>, ApiFailure> {
    match state.sessions.get(session_id).await {
        Some(controller) => Ok(controller),
        None => {
            let correlation_id = Uuid::new_v4().to_string();
            warn!(
                event_name = "server.api.session_not_found",
                correlation_id = %correlation_id,
                session_id = %session_id,
                "unknown session requested"
            );
            let failure = ApplicationError::SessionNotFound(session_id.to_string());
            Err(api_error(failure.into_interface(correlation_id)))
        }
    }
}

fn api_error(error: InterfaceError) -> ApiFailure {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiError {
            error: error.user_message().to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        extract::{Path, State},
        http::{header, Request, StatusCode},
        Form, Json,
    };
    use quotecraft_agent::StaticQuoteService;
    use quotecraft_core::{
        GuardRejection, PhaseKind, QuoteData, QuoteEntry, QuoteService, QuoteServiceError,
        RequestOutcome,
    };
    use tokio::sync::Semaphore;
    use tower::ServiceExt;

    use super::*;
    use crate::sessions::SessionLimits;

    /// Resolves or rejects after an optional gate is opened.
    struct GatedService {
        result: Result<QuoteData, QuoteServiceError>,
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
    }

    impl GatedService {
        fn resolving(quotes: QuoteData) -> Self {
            Self { result: Ok(quotes), gate: None, calls: AtomicUsize::new(0) }
        }

        fn rejecting(error: QuoteServiceError) -> Self {
            Self { result: Err(error), gate: None, calls: AtomicUsize::new(0) }
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl QuoteService for GatedService {
        async fn generate(&self, _keywords: &str) -> Result<QuoteData, QuoteServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.expect("gate stays open");
            }
            self.result.clone()
        }
    }

    fn quotes() -> QuoteData {
        QuoteData::new(vec![
            QuoteEntry::new("Courage is fear that has said its prayers.")
                .with_author("Dorothy Bernstein"),
            QuoteEntry::new("The obstacle is the way."),
        ])
    }

    fn state_with(service: Arc<dyn QuoteService>) -> StudioState {
        state_for(SessionRegistry::new(service))
    }

    fn state_for(sessions: SessionRegistry) -> StudioState {
        StudioState::new(sessions, load_templates().expect("studio templates compile"))
    }

    async fn render(state: &StudioState, session_id: &str) -> String {
        studio_page(Path(session_id.to_string()), State(state.clone()))
            .await
            .expect("page renders")
            .0
    }

    async fn wait_until_settled(controller: &SessionController) {
        let mut receiver = controller.subscribe();
        tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(|state| !state.is_loading()))
            .await
            .expect("generation settles in time")
            .expect("state channel open");
    }

    #[tokio::test]
    async fn idle_page_shows_input_only() {
        let state = state_with(Arc::new(StaticQuoteService::default()));
        let (session_id, _) = state.sessions.create().await.expect("session");

        let html = render(&state, &session_id.to_string()).await;
        assert!(html.contains("data-view=\"idle\""));
        assert!(html.contains("name=\"keywords\""));
        assert!(!html.contains("class=\"spinner\""));
        assert!(!html.contains("role=\"alert\""));
        assert!(!html.contains("http-equiv=\"refresh\""));
    }

    #[tokio::test]
    async fn form_submission_renders_loading_then_results() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(GatedService::resolving(quotes()).gated(gate.clone()));
        let state = state_with(service.clone());
        let (session_id, controller) = state.sessions.create().await.expect("session");
        let session_id = session_id.to_string();

        submit_generation(
            Path(session_id.clone()),
            State(state.clone()),
            Form(GenerateForm { keywords: "stoicism, courage".to_string() }),
        )
        .await
        .expect("form accepted");

        let loading = render(&state, &session_id).await;
        assert!(loading.contains("data-view=\"loading\""));
        assert!(loading.contains("class=\"spinner\""));
        assert!(loading.contains("http-equiv=\"refresh\""));
        assert!(loading.contains("Generating..."));
        assert!(loading.contains("value=\"stoicism, courage\""));

        gate.add_permits(1);
        wait_until_settled(&controller).await;

        let done = render(&state, &session_id).await;
        assert!(done.contains("data-view=\"succeeded\""));
        assert!(done.contains("Courage is fear that has said its prayers."));
        assert!(done.contains("Dorothy Bernstein"));
        assert!(!done.contains("class=\"spinner\""));
        assert!(!done.contains("role=\"alert\""));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_form_submission_is_ignored() {
        let service = Arc::new(GatedService::resolving(quotes()));
        let state = state_with(service.clone());
        let (session_id, controller) = state.sessions.create().await.expect("session");

        submit_generation(
            Path(session_id.to_string()),
            State(state.clone()),
            Form(GenerateForm { keywords: "   ".to_string() }),
        )
        .await
        .expect("form accepted");

        assert_eq!(controller.snapshot().phase, PhaseKind::Idle);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_renders_prefixed_banner_and_escapes_message() {
        let service = Arc::new(GatedService::rejecting(QuoteServiceError::Upstream {
            status: 500,
            message: "<b>model overloaded</b>".to_string(),
        }));
        let state = state_with(service);
        let (session_id, controller) = state.sessions.create().await.expect("session");

        controller.set_keywords("rain");
        controller.request_generation().await;

        let html = render(&state, &session_id.to_string()).await;
        assert!(html.contains("data-view=\"failed\""));
        assert!(html.contains("Failed to generate quotes: &lt;b&gt;model overloaded&lt;"));
        assert!(!html.contains("<b>model overloaded</b>"));
    }

    #[tokio::test]
    async fn generic_failure_banner_has_no_prefix() {
        let state = state_with(Arc::new(GatedService::rejecting(QuoteServiceError::Unknown)));
        let (session_id, controller) = state.sessions.create().await.expect("session");

        controller.set_keywords("rain");
        controller.request_generation().await;

        let html = render(&state, &session_id.to_string()).await;
        assert!(html.contains("An unknown error occurred."));
        assert!(!html.contains("Failed to generate quotes"));
    }

    #[test]
    fn broken_template_is_reported_instead_of_swallowed() {
        assert!(compile_templates(&[(STUDIO_TEMPLATE, "{% if %}")]).is_err());
        assert!(load_templates().is_ok());
    }

    #[tokio::test]
    async fn unknown_session_page_is_not_found() {
        let state = state_with(Arc::new(StaticQuoteService::default()));

        let result = studio_page(Path(Uuid::new_v4().to_string()), State(state)).await;
        let (status, _) = result.expect_err("unknown session");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_generate_reports_outcome_and_state() {
        let service = Arc::new(GatedService::rejecting(QuoteServiceError::RateLimited(
            "rate limited".to_string(),
        )));
        let state = state_with(service);
        let (session_id, controller) = state.sessions.create().await.expect("session");
        controller.set_keywords("rain");

        let Json(response) = generate(Path(session_id.to_string()), State(state.clone()))
            .await
            .expect("generate succeeds");

        assert_eq!(
            response.outcome,
            RequestOutcome::Failed { message: "rate limited".to_string() }
        );
        assert_eq!(response.state.phase, PhaseKind::Failed);
        assert_eq!(response.state.error_message.as_deref(), Some("rate limited"));
        assert!(response.state.quotes.is_none());
    }

    #[tokio::test]
    async fn api_generate_with_blank_keywords_is_rejected_quietly() {
        let state = state_with(Arc::new(StaticQuoteService::default()));
        let (session_id, _) = state.sessions.create().await.expect("session");

        let Json(response) = generate(Path(session_id.to_string()), State(state))
            .await
            .expect("generate responds");

        assert_eq!(
            response.outcome,
            RequestOutcome::Rejected { reason: GuardRejection::EmptyKeywords }
        );
        assert_eq!(response.state.phase, PhaseKind::Idle);
        assert!(response.state.error_message.is_none());
    }

    #[tokio::test]
    async fn api_routes_round_trip_through_the_router() {
        let app = router(state_with(Arc::new(StaticQuoteService::default())));

        let created = app
            .clone()
            .oneshot(Request::post("/api/v1/sessions").body(Body::empty()).expect("request"))
            .await
            .expect("create responds");
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = to_bytes(created.into_body(), usize::MAX).await.expect("body");
        let created: serde_json::Value = serde_json::from_slice(&body).expect("json");
        let session_id = created["session_id"].as_str().expect("session id").to_string();
        assert_eq!(created["state"]["phase"], "idle");

        let updated = app
            .clone()
            .oneshot(
                Request::put(format!("/api/v1/sessions/{session_id}/keywords"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"keywords":"stoicism, courage"}"#))
                    .expect("request"),
            )
            .await
            .expect("update responds");
        assert_eq!(updated.status(), StatusCode::OK);

        let generated = app
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/sessions/{session_id}/generate"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("generate responds");
        assert_eq!(generated.status(), StatusCode::OK);
        let body = to_bytes(generated.into_body(), usize::MAX).await.expect("body");
        let generated: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(generated["outcome"], "succeeded");
        assert_eq!(generated["state"]["phase"], "succeeded");
        assert_eq!(generated["state"]["keywords"], "stoicism, courage");
        assert!(generated["state"]["quotes"].as_array().is_some_and(|quotes| !quotes.is_empty()));
    }

    #[tokio::test]
    async fn unknown_api_session_is_not_found_json() {
        let app = router(state_with(Arc::new(StaticQuoteService::default())));

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/sessions/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("lookup responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert!(payload["error"].as_str().is_some_and(|error| error.contains("does not exist")));
        assert!(payload["correlation_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn repeated_visits_stay_within_session_capacity() {
        let sessions = SessionRegistry::new(Arc::new(StaticQuoteService::default())).with_limits(
            SessionLimits { idle_ttl: Duration::from_secs(3600), max_sessions: 3 },
        );
        let app = router(state_for(sessions.clone()));

        for _ in 0..50 {
            let response = app
                .clone()
                .oneshot(Request::get("/").body(Body::empty()).expect("request"))
                .await
                .expect("root responds");
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        assert_eq!(sessions.len().await, 3);
    }

    #[tokio::test]
    async fn full_registry_of_loading_sessions_returns_service_unavailable() {
        let gate = Arc::new(Semaphore::new(0));
        let service = Arc::new(GatedService::resolving(quotes()).gated(gate.clone()));
        let sessions = SessionRegistry::new(service).with_limits(SessionLimits {
            idle_ttl: Duration::from_secs(3600),
            max_sessions: 1,
        });
        let (_, controller) = sessions.create().await.expect("session");
        controller.set_keywords("rain");
        let task = tokio::spawn(controller.start_generation().expect("accepted").run());

        let response = router(state_for(sessions))
            .oneshot(Request::post("/api/v1/sessions").body(Body::empty()).expect("request"))
            .await
            .expect("create responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        gate.add_permits(1);
        task.await.expect("generation task joins");
    }

    #[tokio::test]
    async fn root_redirects_to_a_fresh_session() {
        let app = router(state_with(Arc::new(StaticQuoteService::default())));

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("root responds");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header");
        assert!(location.starts_with("/s/"));
    }
}
