use axum::{
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app::{Academy, TransformPreview};
use crate::comparison::{comparison, ParadigmSummary};
use crate::domain::QuizQuestion;
use crate::error::{AcademyError, Result};
use crate::observability;
use crate::pipeline::extract::{SourceKind, StagingArea};
use crate::pipeline::load::{LoadStrategy, WarehouseView};
use crate::pipeline::simulator::OverviewView;
use crate::pipeline::transform::{Rule, TransformRules};
use crate::quiz::{AnswerFeedback, OptionFeedback, QuizSession, Verdict};
use crate::scheduler::lock;
use crate::shell::{TabEntry, TabId};

type SharedAcademy = Arc<Academy>;

/// Maps library errors onto HTTP status codes.
struct ApiError(AcademyError);

impl From<AcademyError> for ApiError {
    fn from(e: AcademyError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AcademyError::UnknownTab(_)
            | AcademyError::UnknownSource(_)
            | AcademyError::UnknownRule(_)
            | AcademyError::UnknownStrategy(_)
            | AcademyError::OptionOutOfRange { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct Accepted<T> {
    accepted: bool,
    #[serde(flatten)]
    state: T,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    kind: SourceKind,
    name: &'static str,
    shape: &'static str,
}

#[derive(Debug, Serialize)]
struct ExtractView {
    sources: Vec<SourceInfo>,
    staging: StagingArea,
}

#[derive(Debug, Serialize)]
struct QuizView {
    session: QuizSession,
    total: usize,
    progress_percent: f64,
    question: Option<QuizQuestion>,
    feedback: Vec<OptionFeedback>,
    verdict: Option<Verdict>,
    message: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    option: usize,
}

#[derive(Debug, Serialize)]
struct AnswerResponse {
    feedback: Option<AnswerFeedback>,
    quiz: QuizView,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pipeline-academy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_text() -> impl IntoResponse {
    observability::render()
}

async fn list_tabs(Extension(academy): Extension<SharedAcademy>) -> Json<Vec<TabEntry>> {
    Json(lock(&academy.shell).tabs())
}

async fn select_tab(Extension(academy): Extension<SharedAcademy>, Path(tab): Path<String>) -> ApiResult<Vec<TabEntry>> {
    let tab: TabId = tab.parse()?;
    let mut shell = lock(&academy.shell);
    shell.select(tab);
    Ok(Json(shell.tabs()))
}

async fn overview(Extension(academy): Extension<SharedAcademy>) -> Json<OverviewView> {
    Json(academy.simulator.view())
}

async fn overview_start(Extension(academy): Extension<SharedAcademy>) -> Json<Accepted<OverviewView>> {
    let accepted = academy.simulator.start();
    Json(Accepted { accepted, state: academy.simulator.view() })
}

async fn overview_reset(Extension(academy): Extension<SharedAcademy>) -> Json<OverviewView> {
    academy.simulator.reset();
    Json(academy.simulator.view())
}

fn extract_view(academy: &Academy) -> ExtractView {
    ExtractView {
        sources: SourceKind::ALL
            .into_iter()
            .map(|kind| SourceInfo { kind, name: kind.display_name(), shape: kind.shape() })
            .collect(),
        staging: academy.extractor.snapshot(),
    }
}

async fn extract(Extension(academy): Extension<SharedAcademy>) -> Json<ExtractView> {
    Json(extract_view(&academy))
}

async fn extract_from(
    Extension(academy): Extension<SharedAcademy>,
    Path(source): Path<String>,
) -> ApiResult<Accepted<ExtractView>> {
    let kind: SourceKind = source.parse()?;
    let accepted = academy.extractor.extract(kind);
    Ok(Json(Accepted { accepted, state: extract_view(&academy) }))
}

async fn extract_reset(Extension(academy): Extension<SharedAcademy>) -> Json<ExtractView> {
    academy.extractor.clear();
    Json(extract_view(&academy))
}

async fn transform_preview(Extension(academy): Extension<SharedAcademy>) -> Json<TransformPreview> {
    Json(academy.transform_preview())
}

async fn toggle_rule(Extension(academy): Extension<SharedAcademy>, Path(rule): Path<String>) -> ApiResult<TransformPreview> {
    let rule: Rule = rule.parse()?;
    Ok(Json(academy.toggle_rule(rule)))
}

async fn set_rules(
    Extension(academy): Extension<SharedAcademy>,
    Json(rules): Json<TransformRules>,
) -> Json<TransformPreview> {
    *lock(&academy.rules) = rules;
    Json(academy.transform_preview())
}

async fn load(Extension(academy): Extension<SharedAcademy>) -> Json<WarehouseView> {
    Json(academy.loader.view())
}

async fn load_run(
    Extension(academy): Extension<SharedAcademy>,
    Path(strategy): Path<String>,
) -> ApiResult<Accepted<WarehouseView>> {
    let strategy: LoadStrategy = strategy.parse()?;
    let accepted = academy.loader.begin(strategy);
    Ok(Json(Accepted { accepted, state: academy.loader.view() }))
}

async fn load_reset(Extension(academy): Extension<SharedAcademy>) -> Json<WarehouseView> {
    academy.loader.reset();
    Json(academy.loader.view())
}

async fn compare() -> Json<[ParadigmSummary; 2]> {
    Json(comparison())
}

fn quiz_view(academy: &Academy) -> QuizView {
    let bank = academy.quiz.bank();
    let session = academy.quiz.session();
    let verdict = session.is_complete.then(|| session.verdict(bank));
    QuizView {
        total: bank.len(),
        progress_percent: session.progress_percent(bank),
        question: (!session.is_complete).then(|| bank.get(session.current_index).cloned()).flatten(),
        feedback: if session.is_complete { Vec::new() } else { session.option_feedback(bank) },
        message: verdict.map(Verdict::message),
        verdict,
        session,
    }
}

async fn quiz(Extension(academy): Extension<SharedAcademy>) -> Json<QuizView> {
    Json(quiz_view(&academy))
}

async fn quiz_answer(
    Extension(academy): Extension<SharedAcademy>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
    let feedback = academy.quiz.select_option(req.option)?;
    Ok(Json(AnswerResponse { feedback, quiz: quiz_view(&academy) }))
}

async fn quiz_reset(Extension(academy): Extension<SharedAcademy>) -> Json<QuizView> {
    academy.quiz.reset();
    Json(quiz_view(&academy))
}

/// Build the router exposing every lesson as JSON.
pub fn create_server(academy: SharedAcademy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/tabs", get(list_tabs))
        .route("/tabs/:tab", post(select_tab))
        .route("/overview", get(overview))
        .route("/overview/start", post(overview_start))
        .route("/overview/reset", post(overview_reset))
        .route("/extract", get(extract))
        .route("/extract/from/:source", post(extract_from))
        .route("/extract/reset", post(extract_reset))
        .route("/transform", get(transform_preview))
        .route("/transform/rules", axum::routing::put(set_rules))
        .route("/transform/rules/:rule/toggle", post(toggle_rule))
        .route("/load", get(load))
        .route("/load/run/:strategy", post(load_run))
        .route("/load/reset", post(load_reset))
        .route("/comparison", get(compare))
        .route("/quiz", get(quiz))
        .route("/quiz/answer", post(quiz_answer))
        .route("/quiz/reset", post(quiz_reset))
        .layer(Extension(academy))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Serve the lessons until the process is stopped.
pub async fn start_server(academy: SharedAcademy, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AcademyError::Config(format!("invalid listen address {host}:{port}: {e}")))?;
    let app = create_server(academy);

    info!("HTTP server listening on {}", addr);
    println!("🚀 Pipeline Academy running on http://{addr}");
    println!("💚 Health check: http://{addr}/health");
    println!("📚 Modules:      http://{addr}/tabs");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(|e| AcademyError::Server(e.to_string()))
}
