use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AssessmentTypeId, QuestionId};
use super::service::{AssessmentService, NavigationView, ServiceError, SessionId};
use super::session::{NavigationIntent, SessionError, SubmissionGateway};
use super::store::FormDataStore;

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub assessment_type: Option<AssessmentTypeId>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_id: QuestionId,
    pub score: i32,
}

/// Router builder exposing assessment sessions over HTTP.
pub fn assessment_router<S, G>(service: Arc<AssessmentService<S, G>>) -> Router
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    Router::new()
        .route("/api/v1/assessments", post(start_handler::<S, G>))
        .route("/api/v1/assessments/:session_id", get(view_handler::<S, G>))
        .route(
            "/api/v1/assessments/:session_id/resume",
            post(resume_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/answers",
            put(answer_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/answers/:question_id",
            delete(clear_answer_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/advance",
            post(advance_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/back",
            post(back_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/submit",
            post(submit_handler::<S, G>),
        )
        .route(
            "/api/v1/assessments/:session_id/report",
            get(report_handler::<S, G>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    let view = service.start(request.assessment_type);
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn resume_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.resume(&SessionId(session_id), request.assessment_type) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn view_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.view(&SessionId(session_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn answer_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.answer(&SessionId(session_id), &request.question_id, request.score) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn clear_answer_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path((session_id, question_id)): Path<(String, String)>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.clear_answer(&SessionId(session_id), &QuestionId(question_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.advance(&SessionId(session_id)) {
        Ok(view) => navigation_response(view),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn back_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.back(&SessionId(session_id)) {
        Ok(view) => navigation_response(view),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.submit(&SessionId(session_id)) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<S, G>(
    State(service): State<Arc<AssessmentService<S, G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: FormDataStore + 'static,
    G: SubmissionGateway + 'static,
{
    match service.report(&SessionId(session_id)) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

fn navigation_response(view: NavigationView) -> Response {
    let status = match view.intent {
        NavigationIntent::Blocked { .. } => StatusCode::CONFLICT,
        NavigationIntent::Advance { .. } | NavigationIntent::Submit => StatusCode::OK,
    };
    (status, axum::Json(view)).into_response()
}

fn error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::UnknownSession(_) => StatusCode::NOT_FOUND,
        ServiceError::Session(SessionError::AlreadySubmitted) => StatusCode::CONFLICT,
        ServiceError::Session(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Blocked(_) => StatusCode::CONFLICT,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        ServiceError::Blocked(reason) => json!({
            "error": error.to_string(),
            "reason": reason,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
