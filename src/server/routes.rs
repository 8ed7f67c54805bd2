use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{KbStats, Question, QuestionHit, Section};
use crate::repository::Repository;
use crate::server::{ADMIN_SECRET_HEADER, AppState};
use crate::view::{Action, Session};
use crate::Error;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct RecentParams {
    pub sections: Option<usize>,
    pub questions: Option<usize>,
}

#[derive(Deserialize)]
pub struct SectionBody {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct QuestionBody {
    pub question: String,
    pub answer: Option<String>,
    pub info: Option<String>,
}

#[derive(Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub session: Session,
    pub action: Action,
}

#[derive(Serialize)]
pub struct RecentResponse {
    pub sections: Vec<Section>,
    pub questions: Vec<QuestionHit>,
}

#[derive(Serialize)]
pub struct DeletedSection {
    pub id: i64,
    pub questions_removed: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Reference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Storage(_) | Error::Io(_) => {
            tracing::error!("Request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

/// Run a repository call off the async runtime
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Repository) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.repo))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(error_response)
}

fn header_grants_admin(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|secret| state.gate.verify(secret))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    if header_grants_admin(state, headers) {
        return Ok(());
    }
    tracing::warn!("Rejected admin request");
    Err(api_error(StatusCode::UNAUTHORIZED, "admin secret required"))
}

fn found<T>(entity: &'static str, id: i64, value: Option<T>) -> crate::Result<T> {
    value.ok_or(Error::NotFound { entity, id })
}

// ========== Reads ==========

pub async fn list_sections(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Section>>> {
    blocking(&state, |repo| repo.list_sections()).await.map(Json)
}

pub async fn get_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Section>> {
    blocking(&state, move |repo| found("section", id, repo.get_section(id)?))
        .await
        .map(Json)
}

pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Question>>> {
    blocking(&state, move |repo| repo.list_questions(id)).await.map(Json)
}

pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Question>> {
    blocking(&state, move |repo| found("question", id, repo.get_question(id)?))
        .await
        .map(Json)
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<QuestionHit>>> {
    let query = params.q.unwrap_or_default();
    blocking(&state, move |repo| repo.search(&query)).await.map(Json)
}

pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> ApiResult<Json<RecentResponse>> {
    let sections = params.sections.unwrap_or(state.recent_sections);
    let questions = params.questions.unwrap_or(state.recent_questions);

    blocking(&state, move |repo| {
        Ok(RecentResponse {
            sections: repo.recent_sections(sections)?,
            questions: repo.recent_questions(questions)?,
        })
    })
    .await
    .map(Json)
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<KbStats>> {
    blocking(&state, |repo| repo.stats()).await.map(Json)
}

// ========== Admin writes ==========

pub async fn create_section(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SectionBody>,
) -> ApiResult<(StatusCode, Json<Section>)> {
    require_admin(&state, &headers)?;
    let section = blocking(&state, move |repo| {
        repo.add_section(&body.title, body.description.as_deref())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(section)))
}

pub async fn update_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<SectionBody>,
) -> ApiResult<Json<Section>> {
    require_admin(&state, &headers)?;
    blocking(&state, move |repo| {
        repo.update_section(id, &body.title, body.description.as_deref())
    })
    .await
    .map(Json)
}

pub async fn delete_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<DeletedSection>> {
    require_admin(&state, &headers)?;
    let questions_removed = blocking(&state, move |repo| repo.delete_section(id)).await?;
    Ok(Json(DeletedSection { id, questions_removed }))
}

pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Path(section_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<QuestionBody>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    require_admin(&state, &headers)?;
    let question = blocking(&state, move |repo| {
        repo.add_question(
            section_id,
            &body.question,
            body.answer.as_deref(),
            body.info.as_deref(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<QuestionBody>,
) -> ApiResult<Json<Question>> {
    require_admin(&state, &headers)?;
    blocking(&state, move |repo| {
        repo.update_question(id, &body.question, body.answer.as_deref(), body.info.as_deref())
    })
    .await
    .map(Json)
}

pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    require_admin(&state, &headers)?;
    blocking(&state, move |repo| repo.delete_question(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== View state ==========

/// Apply an action to a client-held session and hand back the next one.
///
/// The client's `admin` flag is discarded; admin comes from the
/// `x-admin-secret` header or a `login` action.
pub async fn apply_action(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SessionRequest>,
) -> Json<Session> {
    let session = Session {
        view: request.session.view,
        admin: header_grants_admin(&state, &headers),
    };
    Json(session.apply(request.action, state.gate.as_ref()))
}
