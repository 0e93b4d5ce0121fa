//! HTTP endpoint handlers. Thin wrappers that parse ids, forward to the
//! session service, and convert domain results to wire DTOs.

use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use tracing::instrument;

use practice_core::model::{SessionId, TopicSlug, UserId};
use services::AppServices;

use crate::error::ApiError;
use crate::protocol::{
    AnswerIn, CreateSessionIn, DashboardQuery, DeletedOut, HealthOut, answer_out,
    created_session_out, current_question_out, dashboard_out, session_out,
};

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse::<SessionId>()
        .map_err(|_| ApiError::bad_request(format!("invalid session id: {raw}")))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse::<UserId>()
        .map_err(|_| ApiError::bad_request(format!("invalid user id: {raw}")))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(services, body), fields(topics = body.topic_order.len()))]
pub async fn http_create_session(
    State(services): State<AppServices>,
    Json(body): Json<CreateSessionIn>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;
    let topic_order: Vec<TopicSlug> = body.topic_order.iter().map(TopicSlug::new).collect();

    let created = services.sessions().create(user_id, topic_order).await?;
    Ok(Json(created_session_out(&created)))
}

#[instrument(level = "info", skip(services))]
pub async fn http_list_sessions(
    State(services): State<AppServices>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = services.sessions().list().await?;
    let out: Vec<_> = sessions.iter().map(session_out).collect();
    Ok(Json(out))
}

#[instrument(level = "info", skip(services), fields(%id))]
pub async fn http_get_session(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    let session = services.sessions().find(session_id).await?;
    Ok(Json(session_out(&session)))
}

#[instrument(level = "info", skip(services), fields(%id))]
pub async fn http_delete_session(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    services.sessions().delete(session_id).await?;
    Ok(Json(DeletedOut {
        deleted: true,
        id: session_id.to_string(),
    }))
}

#[instrument(level = "info", skip(services), fields(%id))]
pub async fn http_current_session_question(
    State(services): State<AppServices>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    let view = services.sessions().current_question(session_id).await?;
    Ok(Json(current_question_out(&view)))
}

#[instrument(
    level = "info",
    skip(services, body),
    fields(session_id = %body.session_id, response_len = body.response.len())
)]
pub async fn http_answer_current_question(
    State(services): State<AppServices>,
    Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&body.session_id)?;
    let outcome = services
        .sessions()
        .answer_current(session_id, body.response, body.time_taken)
        .await?;
    Ok(Json(answer_out(&outcome)))
}

#[instrument(level = "info", skip(services, query), fields(user_id = %query.user_id))]
pub async fn http_dashboard(
    State(services): State<AppServices>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_user_id(&query.user_id)?;
    let topic = query.topic.as_deref().map(TopicSlug::new);

    let dashboard = services.sessions().dashboard(user_id, topic).await?;
    Ok(Json(dashboard_out(&dashboard)))
}
