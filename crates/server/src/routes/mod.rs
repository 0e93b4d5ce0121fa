//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use services::AppServices;

pub mod http;

/// Build the application router with:
/// - REST API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) - adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/sessions",
            post(http::http_create_session).get(http::http_list_sessions),
        )
        .route("/api/v1/sessions/dashboard", get(http::http_dashboard))
        .route(
            "/api/v1/sessions/current-session-question/:id",
            get(http::http_current_session_question),
        )
        .route(
            "/api/v1/sessions/answer-current-session-question",
            post(http::http_answer_current_question),
        )
        .route(
            "/api/v1/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .with_state(services)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use std::sync::Arc;
    use tower::ServiceExt;

    use practice_core::model::{
        Difficulty, Question, QuestionId, QuestionKind, Topic, TopicSlug, User, UserId, UserRole,
    };
    use practice_core::time::fixed_clock;
    use services::agent::{AgentClient, AgentReply, AgentRequest};
    use services::error::AgentError;
    use storage::repository::{QuestionCatalog, TopicCatalog, UserRepository};

    struct ScriptedAgent {
        reply: Option<AgentReply>,
    }

    #[async_trait]
    impl AgentClient for ScriptedAgent {
        async fn suggest_next(&self, _request: &AgentRequest) -> Result<AgentReply, AgentError> {
            self.reply.clone().ok_or(AgentError::Unavailable)
        }
    }

    async fn test_app(reply: Option<AgentReply>) -> (Router, UserId) {
        let services =
            AppServices::new_in_memory(fixed_clock(), Arc::new(ScriptedAgent { reply }));
        let storage = services.storage();

        let topic = Topic::new(
            TopicSlug::new("arithmetic"),
            "Arithmetic",
            Difficulty::new(1).unwrap(),
            Difficulty::new(5).unwrap(),
            "system",
        )
        .unwrap();
        storage.topics.upsert_topic(&topic).await.unwrap();

        for (id, difficulty, answer) in [("q-easy", 1, "42"), ("q-next", 3, "144")] {
            let question = Question::new(
                QuestionId::new(id),
                format!("Fixture {id}"),
                TopicSlug::new("arithmetic"),
                Difficulty::new(difficulty).unwrap(),
                QuestionKind::Numeric,
                answer,
                "seed",
            )
            .unwrap();
            storage.questions.upsert_question(&question).await.unwrap();
        }

        let learner = User::new(
            UserId::generate(),
            "Route Learner",
            24,
            "routes@example.com",
            "hash",
            UserRole::Learner,
        )
        .unwrap();
        storage.users.insert_user(&learner).await.unwrap();

        (build_router(services), learner.id())
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let (app, _) = test_app(None).await;
        let response = app.oneshot(get_request("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
    }

    #[tokio::test]
    async fn create_session_returns_first_question() {
        let (app, user_id) = test_app(None).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/sessions",
                serde_json::json!({
                    "userId": user_id.to_string(),
                    "topicOrder": ["arithmetic"],
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["question"]["id"], "q-easy");
        assert_eq!(body["user"]["email"], "routes@example.com");
        assert_eq!(body["session"]["questions"].as_array().unwrap().len(), 1);
        // the canonical answer stays server-side
        assert!(body["question"].get("correctAnswer").is_none());
    }

    #[tokio::test]
    async fn create_with_missing_topics_is_bad_request() {
        let (app, user_id) = test_app(None).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/sessions",
                serde_json::json!({
                    "userId": user_id.to_string(),
                    "topicOrder": ["arithmetic", "geometry"],
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("geometry"));
        assert!(!message.contains("arithmetic,"));
    }

    #[tokio::test]
    async fn answer_progression_over_http() {
        let reply = AgentReply {
            next_question_id: Some("q-next".into()),
            strategy_tip: Some("Use chunking.".into()),
            message: Some("Nice work - keep going!".into()),
            mastery: Some(0.5),
            ..AgentReply::default()
        };
        let (app, user_id) = test_app(Some(reply)).await;

        let created = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/v1/sessions",
                    serde_json::json!({
                        "userId": user_id.to_string(),
                        "topicOrder": ["arithmetic"],
                    }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let session_id = created["session"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/sessions/answer-current-session-question",
                serde_json::json!({
                    "sessionId": session_id,
                    "response": "42",
                    "timeTaken": 17,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["currentQuestionSession"]["correct"], true);
        assert_eq!(body["nextQuestion"]["id"], "q-next");
        assert_eq!(body["nextQuestion"]["strategyTip"], "Use chunking.");
        assert_eq!(body["session"]["questions"].as_array().unwrap().len(), 2);

        // the new current question now carries the decision enrichment
        let view = body_json(
            app.oneshot(get_request(&format!(
                "/api/v1/sessions/current-session-question/{session_id}"
            )))
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(view["currentQuestionSession"]["questionId"], "q-next");
        assert_eq!(view["agentDecision"]["nextQuestionId"], "q-next");
    }

    #[tokio::test]
    async fn agent_outage_maps_to_bad_gateway() {
        let (app, user_id) = test_app(None).await;

        let created = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/v1/sessions",
                    serde_json::json!({
                        "userId": user_id.to_string(),
                        "topicOrder": ["arithmetic"],
                    }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let session_id = created["session"]["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/sessions/answer-current-session-question",
                serde_json::json!({
                    "sessionId": session_id,
                    "response": "42",
                    "timeTaken": 17,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unknown_session_is_404_and_bad_id_is_400() {
        let (app, _) = test_app(None).await;

        let missing = practice_core::model::SessionId::generate();
        let response = app
            .clone()
            .oneshot(get_request(&format!(
                "/api/v1/sessions/current-session-question/{missing}"
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_request(
                "/api/v1/sessions/current-session-question/not-a-uuid",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dashboard_empty_state_and_delete_roundtrip() {
        let (app, user_id) = test_app(None).await;

        let response = app
            .clone()
            .oneshot(get_request(&format!(
                "/api/v1/sessions/dashboard?userId={user_id}"
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["noData"], true);
        assert_eq!(body["sessions"].as_array().unwrap().len(), 0);

        let created = body_json(
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/api/v1/sessions",
                    serde_json::json!({
                        "userId": user_id.to_string(),
                        "topicOrder": ["arithmetic"],
                    }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let session_id = created["session"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["deleted"], true);

        let response = app
            .oneshot(get_request(&format!("/api/v1/sessions/{session_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
