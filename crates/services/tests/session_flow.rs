use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use practice_core::model::{
    Difficulty, Question, QuestionId, QuestionKind, Topic, TopicSlug, User, UserId, UserRole,
};
use practice_core::time::fixed_clock;
use services::agent::{AgentClient, AgentReply, AgentRequest};
use services::error::{AgentError, SessionServiceError};
use services::{AppServices, SessionService};
use storage::repository::{
    AgentDecisionRepository, QuestionCatalog, TopicCatalog, UserRepository,
};

/// Scripted stand-in for the remote agent. Counts invocations and replays
/// a fixed reply or failure.
struct MockAgent {
    calls: AtomicU32,
    outcome: MockOutcome,
}

enum MockOutcome {
    Reply(AgentReply),
    Unavailable,
    BadStatus,
}

impl MockAgent {
    fn replying(reply: AgentReply) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            outcome: MockOutcome::Reply(reply),
        })
    }

    fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            outcome: MockOutcome::Unavailable,
        })
    }

    fn bad_status() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            outcome: MockOutcome::BadStatus,
        })
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentClient for MockAgent {
    async fn suggest_next(&self, _request: &AgentRequest) -> Result<AgentReply, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Reply(reply) => Ok(reply.clone()),
            MockOutcome::Unavailable => Err(AgentError::Unavailable),
            MockOutcome::BadStatus => {
                Err(AgentError::HttpStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

fn next_question_reply(next_id: &str) -> AgentReply {
    AgentReply {
        next_question_id: Some(next_id.into()),
        next_difficulty: Some(3),
        mastery: Some(0.6),
        strategy_tip: Some("Use chunking.".into()),
        message: Some("Nice work - keep going!".into()),
        reflection_prompt: None,
        reason: Some("correct-fast".into()),
    }
}

async fn seed_fixtures(app: &AppServices) -> UserId {
    let storage = app.storage();

    let topic = Topic::new(
        TopicSlug::new("arithmetic"),
        "Arithmetic",
        Difficulty::new(1).unwrap(),
        Difficulty::new(5).unwrap(),
        "system",
    )
    .unwrap();
    storage.topics.upsert_topic(&topic).await.unwrap();

    let easy = Question::new(
        QuestionId::new("q-easy"),
        "What is 6 x 7?",
        TopicSlug::new("arithmetic"),
        Difficulty::new(1).unwrap(),
        QuestionKind::Numeric,
        "42",
        "seed",
    )
    .unwrap();
    storage.questions.upsert_question(&easy).await.unwrap();

    let mut harder = Question::new(
        QuestionId::new("q-next"),
        "What is 12 x 12?",
        TopicSlug::new("arithmetic"),
        Difficulty::new(3).unwrap(),
        QuestionKind::Numeric,
        "144",
        "seed",
    )
    .unwrap();
    harder.answer_variants = vec!["144".into()];
    storage.questions.upsert_question(&harder).await.unwrap();

    let learner = User::new(
        UserId::generate(),
        "Flow Learner",
        19,
        "flow@example.com",
        "hash",
        UserRole::Learner,
    )
    .unwrap();
    storage.users.insert_user(&learner).await.unwrap();
    learner.id()
}

fn app_with(agent: Arc<MockAgent>) -> AppServices {
    AppServices::new_in_memory(fixed_clock(), agent)
}

#[tokio::test]
async fn create_fails_listing_missing_topic_slugs() {
    let agent = MockAgent::replying(AgentReply::default());
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let err = app
        .sessions()
        .create(
            user_id,
            vec![TopicSlug::new("arithmetic"), TopicSlug::new("geometry")],
        )
        .await
        .unwrap_err();

    match err {
        SessionServiceError::TopicsNotFound(missing) => {
            assert_eq!(missing, vec![TopicSlug::new("geometry")]);
        }
        other => panic!("expected TopicsNotFound, got {other}"),
    }
}

#[tokio::test]
async fn create_rejects_unknown_user() {
    let app = app_with(MockAgent::replying(AgentReply::default()));
    seed_fixtures(&app).await;

    let err = app
        .sessions()
        .create(UserId::generate(), vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap_err();
    assert!(matches!(err, SessionServiceError::UserNotFound(_)));
}

#[tokio::test]
async fn create_picks_easiest_question_and_one_child() {
    let app = app_with(MockAgent::replying(AgentReply::default()));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    assert_eq!(created.question.id.as_str(), "q-easy");
    assert_eq!(created.question.difficulty.value(), 1);
    assert_eq!(created.session.question_count(), 1);
    assert_eq!(created.user.email, "flow@example.com");
    assert_eq!(
        created.session.end_time() - created.session.start_time(),
        chrono::Duration::hours(1)
    );

    // the persisted aggregate matches what was returned
    let found = app.sessions().find(created.session.id()).await.unwrap();
    assert_eq!(found.question_count(), 1);
    assert!(!found.current_question_session().unwrap().is_answered());
}

#[tokio::test]
async fn first_question_has_no_agent_enrichment() {
    let app = app_with(MockAgent::replying(AgentReply::default()));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();
    let view = app
        .sessions()
        .current_question(created.session.id())
        .await
        .unwrap();

    assert_eq!(view.current.question_id().as_str(), "q-easy");
    assert_eq!(view.question.as_ref().map(|q| q.id.as_str()), Some("q-easy"));
    assert!(view.decision.is_none());
}

#[tokio::test]
async fn correct_answer_appends_one_child_and_one_decision() {
    let agent = MockAgent::replying(next_question_reply("q-next"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();
    let session_id = created.session.id();

    let outcome = app
        .sessions()
        .answer_current(session_id, "42".into(), 17)
        .await
        .unwrap();

    assert_eq!(agent.call_count(), 1);
    assert!(outcome.answered.correct());
    assert_eq!(outcome.answered.time_taken(), 17);
    assert_eq!(outcome.session.question_count(), 2);
    assert_eq!(
        outcome.next_question.as_ref().map(|q| q.id.as_str()),
        Some("q-next")
    );
    // next question carries the agent's tip
    assert_eq!(
        outcome.next_question.as_ref().and_then(|q| q.strategy_tip.clone()),
        Some("Use chunking.".into())
    );
    assert_eq!(outcome.message.as_deref(), Some("Nice work - keep going!"));

    // exactly one audit row, pointing prev -> next
    let decisions = app
        .storage()
        .decisions
        .list_for_session(session_id)
        .await
        .unwrap();
    assert_eq!(decisions.len(), 1);
    assert_eq!(
        decisions[0].prev_question_id.as_ref().map(|q| q.as_str()),
        Some("q-easy")
    );
    assert_eq!(
        decisions[0].next_question_id.as_ref().map(|q| q.as_str()),
        Some("q-next")
    );
    assert!((decisions[0].mastery - 0.6).abs() < f32::EPSILON);
    assert_eq!(decisions[0].reason, "correct-fast");

    // the persisted aggregate grew by exactly one unanswered entry
    let found = app.sessions().find(session_id).await.unwrap();
    assert_eq!(found.question_count(), 2);
    let current = found.current_question_session().unwrap();
    assert_eq!(current.question_id().as_str(), "q-next");
    assert!(!current.is_answered());
}

#[tokio::test]
async fn incorrect_answer_short_circuits_without_agent() {
    let agent = MockAgent::replying(next_question_reply("q-next"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    let outcome = app
        .sessions()
        .answer_current(created.session.id(), "41".into(), 9)
        .await
        .unwrap();

    assert_eq!(agent.call_count(), 0);
    assert!(!outcome.answered.correct());
    assert!(outcome.next_question.is_none());
    assert!(outcome.message.is_none());
    assert_eq!(outcome.session.question_count(), 1);

    let decisions = app
        .storage()
        .decisions
        .list_for_session(created.session.id())
        .await
        .unwrap();
    assert!(decisions.is_empty());
}

#[tokio::test]
async fn correctness_is_exact_string_match() {
    // "42 " with a trailing space must not count as correct.
    let agent = MockAgent::replying(next_question_reply("q-next"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    let outcome = app
        .sessions()
        .answer_current(created.session.id(), "42 ".into(), 5)
        .await
        .unwrap();

    assert!(!outcome.answered.correct());
    assert_eq!(agent.call_count(), 0);
    assert_eq!(outcome.session.question_count(), 1);
}

#[tokio::test]
async fn agent_failure_is_fatal_but_answer_stands() {
    let agent = MockAgent::unavailable();
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    let err = app
        .sessions()
        .answer_current(created.session.id(), "42".into(), 12)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionServiceError::Agent(AgentError::Unavailable)
    ));
    assert_eq!(agent.call_count(), 1);

    // the mutation before the agent call is already persisted
    let found = app.sessions().find(created.session.id()).await.unwrap();
    assert_eq!(found.question_count(), 1);
    let current = found.current_question_session().unwrap();
    assert!(current.correct());
    assert_eq!(current.response(), "42");
    assert_eq!(current.time_taken(), 12);
}

#[tokio::test]
async fn agent_http_failure_propagates_as_upstream_error() {
    let agent = MockAgent::bad_status();
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    let err = app
        .sessions()
        .answer_current(created.session.id(), "42".into(), 12)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionServiceError::Agent(AgentError::HttpStatus(_))
    ));
}

#[tokio::test]
async fn stale_next_question_id_still_appends() {
    // the agent picks an id the catalog cannot resolve; the entry is still
    // created with that id and the run continues
    let agent = MockAgent::replying(next_question_reply("q-vanished"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();

    let outcome = app
        .sessions()
        .answer_current(created.session.id(), "42".into(), 8)
        .await
        .unwrap();

    assert!(outcome.next_question.is_none());
    assert_eq!(outcome.session.question_count(), 2);
    assert_eq!(
        outcome
            .session
            .current_question_session()
            .unwrap()
            .question_id()
            .as_str(),
        "q-vanished"
    );

    // retrieval then fails softly on the stale id
    let view = app
        .sessions()
        .current_question(created.session.id())
        .await
        .unwrap();
    assert!(view.question.is_none());
    assert!(view.decision.is_some());
}

#[tokio::test]
async fn current_question_view_explains_agent_choice() {
    let agent = MockAgent::replying(next_question_reply("q-next"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();
    app.sessions()
        .answer_current(created.session.id(), "42".into(), 17)
        .await
        .unwrap();

    let view = app
        .sessions()
        .current_question(created.session.id())
        .await
        .unwrap();

    assert_eq!(view.current.question_id().as_str(), "q-next");
    let decision = view.decision.expect("decision enrichment");
    assert!((decision.mastery - 0.6).abs() < f32::EPSILON);
    assert_eq!(decision.reason, "correct-fast");
    assert!(decision.trace.request.contains("\"questionId\":\"q-easy\""));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let app = app_with(MockAgent::replying(AgentReply::default()));
    seed_fixtures(&app).await;

    let missing = practice_core::model::SessionId::generate();
    assert!(matches!(
        app.sessions().current_question(missing).await.unwrap_err(),
        SessionServiceError::SessionNotFound(_)
    ));
    assert!(matches!(
        app.sessions()
            .answer_current(missing, "42".into(), 1)
            .await
            .unwrap_err(),
        SessionServiceError::SessionNotFound(_)
    ));
}

#[tokio::test]
async fn concurrent_submissions_append_at_most_one_child() {
    let agent = MockAgent::replying(next_question_reply("q-next"));
    let app = app_with(Arc::clone(&agent));
    let user_id = seed_fixtures(&app).await;

    let created = app
        .sessions()
        .create(user_id, vec![TopicSlug::new("arithmetic")])
        .await
        .unwrap();
    let session_id = created.session.id();

    let service: Arc<SessionService> = app.sessions();
    let first = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.answer_current(session_id, "42".into(), 10).await }
    });
    let second = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.answer_current(session_id, "42".into(), 11).await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(first.is_ok());
    assert!(second.is_ok());

    // serialized: one submission answers q-easy correctly and appends
    // q-next; the other then answers q-next (incorrectly, its answer is
    // "144") and appends nothing. No double-append of the same entry.
    assert_eq!(agent.call_count(), 1);
    let found = service.find(session_id).await.unwrap();
    assert_eq!(found.question_count(), 2);
    assert_eq!(found.questions()[0].response(), "42");
    assert!(found.questions()[0].correct());
    assert_eq!(found.questions()[1].response(), "42");
    assert!(!found.questions()[1].correct());
}
