use chrono::Duration;
use practice_core::model::{
    AgentDecision, AgentTrace, Difficulty, Question, QuestionId, QuestionKind, Session, SessionId,
    Topic, TopicSlug, User, UserId, UserRole,
};
use practice_core::time::fixed_now;
use storage::repository::{
    AgentDecisionRepository, QuestionCatalog, SessionRepository, StorageError, TopicCatalog,
    UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_user(email: &str) -> User {
    User::new(
        UserId::generate(),
        "Integration Learner",
        23,
        email,
        "hash",
        UserRole::Learner,
    )
    .unwrap()
}

fn build_topic(slug: &str) -> Topic {
    Topic::new(
        TopicSlug::new(slug),
        slug.to_uppercase(),
        Difficulty::new(1).unwrap(),
        Difficulty::new(5).unwrap(),
        "system",
    )
    .unwrap()
}

fn build_question(id: &str, topic: &str, difficulty: u8, answer: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}"),
        TopicSlug::new(topic),
        Difficulty::new(difficulty).unwrap(),
        QuestionKind::Numeric,
        answer,
        "seed",
    )
    .unwrap()
}

#[tokio::test]
async fn user_roundtrip_preserves_role_and_history() {
    let repo = connect("memdb_users").await;

    let mut user = build_user("roundtrip@example.com");
    user.push_topic_history(TopicSlug::new("arithmetic"));
    user.push_topic_history(TopicSlug::new("arithmetic"));
    repo.insert_user(&user).await.unwrap();

    let fetched = repo.get_user(user.id()).await.unwrap().expect("user");
    assert_eq!(fetched.role(), UserRole::Learner);
    assert_eq!(fetched.topics_history().len(), 2);

    let by_email = repo
        .find_by_email("roundtrip@example.com")
        .await
        .unwrap()
        .expect("by email");
    assert_eq!(by_email.id(), user.id());

    let dup = build_user("roundtrip@example.com");
    assert!(matches!(
        repo.insert_user(&dup).await,
        Err(StorageError::Conflict)
    ));
}

#[tokio::test]
async fn topic_catalog_reports_existing_slugs() {
    let repo = connect("memdb_topics").await;

    repo.upsert_topic(&build_topic("arithmetic")).await.unwrap();
    repo.upsert_topic(&build_topic("algebra")).await.unwrap();

    let found = repo
        .existing_slugs(&[
            TopicSlug::new("arithmetic"),
            TopicSlug::new("geometry"),
            TopicSlug::new("algebra"),
        ])
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.contains(&TopicSlug::new("arithmetic")));
    assert!(found.contains(&TopicSlug::new("algebra")));
    assert!(!found.contains(&TopicSlug::new("geometry")));
}

#[tokio::test]
async fn easiest_question_picks_minimum_difficulty() {
    let repo = connect("memdb_questions").await;

    repo.upsert_question(&build_question("q-3", "arithmetic", 3, "9"))
        .await
        .unwrap();
    repo.upsert_question(&build_question("q-1a", "arithmetic", 1, "4"))
        .await
        .unwrap();
    repo.upsert_question(&build_question("q-1b", "arithmetic", 1, "5"))
        .await
        .unwrap();
    repo.upsert_question(&build_question("q-other", "algebra", 1, "x"))
        .await
        .unwrap();

    let picked = repo
        .easiest_question_for_topic(&TopicSlug::new("arithmetic"))
        .await
        .unwrap()
        .expect("question");
    assert_eq!(picked.difficulty.value(), 1);
    assert_eq!(picked.topic.as_str(), "arithmetic");

    let missing = repo
        .easiest_question_for_topic(&TopicSlug::new("geometry"))
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn session_create_is_atomic_with_first_child() {
    let repo = connect("memdb_sessions").await;

    let user = build_user("sessions@example.com");
    repo.insert_user(&user).await.unwrap();

    let session = Session::start(
        SessionId::generate(),
        user.id(),
        vec![TopicSlug::new("arithmetic")],
        QuestionId::new("q-1"),
        fixed_now(),
    )
    .unwrap();
    repo.create_session(&session).await.unwrap();

    let fetched = repo
        .get_session(session.id())
        .await
        .unwrap()
        .expect("session");
    assert_eq!(fetched.question_count(), 1);
    assert_eq!(
        fetched.current_question_session().unwrap().question_id().as_str(),
        "q-1"
    );
    assert_eq!(fetched.end_time() - fetched.start_time(), Duration::hours(1));
}

#[tokio::test]
async fn answer_update_and_append_keep_log_order() {
    let repo = connect("memdb_progression").await;

    let user = build_user("progress@example.com");
    repo.insert_user(&user).await.unwrap();

    let mut session = Session::start(
        SessionId::generate(),
        user.id(),
        vec![TopicSlug::new("arithmetic")],
        QuestionId::new("q-1"),
        fixed_now(),
    )
    .unwrap();
    repo.create_session(&session).await.unwrap();

    session.record_answer("42", 17, true).unwrap();
    let answered = session.current_question_session().unwrap().clone();
    repo.update_question_session(session.id(), &answered)
        .await
        .unwrap();

    let next = session
        .append_question(QuestionId::new("q-2"), None, fixed_now() + Duration::seconds(20))
        .clone();
    repo.append_question_session(&session, &next).await.unwrap();

    let fetched = repo
        .get_session(session.id())
        .await
        .unwrap()
        .expect("session");
    assert_eq!(fetched.question_count(), 2);
    assert_eq!(fetched.questions()[0].response(), "42");
    assert!(fetched.questions()[0].correct());
    assert_eq!(fetched.questions()[0].attempt_number(), Some(1));
    assert_eq!(
        fetched.current_question_session().unwrap().question_id().as_str(),
        "q-2"
    );
    assert_eq!(fetched.total_questions(), Some(2));
    assert_eq!(fetched.total_correct(), Some(1));
}

#[tokio::test]
async fn recent_sessions_filter_by_topic_order_membership() {
    let repo = connect("memdb_recent").await;

    let user = build_user("recent@example.com");
    repo.insert_user(&user).await.unwrap();

    let arithmetic = Session::start(
        SessionId::generate(),
        user.id(),
        vec![TopicSlug::new("arithmetic"), TopicSlug::new("algebra")],
        QuestionId::new("q-1"),
        fixed_now(),
    )
    .unwrap();
    let word_problems = Session::start(
        SessionId::generate(),
        user.id(),
        vec![TopicSlug::new("word-problems")],
        QuestionId::new("q-2"),
        fixed_now() + Duration::minutes(10),
    )
    .unwrap();
    repo.create_session(&arithmetic).await.unwrap();
    repo.create_session(&word_problems).await.unwrap();

    let all = repo
        .recent_sessions_for_user(user.id(), None, 10)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id(), word_problems.id());

    let filtered = repo
        .recent_sessions_for_user(user.id(), Some(&TopicSlug::new("algebra")), 10)
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id(), arithmetic.id());

    let none = repo
        .recent_sessions_for_user(user.id(), Some(&TopicSlug::new("geometry")), 10)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn delete_session_cascades_children() {
    let repo = connect("memdb_delete").await;

    let user = build_user("delete@example.com");
    repo.insert_user(&user).await.unwrap();

    let session = Session::start(
        SessionId::generate(),
        user.id(),
        vec![TopicSlug::new("arithmetic")],
        QuestionId::new("q-1"),
        fixed_now(),
    )
    .unwrap();
    repo.create_session(&session).await.unwrap();

    repo.delete_session(session.id()).await.unwrap();
    assert!(repo.get_session(session.id()).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_session(session.id()).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn decision_audit_roundtrip_and_latest_lookup() {
    let repo = connect("memdb_decisions").await;

    let session_id = SessionId::generate();
    let next = QuestionId::new("q-2");

    let first = AgentDecision {
        id: None,
        session_id,
        prev_question_id: Some(QuestionId::new("q-1")),
        next_question_id: Some(next.clone()),
        next_difficulty: Some(Difficulty::new(3).unwrap()),
        mastery: 0.4,
        reason: "correct-fast".into(),
        trace: AgentTrace::new(r#"{"questionId":"q-1"}"#, r#"{"nextQuestionId":"q-2"}"#),
        created_at: fixed_now(),
    };
    let second = AgentDecision {
        created_at: fixed_now() + Duration::seconds(30),
        mastery: 0.55,
        ..first.clone()
    };

    let first_id = repo.append_decision(&first).await.unwrap();
    let second_id = repo.append_decision(&second).await.unwrap();
    assert!(second_id > first_id);

    let latest = repo
        .latest_for_next_question(session_id, &next)
        .await
        .unwrap()
        .expect("decision");
    assert_eq!(latest.id, Some(second_id));
    assert!((latest.mastery - 0.55).abs() < f32::EPSILON);
    assert_eq!(latest.trace.request, r#"{"questionId":"q-1"}"#);

    let listed = repo.list_for_session(session_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, Some(first_id));

    let unrelated = repo
        .latest_for_next_question(SessionId::generate(), &next)
        .await
        .unwrap();
    assert!(unrelated.is_none());
}
