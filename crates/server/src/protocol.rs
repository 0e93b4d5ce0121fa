//! Wire DTOs for the REST surface (serde ready).
//!
//! Field names are camelCase to match the existing clients; conversions
//! from domain types live here so handlers stay thin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use practice_core::model::{
    AgentDecision, Question, QuestionSession, Session, UserSummary,
};
use services::sessions::{
    AnswerOutcome, CreatedSession, CurrentQuestionView, Dashboard, DashboardPoint, SessionStats,
};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// ─── SESSIONS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionIn {
    pub user_id: String,
    pub topic_order: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSessionOut {
    pub id: String,
    pub question_id: String,
    pub response: String,
    pub correct: bool,
    pub time_taken: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_feedback: Option<AgentFeedbackOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_tip: Option<String>,
    pub answer_variants: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentFeedbackOut {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_tip: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub id: String,
    pub user_id: String,
    pub topic_order: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub questions: Vec<QuestionSessionOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_correct: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryOut {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

/// Question metadata for rendering. The canonical answer and its accepted
/// variants never cross the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: String,
    pub text: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    pub difficulty: u8,
    pub kind: String,
    pub options: Vec<String>,
    pub tags: Vec<String>,
    pub mental_skills: Vec<String>,
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_tip: Option<String>,
    pub estimated_time: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSessionOut {
    pub session: SessionOut,
    pub user: UserSummaryOut,
    pub question: QuestionOut,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDecisionOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_question_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_difficulty: Option<u8>,
    pub mastery: f32,
    pub reason: String,
    pub agent_request: String,
    pub agent_response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestionOut {
    pub session: SessionOut,
    pub current_question_session: QuestionSessionOut,
    pub current_question: Option<QuestionOut>,
    pub agent_decision: Option<AgentDecisionOut>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub session_id: String,
    pub response: String,
    pub time_taken: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub session: SessionOut,
    pub current_question_session: QuestionSessionOut,
    pub next_question: Option<QuestionOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_tip: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedOut {
    pub deleted: bool,
    pub id: String,
}

//
// ─── DASHBOARD ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub user_id: String,
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatsOut {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub question_count: u32,
    pub correct_count: u32,
    pub accuracy_pct: u32,
    pub avg_time_secs: u32,
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPointOut {
    pub label: String,
    pub accuracy_pct: u32,
    pub avg_time_secs: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOut {
    pub no_data: bool,
    pub sessions: Vec<SessionStatsOut>,
    pub overall_accuracy_pct: u32,
    pub overall_avg_time_secs: u32,
    pub series: Vec<DashboardPointOut>,
}

//
// ─── CONVERSIONS ───────────────────────────────────────────────────────────────
//

pub fn question_session_out(entry: &QuestionSession) -> QuestionSessionOut {
    QuestionSessionOut {
        id: entry.id().to_string(),
        question_id: entry.question_id().to_string(),
        response: entry.response().to_string(),
        correct: entry.correct(),
        time_taken: entry.time_taken(),
        timestamp: entry.timestamp(),
        attempt_number: entry.attempt_number(),
        agent_feedback: entry.agent_feedback().map(|f| AgentFeedbackOut {
            message: f.message.clone(),
            reflection_prompt: f.reflection_prompt.clone(),
            strategy_tip: f.strategy_tip.clone(),
        }),
        strategy_tip: entry.strategy_tip().map(str::to_string),
        answer_variants: entry.answer_variants().to_vec(),
    }
}

pub fn session_out(session: &Session) -> SessionOut {
    SessionOut {
        id: session.id().to_string(),
        user_id: session.user_id().to_string(),
        topic_order: session
            .topic_order()
            .iter()
            .map(|slug| slug.as_str().to_string())
            .collect(),
        start_time: session.start_time(),
        end_time: session.end_time(),
        questions: session.questions().iter().map(question_session_out).collect(),
        total_score: session.total_score(),
        total_correct: session.total_correct(),
        total_questions: session.total_questions(),
    }
}

pub fn user_summary_out(user: &UserSummary) -> UserSummaryOut {
    UserSummaryOut {
        id: user.id.to_string(),
        full_name: user.full_name.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
    }
}

pub fn question_out(question: &Question) -> QuestionOut {
    QuestionOut {
        id: question.id.to_string(),
        text: question.text.clone(),
        topic: question.topic.as_str().to_string(),
        subtopic: question.subtopic.clone(),
        difficulty: question.difficulty.value(),
        kind: question.kind.as_str().to_string(),
        options: question.options.clone(),
        tags: question.tags.clone(),
        mental_skills: question.mental_skills.clone(),
        hints: question.hints.clone(),
        strategy_tip: question.strategy_tip.clone(),
        estimated_time: question.estimated_time,
    }
}

pub fn agent_decision_out(decision: &AgentDecision) -> AgentDecisionOut {
    AgentDecisionOut {
        prev_question_id: decision.prev_question_id.as_ref().map(ToString::to_string),
        next_question_id: decision.next_question_id.as_ref().map(ToString::to_string),
        next_difficulty: decision.next_difficulty.map(|d| d.value()),
        mastery: decision.mastery,
        reason: decision.reason.clone(),
        agent_request: decision.trace.request.clone(),
        agent_response: decision.trace.response.clone(),
        created_at: decision.created_at,
    }
}

pub fn created_session_out(created: &CreatedSession) -> CreatedSessionOut {
    CreatedSessionOut {
        session: session_out(&created.session),
        user: user_summary_out(&created.user),
        question: question_out(&created.question),
    }
}

pub fn current_question_out(view: &CurrentQuestionView) -> CurrentQuestionOut {
    CurrentQuestionOut {
        session: session_out(&view.session),
        current_question_session: question_session_out(&view.current),
        current_question: view.question.as_ref().map(question_out),
        agent_decision: view.decision.as_ref().map(agent_decision_out),
    }
}

pub fn answer_out(outcome: &AnswerOutcome) -> AnswerOut {
    AnswerOut {
        session: session_out(&outcome.session),
        current_question_session: question_session_out(&outcome.answered),
        next_question: outcome.next_question.as_ref().map(question_out),
        message: outcome.message.clone(),
        reflection_prompt: outcome.reflection_prompt.clone(),
        strategy_tip: outcome.strategy_tip.clone(),
    }
}

fn session_stats_out(stats: &SessionStats) -> SessionStatsOut {
    SessionStatsOut {
        session_id: stats.session_id.to_string(),
        started_at: stats.started_at,
        question_count: stats.question_count,
        correct_count: stats.correct_count,
        accuracy_pct: stats.accuracy_pct,
        avg_time_secs: stats.avg_time_secs,
        duration_minutes: stats.duration_minutes,
    }
}

fn dashboard_point_out(point: &DashboardPoint) -> DashboardPointOut {
    DashboardPointOut {
        label: point.label.clone(),
        accuracy_pct: point.accuracy_pct,
        avg_time_secs: point.avg_time_secs,
    }
}

pub fn dashboard_out(dashboard: &Dashboard) -> DashboardOut {
    DashboardOut {
        no_data: dashboard.no_data,
        sessions: dashboard.sessions.iter().map(session_stats_out).collect(),
        overall_accuracy_pct: dashboard.overall_accuracy_pct,
        overall_avg_time_secs: dashboard.overall_avg_time_secs,
        series: dashboard.series.iter().map(dashboard_point_out).collect(),
    }
}
