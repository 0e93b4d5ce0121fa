mod agent;
mod ids;
mod question;
mod session;
mod topic;
mod user;

pub use ids::{ParseIdError, QuestionId, QuestionSessionId, SessionId, TopicSlug, UserId};

pub use agent::{
    AGENT_RECORD_SCHEMA_VERSION, AgentDecision, AgentFeedback, AgentTrace,
};
pub use question::{Difficulty, Provenance, Question, QuestionError, QuestionKind};
pub use session::{QuestionSession, Session, SessionError, session_duration};
pub use topic::{Topic, TopicError};
pub use user::{User, UserError, UserRole, UserSummary};
