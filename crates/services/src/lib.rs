#![forbid(unsafe_code)]

pub mod agent;
pub mod app_services;
pub mod error;
pub mod sessions;

pub use practice_core::Clock;

pub use agent::{AgentClient, AgentConfig, AgentReply, AgentRequest, HttpAgentClient};
pub use app_services::AppServices;
pub use error::{AgentError, SessionServiceError};
pub use sessions::{
    AnswerOutcome, CreatedSession, CurrentQuestionView, Dashboard, DashboardPoint, SessionService,
    SessionStats,
};
