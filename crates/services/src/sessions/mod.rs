mod dashboard;
mod locks;
mod service;

pub use dashboard::{Dashboard, DashboardPoint, SessionStats, build_dashboard};
pub use service::{
    AnswerOutcome, CreatedSession, CurrentQuestionView, DASHBOARD_SESSION_LIMIT, SessionService,
};
