use chrono::{DateTime, Utc};
use serde::Serialize;

use practice_core::model::{Session, SessionId};

/// Per-session rollup for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub question_count: u32,
    pub correct_count: u32,
    /// round(correct / total * 100); 0 when the session has no questions.
    pub accuracy_pct: u32,
    /// Rounded mean of time taken; 0 when the session has no questions.
    pub avg_time_secs: u32,
    pub duration_minutes: i64,
}

/// One chart point; sessions appear oldest to newest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPoint {
    pub label: String,
    pub accuracy_pct: u32,
    pub avg_time_secs: u32,
}

/// Aggregate view over a learner's recent sessions.
///
/// `no_data` is the explicit empty-state signal: the UI renders its own
/// placeholder rather than charting fabricated values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub no_data: bool,
    pub sessions: Vec<SessionStats>,
    pub overall_accuracy_pct: u32,
    pub overall_avg_time_secs: u32,
    pub series: Vec<DashboardPoint>,
}

impl Dashboard {
    fn empty() -> Self {
        Self {
            no_data: true,
            sessions: Vec::new(),
            overall_accuracy_pct: 0,
            overall_avg_time_secs: 0,
            series: Vec::new(),
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn rounded_ratio(numerator: u64, denominator: u64, scale: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let scaled = (numerator * scale) as f64 / denominator as f64;
    scaled.round() as u32
}

fn stats_for(session: &Session) -> SessionStats {
    let question_count = session.question_count() as u64;
    let correct_count = session.correct_count() as u64;

    SessionStats {
        session_id: session.id(),
        started_at: session.start_time(),
        question_count: u32::try_from(question_count).unwrap_or(u32::MAX),
        correct_count: u32::try_from(correct_count).unwrap_or(u32::MAX),
        accuracy_pct: rounded_ratio(correct_count, question_count, 100),
        avg_time_secs: rounded_ratio(session.total_time_secs(), question_count, 1),
        duration_minutes: session.duration_minutes(),
    }
}

/// Build the dashboard from sessions fetched newest first.
///
/// The time series runs oldest to newest so it charts left to right.
#[must_use]
pub fn build_dashboard(sessions: &[Session]) -> Dashboard {
    if sessions.is_empty() {
        return Dashboard::empty();
    }

    let stats: Vec<SessionStats> = sessions.iter().map(stats_for).collect();

    let total_questions: u64 = sessions.iter().map(|s| s.question_count() as u64).sum();
    let total_correct: u64 = sessions.iter().map(|s| s.correct_count() as u64).sum();
    let total_time: u64 = sessions.iter().map(Session::total_time_secs).sum();

    let series = stats
        .iter()
        .rev()
        .map(|s| DashboardPoint {
            label: s.started_at.format("%Y-%m-%d %H:%M").to_string(),
            accuracy_pct: s.accuracy_pct,
            avg_time_secs: s.avg_time_secs,
        })
        .collect();

    Dashboard {
        no_data: false,
        sessions: stats,
        overall_accuracy_pct: rounded_ratio(total_correct, total_questions, 100),
        overall_avg_time_secs: rounded_ratio(total_time, total_questions, 1),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_core::model::{QuestionId, TopicSlug, UserId};
    use practice_core::time::fixed_now;

    fn session_with_answers(answers: &[(bool, u32)], started_at: DateTime<Utc>) -> Session {
        let mut session = Session::start(
            SessionId::generate(),
            UserId::generate(),
            vec![TopicSlug::new("arithmetic")],
            QuestionId::new("q-0"),
            started_at,
        )
        .unwrap();

        for (i, (correct, time_taken)) in answers.iter().enumerate() {
            session
                .record_answer(if *correct { "right" } else { "wrong" }, *time_taken, *correct)
                .unwrap();
            if i + 1 < answers.len() {
                session.append_question(
                    QuestionId::new(format!("q-{}", i + 1)),
                    None,
                    started_at + Duration::seconds(i as i64),
                );
            }
        }
        session
    }

    #[test]
    fn four_questions_three_correct_yields_75_pct() {
        let session = session_with_answers(
            &[(true, 10), (true, 20), (true, 30), (false, 20)],
            fixed_now(),
        );
        let stats = stats_for(&session);

        assert_eq!(stats.question_count, 4);
        assert_eq!(stats.correct_count, 3);
        assert_eq!(stats.accuracy_pct, 75);
        assert_eq!(stats.avg_time_secs, 20);
        assert_eq!(stats.duration_minutes, 60);
    }

    #[test]
    fn rounding_is_half_up_on_means() {
        // 10 + 11 = 21 over 2 questions -> 10.5 -> 11
        let session = session_with_answers(&[(true, 10), (false, 11)], fixed_now());
        let stats = stats_for(&session);
        assert_eq!(stats.avg_time_secs, 11);

        // 1 of 3 correct -> 33.33 -> 33
        let session = session_with_answers(&[(true, 5), (false, 5), (false, 5)], fixed_now());
        assert_eq!(stats_for(&session).accuracy_pct, 33);

        // 2 of 3 correct -> 66.67 -> 67
        let session = session_with_answers(&[(true, 5), (true, 5), (false, 5)], fixed_now());
        assert_eq!(stats_for(&session).accuracy_pct, 67);
    }

    #[test]
    fn empty_input_yields_explicit_no_data_signal() {
        let dashboard = build_dashboard(&[]);
        assert!(dashboard.no_data);
        assert!(dashboard.sessions.is_empty());
        assert!(dashboard.series.is_empty());
        assert_eq!(dashboard.overall_accuracy_pct, 0);
        assert_eq!(dashboard.overall_avg_time_secs, 0);
    }

    #[test]
    fn series_runs_oldest_to_newest_while_sessions_stay_newest_first() {
        let older = session_with_answers(&[(true, 10)], fixed_now());
        let newer = session_with_answers(&[(false, 30)], fixed_now() + Duration::hours(2));

        // repository order: newest first
        let dashboard = build_dashboard(&[newer.clone(), older.clone()]);

        assert_eq!(dashboard.sessions[0].session_id, newer.id());
        assert_eq!(dashboard.series.len(), 2);
        assert_eq!(
            dashboard.series[0].label,
            older.start_time().format("%Y-%m-%d %H:%M").to_string()
        );
        assert_eq!(dashboard.series[0].accuracy_pct, 100);
        assert_eq!(dashboard.series[1].accuracy_pct, 0);
    }

    #[test]
    fn overall_aggregates_span_all_sessions() {
        let a = session_with_answers(&[(true, 10), (false, 20)], fixed_now());
        let b = session_with_answers(&[(true, 30), (true, 40)], fixed_now() + Duration::hours(1));

        let dashboard = build_dashboard(&[b, a]);
        // 3 of 4 correct -> 75; (10+20+30+40)/4 = 25
        assert_eq!(dashboard.overall_accuracy_pct, 75);
        assert_eq!(dashboard.overall_avg_time_secs, 25);
    }
}
