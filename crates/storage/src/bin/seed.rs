use std::fmt;

use practice_core::model::{
    Difficulty, Question, QuestionId, QuestionKind, Topic, TopicSlug, User, UserId, UserRole,
};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    learner_email: String,
    learner_name: String,
    per_difficulty: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCount { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --per-difficulty value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("PRACTICE_DB_URL").unwrap_or_else(|_| "sqlite:practice.sqlite3".into());
        let mut learner_email = std::env::var("PRACTICE_SEED_EMAIL")
            .unwrap_or_else(|_| "learner@example.com".into());
        let mut learner_name =
            std::env::var("PRACTICE_SEED_NAME").unwrap_or_else(|_| "Seed Learner".into());
        let mut per_difficulty = std::env::var("PRACTICE_SEED_PER_DIFFICULTY")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--email" => {
                    learner_email = require_value(&mut args, "--email")?;
                }
                "--name" => {
                    learner_name = require_value(&mut args, "--name")?;
                }
                "--per-difficulty" => {
                    let value = require_value(&mut args, "--per-difficulty")?;
                    per_difficulty = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            learner_email,
            learner_name,
            per_difficulty,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:practice.sqlite3)");
    eprintln!("  --email <email>           Learner email to create (default: learner@example.com)");
    eprintln!("  --name <name>             Learner display name (default: Seed Learner)");
    eprintln!("  --per-difficulty <n>      Questions per topic per difficulty (default: 2)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  PRACTICE_DB_URL, PRACTICE_SEED_EMAIL, PRACTICE_SEED_NAME, PRACTICE_SEED_PER_DIFFICULTY"
    );
}

struct TopicSpec {
    slug: &'static str,
    title: &'static str,
    subtopics: &'static [&'static str],
    skills: &'static [&'static str],
}

const TOPICS: &[TopicSpec] = &[
    TopicSpec {
        slug: "arithmetic",
        title: "Arithmetic",
        subtopics: &["Multiplication", "Estimation"],
        skills: &["chunking", "doubling", "complements"],
    },
    TopicSpec {
        slug: "algebra",
        title: "Algebra",
        subtopics: &["Linear equations", "Like terms"],
        skills: &["isolate-variable", "substitution"],
    },
    TopicSpec {
        slug: "word-problems",
        title: "Word Problems",
        subtopics: &["Rates", "Totals"],
        skills: &["translate-to-equation", "diagram"],
    },
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let mut question_count = 0_u32;
    for spec in TOPICS {
        let topic = Topic::new(
            TopicSlug::new(spec.slug),
            spec.title,
            Difficulty::new(1)?,
            Difficulty::new(5)?,
            "seed",
        )?
        .with_subtopics(spec.subtopics.iter().map(|s| (*s).to_string()).collect())
        .with_mental_skills(spec.skills.iter().map(|s| (*s).to_string()).collect());
        storage.topics.upsert_topic(&topic).await?;

        for difficulty in 1..=5_u8 {
            for i in 0..args.per_difficulty {
                let (text, answer) = sample_question_text(spec.slug, difficulty, i);
                let mut question = Question::new(
                    QuestionId::new(format!("q-{}-{}-{}", spec.slug, difficulty, i + 1)),
                    text,
                    TopicSlug::new(spec.slug),
                    Difficulty::new(difficulty)?,
                    QuestionKind::Numeric,
                    answer,
                    "seed",
                )?;
                question.subtopic = spec.subtopics.first().map(|s| (*s).to_string());
                question.estimated_time = 30 + u32::from(difficulty) * 15;
                storage.questions.upsert_question(&question).await?;
                question_count += 1;
            }
        }
    }

    if storage
        .users
        .find_by_email(&args.learner_email)
        .await?
        .is_none()
    {
        let learner = User::new(
            UserId::generate(),
            args.learner_name.clone(),
            20,
            args.learner_email.clone(),
            "seed-password-hash",
            UserRole::Learner,
        )?;
        storage.users.insert_user(&learner).await?;
    }

    println!(
        "Seeded {} topics and {} questions into {}; learner {}",
        TOPICS.len(),
        question_count,
        args.db_url,
        args.learner_email
    );

    Ok(())
}

fn sample_question_text(slug: &str, difficulty: u8, index: u32) -> (String, String) {
    // Deterministic fixtures keyed on (topic, difficulty, index). Answers are
    // intentionally simple strings; correctness checks are exact matches.
    let a = u32::from(difficulty) * 10 + index + 2;
    let b = u32::from(difficulty) + index + 3;
    match slug {
        "algebra" => (
            format!("Solve for x: x + {b} = {}", a + b),
            a.to_string(),
        ),
        "word-problems" => (
            format!(
                "A train covers {} km in {b} hours. What is its speed in km/h?",
                a * b
            ),
            a.to_string(),
        ),
        _ => (format!("What is {a} + {b}?"), (a + b).to_string()),
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
