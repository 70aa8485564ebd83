use chrono::{Duration, Utc};
use phq_screening::db;
use phq_screening::models::{AssessmentRecord, NewAssessment};
use phq_screening::scoring::{score, Questionnaire, QuestionnaireResponse};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use uuid::Uuid;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/assessments.db?mode=rwc";
/// Upper bound for `--days`, roughly a century.
const MAX_DAYS: i64 = 36_500;

#[derive(Debug, Clone)]
struct Args {
    database_url: String,
    count: u32,
    questionnaire: Questionnaire,
    days: i64,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, String> {
    let mut database_url = DEFAULT_DATABASE_URL.to_string();
    let mut count: u32 = 25;
    let mut questionnaire = Questionnaire::Phq8;
    let mut days: i64 = 180;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--database-url" => {
                database_url = it
                    .next()
                    .ok_or_else(|| "--database-url requires a value".to_string())?;
            }
            "--count" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--count requires a value".to_string())?;
                count = v
                    .parse::<u32>()
                    .map_err(|_| "--count must be an integer".to_string())?;
            }
            "--questionnaire" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--questionnaire requires a value".to_string())?;
                questionnaire = Questionnaire::from_str(&v)
                    .ok_or_else(|| "--questionnaire must be one of: phq8, phq3".to_string())?;
            }
            "--days" => {
                let v = it
                    .next()
                    .ok_or_else(|| "--days requires a value".to_string())?;
                days = v
                    .parse::<i64>()
                    .ok()
                    .filter(|d| (1..=MAX_DAYS).contains(d))
                    .ok_or_else(|| format!("--days must be an integer from 1 to {}", MAX_DAYS))?;
            }
            "-h" | "--help" => {
                return Err(help_text());
            }
            other => return Err(format!("Unknown argument: {}\n{}", other, help_text())),
        }
    }

    Ok(Args {
        database_url,
        count,
        questionnaire,
        days,
    })
}

fn help_text() -> String {
    [
        "Seeds the SQLite DB with scored demo assessments.",
        "",
        "Usage:",
        "  cargo run --bin seed_demo_assessments -- [--count N] [--database-url URL] [--questionnaire phq8|phq3] [--days N]",
        "",
        "Notes:",
        "  - Answers are random but scored exactly like real submissions.",
        "  - created_at is spread over the last N days (default 180).",
        "  - No recordings are created.",
    ]
    .join("\n")
}

fn random_name(rng: &mut impl Rng) -> String {
    const FIRST: &[&str] = &[
        "Ayesha", "Rahim", "Farhana", "Tanvir", "Nusrat", "Imran", "Sadia", "Karim", "Mitu",
        "Arif",
    ];
    const LAST: &[&str] = &[
        "Rahman", "Hossain", "Akter", "Islam", "Chowdhury", "Begum", "Ahmed", "Khan",
    ];

    format!(
        "{} {}",
        FIRST.choose(rng).copied().unwrap_or("Demo"),
        LAST.choose(rng).copied().unwrap_or("User")
    )
}

fn random_gender(rng: &mut impl Rng) -> Option<String> {
    const GENDERS: &[&str] = &["male", "female", "other"];
    if rng.gen_bool(0.1) {
        return None;
    }
    GENDERS.choose(rng).map(|g| g.to_string())
}

/// Skew answers toward the low end, like real screening populations.
fn random_item(rng: &mut impl Rng) -> i64 {
    match rng.gen_range(0..100) {
        0..=44 => 0,
        45..=74 => 1,
        75..=91 => 2,
        _ => 3,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    // Ensure the default ./data folder exists so sqlite can create the DB file.
    if args.database_url.contains("./data/") {
        let _ = std::fs::create_dir_all("data");
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let mut rng = rand::thread_rng();

    for _ in 0..args.count {
        let mut response = QuestionnaireResponse::new(args.questionnaire);
        for item in 1..=args.questionnaire.item_count() {
            response = response.with_item(item, random_item(&mut rng));
        }
        let result = score(&response);

        let mut record = AssessmentRecord::new(
            NewAssessment {
                id: Uuid::new_v4().to_string(),
                full_name: random_name(&mut rng),
                age: rng.gen_range(18..=70),
                gender: random_gender(&mut rng),
                audio_key: None,
                audio_content_type: None,
            },
            &response,
            result,
        );

        let age_of_record = Duration::minutes(rng.gen_range(0..args.days * 24 * 60));
        record.created_at = (Utc::now() - age_of_record).to_rfc3339();

        db::insert_assessment(&pool, &record).await?;

        println!(
            "Inserted {} ({}, total {}, {})",
            record.id, record.full_name, record.total_score, record.severity
        );
    }

    println!("Done. Inserted {} assessments.", args.count);
    Ok(())
}
