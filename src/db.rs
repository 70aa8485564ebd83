use crate::models::AssessmentRecord;
use sqlx::Row;
use sqlx::SqlitePool;

async fn add_column_if_missing(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), sqlx::Error> {
    let pragma = format!("PRAGMA table_info({})", table);
    let rows = sqlx::query(&pragma).fetch_all(pool).await?;

    let exists = rows.iter().any(|row| {
        let name: String = row.get("name");
        name == column
    });

    if exists {
        return Ok(());
    }

    let alter = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl);
    sqlx::query(&alter).execute(pool).await?;
    Ok(())
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            age INTEGER,
            questionnaire TEXT NOT NULL DEFAULT 'phq8',

            question1 INTEGER,
            question2 INTEGER,
            question3 INTEGER,
            question4 INTEGER,
            question5 INTEGER,
            question6 INTEGER,
            question7 INTEGER,
            question8 INTEGER,

            total_score INTEGER NOT NULL,
            severity TEXT NOT NULL,

            audio_key TEXT,

            status TEXT NOT NULL DEFAULT 'pending',
            model_result TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Backfill schema for databases created before these columns existed.
    add_column_if_missing(pool, "assessments", "gender", "TEXT").await?;
    add_column_if_missing(pool, "assessments", "audio_content_type", "TEXT").await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assessments_created_at ON assessments(created_at)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

pub async fn insert_assessment(
    pool: &SqlitePool,
    record: &AssessmentRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO assessments (
            id, full_name, age, gender, questionnaire,
            question1, question2, question3, question4,
            question5, question6, question7, question8,
            total_score, severity, audio_key, audio_content_type,
            status, model_result, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.full_name)
    .bind(record.age)
    .bind(&record.gender)
    .bind(&record.questionnaire)
    .bind(record.question1)
    .bind(record.question2)
    .bind(record.question3)
    .bind(record.question4)
    .bind(record.question5)
    .bind(record.question6)
    .bind(record.question7)
    .bind(record.question8)
    .bind(record.total_score)
    .bind(&record.severity)
    .bind(&record.audio_key)
    .bind(&record.audio_content_type)
    .bind(&record.status)
    .bind(&record.model_result)
    .bind(&record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_assessment(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AssessmentRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM assessments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Newest first.
pub async fn list_assessments(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<AssessmentRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM assessments ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
