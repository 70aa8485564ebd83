use crate::config::{Config, RecordBackend};
use crate::models::AssessmentRecord;
use crate::supabase::SupabaseClient;
use crate::{db, AppError, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Assessment persistence, chosen once at startup.
#[derive(Clone, Debug)]
pub enum RecordStore {
    Sqlite(SqlitePool),
    Supabase(SupabaseClient),
}

impl RecordStore {
    /// Connect to the configured backend. SQLite migrations run here.
    pub async fn connect(config: &Config) -> Result<Self> {
        match config.record_store {
            RecordBackend::Sqlite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect(&config.database_url)
                    .await?;
                db::run_migrations(&pool).await?;
                Ok(RecordStore::Sqlite(pool))
            }
            RecordBackend::Supabase => {
                let (Some(url), Some(key)) = (
                    config.supabase_url.as_deref(),
                    config.supabase_service_role_key.as_deref(),
                ) else {
                    return Err(AppError::Internal(
                        "Supabase credentials are not configured".to_string(),
                    ));
                };
                Ok(RecordStore::Supabase(SupabaseClient::new(
                    url,
                    key,
                    &config.supabase_table,
                )?))
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            RecordStore::Sqlite(_) => "sqlite",
            RecordStore::Supabase(_) => "supabase",
        }
    }

    pub async fn insert(&self, record: &AssessmentRecord) -> Result<()> {
        match self {
            RecordStore::Sqlite(pool) => Ok(db::insert_assessment(pool, record).await?),
            RecordStore::Supabase(client) => client.insert(record).await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<AssessmentRecord>> {
        match self {
            RecordStore::Sqlite(pool) => Ok(db::get_assessment(pool, id).await?),
            RecordStore::Supabase(client) => client.get(id).await,
        }
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AssessmentRecord>> {
        match self {
            RecordStore::Sqlite(pool) => Ok(db::list_assessments(pool, limit, offset).await?),
            RecordStore::Supabase(client) => client.list(limit, offset).await,
        }
    }
}
