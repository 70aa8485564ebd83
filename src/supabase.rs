//! Managed record storage over the Supabase PostgREST API.

use crate::models::AssessmentRecord;
use crate::{AppError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

#[derive(Clone, Debug)]
pub struct SupabaseClient {
    http: reqwest::Client,
    table_url: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, service_role_key: &str, table: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(service_role_key)
            .map_err(|_| AppError::Internal("Invalid Supabase service role key".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", service_role_key))
            .map_err(|_| AppError::Internal("Invalid Supabase service role key".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            table_url: table_url(base_url, table),
        })
    }

    pub async fn insert(&self, record: &AssessmentRecord) -> Result<()> {
        let response = self
            .http
            .post(&self.table_url)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<AssessmentRecord>> {
        let id_filter = format!("eq.{}", id);
        let response = self
            .http
            .get(&self.table_url)
            .query(&[("select", "*"), ("id", id_filter.as_str()), ("limit", "1")])
            .send()
            .await?;

        let rows: Vec<AssessmentRecord> = ensure_success(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    /// Newest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<AssessmentRecord>> {
        let response = self
            .http
            .get(&self.table_url)
            .query(&[
                ("select", "*".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::RecordStore(format!(
        "PostgREST returned {}: {}",
        status, body
    )))
}
