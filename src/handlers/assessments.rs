use crate::audio;
use crate::models::{AssessmentResponse, ListQuery};
use crate::storage::AudioStore;
use crate::{AppError, AppState, Result};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Where a client can fetch a stored recording: a signed URL for object
/// storage, the audio endpoint for local storage.
pub async fn audio_url_for(state: &Arc<AppState>, id: &str, key: &str) -> Option<String> {
    match state.audio.signed_url(key).await {
        Ok(Some(url)) => Some(url),
        Ok(None) => Some(format!("/api/assessments/{}/audio", id)),
        Err(e) => {
            tracing::warn!("Could not sign URL for {}: {}", key, e);
            None
        }
    }
}

pub async fn list_assessments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AssessmentResponse>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let records = state.records.list(limit, offset).await?;

    // Listing does not sign URLs; fetch a single record for that.
    let response = records
        .into_iter()
        .map(|record| AssessmentResponse::from_record(record, None))
        .collect();

    Ok(Json(response))
}

pub async fn get_assessment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AssessmentResponse>> {
    let record = state
        .records
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let audio_url = match &record.audio_key {
        Some(key) => audio_url_for(&state, &record.id, key).await,
        None => None,
    };

    Ok(Json(AssessmentResponse::from_record(record, audio_url)))
}

pub async fn get_assessment_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let record = state
        .records
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assessment not found".to_string()))?;

    let key = record
        .audio_key
        .ok_or_else(|| AppError::NotFound("Assessment has no recording".to_string()))?;

    match &state.audio {
        AudioStore::LocalDisk(store) => {
            let file = store.open(&key).await?;
            // Rows written before intake normalization may hold any type.
            let content_type = match record.audio_content_type.as_deref() {
                Some(stored) => audio::normalize_content_type(stored),
                None => audio::normalize_content_type(
                    mime_guess::from_path(&key)
                        .first_raw()
                        .unwrap_or(audio::DEFAULT_CONTENT_TYPE),
                ),
            };
            let filename = key.rsplit('/').next().unwrap_or(&key);

            let body = Body::from_stream(ReaderStream::new(file));
            Ok((
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{}\"", filename),
                    ),
                ],
                body,
            )
                .into_response())
        }
        AudioStore::ObjectStore(_) => {
            let url = state
                .audio
                .signed_url(&key)
                .await?
                .ok_or_else(|| AppError::Internal("Object store returned no URL".to_string()))?;
            Ok(Redirect::temporary(&url).into_response())
        }
    }
}
