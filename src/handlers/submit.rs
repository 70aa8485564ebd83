use crate::audio::{self, DecodedAudio};
use crate::models::{AssessmentRecord, NewAssessment, SubmitResponse};
use crate::scoring::{self, QuestionnaireResponse};
use crate::{storage, AppError, AppState, Result};
use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::assessments::audio_url_for;

/// Message returned while no model scores the recordings.
const PENDING_RESULT: &str = "model is in training";

/// A submission after transport-specific parsing.
struct Submission {
    full_name: String,
    age: Value,
    gender: Option<String>,
    answers: Map<String, Value>,
    audio: Option<DecodedAudio>,
}

/// JSON submission with the recording as base64 or a data URL in `audioData`.
pub async fn submit_test(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<SubmitResponse>> {
    tracing::info!("Received JSON submission");

    let Value::Object(mut fields) = payload else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let audio = match fields.remove("audioData") {
        Some(Value::String(data)) if !data.trim().is_empty() => {
            Some(audio::decode_audio_payload(&data)?)
        }
        Some(Value::Null) | Some(Value::String(_)) | None => None,
        Some(_) => return Err(AppError::Validation("invalid base64 audio".to_string())),
    };

    let submission = Submission {
        full_name: text_field(&fields, "fullName").unwrap_or_default(),
        age: fields.remove("age").unwrap_or(Value::Null),
        gender: text_field(&fields, "gender"),
        answers: fields,
        audio,
    };

    process_submission(&state, submission).await.map(Json)
}

/// Multipart submission with the recording as an `audio` file part.
pub async fn submit_test_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>> {
    tracing::info!("Received multipart submission");

    let mut full_name = String::new();
    let mut age = Value::Null;
    let mut gender: Option<String> = None;
    let mut answers = Map::new();
    let mut audio: Option<DecodedAudio> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::Validation(format!("Failed to read form field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        tracing::debug!("Processing field: {}", name);

        match name.as_str() {
            "fullName" => {
                full_name = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read full name: {}", e))
                })?;
            }
            "age" => {
                age = Value::String(field.text().await.unwrap_or_default());
            }
            "gender" => {
                gender = Some(field.text().await.unwrap_or_default()).filter(|s| !s.is_empty());
            }
            "audio" => {
                let content_type = audio::normalize_content_type(
                    field.content_type().unwrap_or(audio::DEFAULT_CONTENT_TYPE),
                )
                .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read audio: {}", e)))?;

                if !data.is_empty() {
                    audio = Some(DecodedAudio {
                        data: data.to_vec(),
                        content_type,
                    });
                }
            }
            "audioData" => {
                let data = field.text().await.unwrap_or_default();
                if !data.trim().is_empty() {
                    audio = Some(audio::decode_audio_payload(&data)?);
                }
            }
            other if is_item_key(other) => {
                // Item answers are coerced by the scorer, never rejected here.
                let value = field.text().await.unwrap_or_default();
                answers.insert(other.to_string(), Value::String(value));
            }
            _ => {}
        }
    }

    let submission = Submission {
        full_name,
        age,
        gender,
        answers,
        audio,
    };

    process_submission(&state, submission).await.map(Json)
}

async fn process_submission(
    state: &Arc<AppState>,
    submission: Submission,
) -> Result<SubmitResponse> {
    let full_name = submission.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(AppError::Validation("fullName is required".to_string()));
    }

    let age = parse_age(&submission.age)?;
    if age < state.config.min_age {
        return Err(AppError::Validation(format!(
            "age must be at least {}",
            state.config.min_age
        )));
    }

    let test_id = Uuid::new_v4().to_string();

    let stored_audio = match submission.audio {
        Some(audio) => Some(store_audio(state, &test_id, audio).await?),
        None => None,
    };

    let response = QuestionnaireResponse::from_answers(state.config.questionnaire, &submission.answers);
    let result = scoring::score(&response);

    let record = AssessmentRecord::new(
        NewAssessment {
            id: test_id.clone(),
            full_name,
            age,
            gender: submission.gender.filter(|g| !g.trim().is_empty()),
            audio_key: stored_audio.as_ref().map(|(key, _)| key.clone()),
            audio_content_type: stored_audio.as_ref().map(|(_, ct)| ct.clone()),
        },
        &response,
        result,
    );

    if let Err(e) = state.records.insert(&record).await {
        if let Some((key, _)) = &stored_audio {
            if let Err(cleanup) = state.audio.delete(key).await {
                tracing::warn!("Failed to remove orphaned recording {}: {}", key, cleanup);
            }
        }
        return Err(e);
    }

    tracing::info!(
        "Stored assessment {} ({} total {}, {})",
        test_id,
        response.questionnaire(),
        result.total,
        result.severity
    );

    let audio_url = match &stored_audio {
        Some((key, _)) => audio_url_for(state, &test_id, key).await,
        None => None,
    };

    Ok(SubmitResponse {
        test_id,
        total_score: result.total,
        severity: result.severity,
        questionnaire: response.questionnaire(),
        status: record.status,
        result: PENDING_RESULT.to_string(),
        audio_url,
    })
}

/// Check size, optionally convert, and upload. Returns (key, content type).
async fn store_audio(
    state: &Arc<AppState>,
    test_id: &str,
    audio: DecodedAudio,
) -> Result<(String, String)> {
    if audio.data.len() as u64 > state.config.max_audio_size_bytes() {
        return Err(AppError::PayloadTooLarge(state.config.max_audio_size_mb));
    }

    let audio = if state.config.convert_audio_to_wav {
        audio::convert_to_wav(audio).await?
    } else {
        audio
    };

    let key = storage::recording_key(test_id, audio.extension());
    let size = audio.data.len();
    state
        .audio
        .put(&key, audio.data, &audio.content_type)
        .await?;

    tracing::debug!("Uploaded recording {} ({} bytes)", key, size);
    Ok((key, audio.content_type))
}

fn text_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_age(value: &Value) -> Result<i64> {
    let age = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    age.ok_or_else(|| AppError::Validation("age must be a whole number".to_string()))
}

fn is_item_key(name: &str) -> bool {
    let digits = name
        .strip_prefix("question")
        .or_else(|| name.strip_prefix('q'));
    digits.is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age(&json!(25)).unwrap(), 25);
        assert_eq!(parse_age(&json!(" 40 ")).unwrap(), 40);
        assert!(parse_age(&json!("twenty")).is_err());
        assert!(parse_age(&json!(null)).is_err());
        assert!(parse_age(&json!(25.5)).is_err());
    }

    #[test]
    fn test_is_item_key() {
        assert!(is_item_key("question1"));
        assert!(is_item_key("q8"));
        assert!(!is_item_key("question"));
        assert!(!is_item_key("quality"));
        assert!(!is_item_key("fullName"));
    }
}
