use crate::scoring::{Questionnaire, QuestionnaireResponse, ScoreResult, Severity};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Status every new submission starts in.
pub const STATUS_PENDING: &str = "pending";

/// A persisted assessment. Field names match the SQLite columns and the
/// PostgREST table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AssessmentRecord {
    pub id: String,
    pub full_name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub questionnaire: String,

    pub question1: Option<i64>,
    pub question2: Option<i64>,
    pub question3: Option<i64>,
    pub question4: Option<i64>,
    pub question5: Option<i64>,
    pub question6: Option<i64>,
    pub question7: Option<i64>,
    pub question8: Option<i64>,

    pub total_score: i64,
    pub severity: String,

    pub audio_key: Option<String>,
    pub audio_content_type: Option<String>,

    pub status: String,
    pub model_result: Option<String>,
    pub created_at: String,
}

/// Everything needed to create a record besides the score.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub id: String,
    pub full_name: String,
    pub age: i64,
    pub gender: Option<String>,
    pub audio_key: Option<String>,
    pub audio_content_type: Option<String>,
}

impl AssessmentRecord {
    pub fn new(
        submission: NewAssessment,
        response: &QuestionnaireResponse,
        score: ScoreResult,
    ) -> Self {
        let item = |i: u8| -> Option<i64> {
            (i <= response.questionnaire().item_count()).then(|| i64::from(response.item(i)))
        };

        Self {
            id: submission.id,
            full_name: submission.full_name,
            age: Some(submission.age),
            gender: submission.gender,
            questionnaire: response.questionnaire().as_str().to_string(),
            question1: item(1),
            question2: item(2),
            question3: item(3),
            question4: item(4),
            question5: item(5),
            question6: item(6),
            question7: item(7),
            question8: item(8),
            total_score: i64::from(score.total),
            severity: score.severity.as_str().to_string(),
            audio_key: submission.audio_key,
            audio_content_type: submission.audio_content_type,
            status: STATUS_PENDING.to_string(),
            model_result: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn questionnaire_enum(&self) -> Option<Questionnaire> {
        Questionnaire::from_str(&self.questionnaire)
    }

    pub fn severity_enum(&self) -> Option<Severity> {
        Severity::from_str(&self.severity)
    }

    /// Answered items keyed `question{i}`.
    pub fn answers(&self) -> BTreeMap<String, i64> {
        [
            self.question1,
            self.question2,
            self.question3,
            self.question4,
            self.question5,
            self.question6,
            self.question7,
            self.question8,
        ]
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (format!("question{}", i + 1), v)))
        .collect()
    }
}

/// API view of a record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub id: String,
    pub full_name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub questionnaire: String,
    pub answers: BTreeMap<String, i64>,
    pub total_score: i64,
    pub severity: String,
    pub has_audio: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub status: String,
    pub model_result: Option<String>,
    pub created_at: String,
}

impl AssessmentResponse {
    pub fn from_record(record: AssessmentRecord, audio_url: Option<String>) -> Self {
        let answers = record.answers();
        Self {
            id: record.id,
            full_name: record.full_name,
            age: record.age,
            gender: record.gender,
            questionnaire: record.questionnaire,
            answers,
            total_score: record.total_score,
            severity: record.severity,
            has_audio: record.audio_key.is_some(),
            audio_url,
            status: record.status,
            model_result: record.model_result,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub test_id: String,
    pub total_score: u32,
    pub severity: Severity,
    pub questionnaire: Questionnaire,
    pub status: String,
    pub result: String,
    pub audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
