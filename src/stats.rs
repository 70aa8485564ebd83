//! Aggregate statistics for the dashboard.

use crate::models::AssessmentRecord;
use crate::scoring::{Questionnaire, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

/// Age buckets shown on the dashboard: (label, min, max inclusive).
const AGE_GROUPS: [(&str, i64, i64); 5] = [
    ("18-24", 18, 24),
    ("25-34", 25, 34),
    ("35-44", 35, 44),
    ("45-54", 45, 54),
    ("55+", 55, i64::MAX),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityBucket {
    pub severity: Severity,
    pub range: &'static str,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBucket {
    pub age_group: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    pub total_tests: usize,
    pub total_audio: usize,
    pub average_phq8: f64,
    pub male_percent: f64,
    pub female_percent: f64,
    pub status_distribution: BTreeMap<String, usize>,
    pub severity_distribution: Vec<SeverityBucket>,
    pub age_distribution: Vec<AgeBucket>,
}

impl AssessmentStats {
    pub fn from_records(records: &[AssessmentRecord]) -> Self {
        let total = records.len();

        let total_audio = records.iter().filter(|r| r.audio_key.is_some()).count();

        let phq8_scores: Vec<i64> = records
            .iter()
            .filter(|r| r.questionnaire_enum() == Some(Questionnaire::Phq8))
            .map(|r| r.total_score)
            .collect();
        let average_phq8 = if phq8_scores.is_empty() {
            0.0
        } else {
            phq8_scores.iter().sum::<i64>() as f64 / phq8_scores.len() as f64
        };

        let male = records
            .iter()
            .filter(|r| gender_is(r, &["male", "m"]))
            .count();
        let female = records
            .iter()
            .filter(|r| gender_is(r, &["female", "f"]))
            .count();

        let mut status_distribution = BTreeMap::new();
        for record in records {
            *status_distribution.entry(record.status.clone()).or_insert(0) += 1;
        }

        let severity_distribution = Severity::ALL
            .into_iter()
            .map(|severity| {
                // Fall back to the stored score if the label is unrecognized.
                let count = records
                    .iter()
                    .filter(|r| {
                        r.severity_enum()
                            .unwrap_or_else(|| Severity::from_total(r.total_score.max(0) as u32))
                            == severity
                    })
                    .count();
                SeverityBucket {
                    severity,
                    range: severity.range_label(),
                    count,
                    percent: percent(count, total),
                }
            })
            .collect();

        let age_distribution = AGE_GROUPS
            .iter()
            .map(|(label, min, max)| AgeBucket {
                age_group: *label,
                count: records
                    .iter()
                    .filter(|r| r.age.is_some_and(|age| (*min..=*max).contains(&age)))
                    .count(),
            })
            .collect();

        Self {
            total_tests: total,
            total_audio,
            average_phq8: round1(average_phq8),
            male_percent: percent(male, total),
            female_percent: percent(female, total),
            status_distribution,
            severity_distribution,
            age_distribution,
        }
    }
}

fn gender_is(record: &AssessmentRecord, names: &[&str]) -> bool {
    record
        .gender
        .as_deref()
        .map(|g| g.trim().to_lowercase())
        .is_some_and(|g| names.contains(&g.as_str()))
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(count as f64 * 100.0 / total as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
