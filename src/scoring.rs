//! PHQ questionnaire scoring.
//!
//! Each item is answered on a 4-point frequency scale (0 = not at all,
//! 3 = nearly every day). The total is the plain sum of the items and maps to
//! a severity bucket through fixed thresholds. Malformed answers never fail a
//! submission: they contribute 0.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Highest value a single item can take.
pub const MAX_ITEM_VALUE: u8 = 3;

/// Which questionnaire a submission answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Questionnaire {
    /// Full eight-item PHQ-8.
    Phq8,
    /// Abbreviated three-item screener.
    Phq3,
}

impl Questionnaire {
    pub fn item_count(&self) -> u8 {
        match self {
            Questionnaire::Phq8 => 8,
            Questionnaire::Phq3 => 3,
        }
    }

    pub fn max_total(&self) -> u32 {
        u32::from(self.item_count()) * u32::from(MAX_ITEM_VALUE)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Questionnaire::Phq8 => "phq8",
            Questionnaire::Phq3 => "phq3",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "phq8" => Some(Questionnaire::Phq8),
            "phq3" => Some(Questionnaire::Phq3),
            _ => None,
        }
    }
}

impl fmt::Display for Questionnaire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity bucket for a total score.
///
/// Both questionnaire variants share the same thresholds, so the three-item
/// variant (max 9) never reaches `ModeratelySevere` or `Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Minimal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

impl Severity {
    /// All buckets in ascending order.
    pub const ALL: [Severity; 5] = [
        Severity::Minimal,
        Severity::Mild,
        Severity::Moderate,
        Severity::ModeratelySevere,
        Severity::Severe,
    ];

    pub fn from_total(total: u32) -> Self {
        match total {
            0..=4 => Severity::Minimal,
            5..=9 => Severity::Mild,
            10..=14 => Severity::Moderate,
            15..=19 => Severity::ModeratelySevere,
            _ => Severity::Severe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minimal => "minimal",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::ModeratelySevere => "moderately-severe",
            Severity::Severe => "severe",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Severity::ALL.into_iter().find(|sev| sev.as_str() == s)
    }

    /// Inclusive score range of the bucket, as shown to users.
    pub fn range_label(&self) -> &'static str {
        match self {
            Severity::Minimal => "0-4",
            Severity::Mild => "5-9",
            Severity::Moderate => "10-14",
            Severity::ModeratelySevere => "15-19",
            Severity::Severe => "20-24",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coerce a raw answer to an item value.
///
/// Integers and integer strings are accepted, floats are truncated. Anything
/// non-numeric or outside `0..=3` yields 0.
pub fn coerce_item(value: &Value) -> u8 {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if (0..=i64::from(MAX_ITEM_VALUE)).contains(&v) => v as u8,
        _ => 0,
    }
}

/// Answers for one questionnaire, keyed by item number `1..=K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireResponse {
    questionnaire: Questionnaire,
    items: BTreeMap<u8, u8>,
}

impl QuestionnaireResponse {
    pub fn new(questionnaire: Questionnaire) -> Self {
        Self {
            questionnaire,
            items: BTreeMap::new(),
        }
    }

    /// Set an item. Out-of-range item numbers are ignored, invalid values
    /// are stored as 0.
    pub fn with_item(mut self, item: u8, value: i64) -> Self {
        if (1..=self.questionnaire.item_count()).contains(&item) {
            self.items.insert(item, coerce_item(&Value::from(value)));
        }
        self
    }

    /// Build from submitted form fields.
    ///
    /// Items may be keyed `question{i}` or `q{i}`; `question{i}` takes
    /// precedence when both are present. Other keys are ignored.
    pub fn from_answers(questionnaire: Questionnaire, answers: &Map<String, Value>) -> Self {
        let items = (1..=questionnaire.item_count())
            .filter_map(|i| {
                answers
                    .get(&format!("question{}", i))
                    .or_else(|| answers.get(&format!("q{}", i)))
                    .map(|raw| (i, coerce_item(raw)))
            })
            .collect();

        Self {
            questionnaire,
            items,
        }
    }

    pub fn questionnaire(&self) -> Questionnaire {
        self.questionnaire
    }

    /// Value of an item, 0 when it was not answered.
    pub fn item(&self, item: u8) -> u8 {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Item values in order, one per item of the questionnaire.
    pub fn values(&self) -> Vec<u8> {
        (1..=self.questionnaire.item_count())
            .map(|i| self.item(i))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub total: u32,
    pub severity: Severity,
}

pub fn score(response: &QuestionnaireResponse) -> ScoreResult {
    let total = response.values().into_iter().map(u32::from).sum();
    ScoreResult {
        total,
        severity: Severity::from_total(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn phq8_with_total(total: u32) -> QuestionnaireResponse {
        let mut remaining = total as i64;
        let mut response = QuestionnaireResponse::new(Questionnaire::Phq8);
        for i in 1..=8 {
            let v = remaining.min(3);
            response = response.with_item(i, v);
            remaining -= v;
        }
        assert_eq!(remaining, 0);
        response
    }

    #[test]
    fn test_scores_mild_example() {
        let input = answers(json!({
            "question1": 1, "question2": 2, "question3": 1, "question4": 0,
            "question5": 1, "question6": 0, "question7": 0, "question8": 1
        }));
        let result = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq8, &input));
        assert_eq!(result.total, 6);
        assert_eq!(result.severity, Severity::Mild);
    }

    #[test]
    fn test_all_threes_is_severe() {
        let input = answers(json!({
            "question1": 3, "question2": 3, "question3": 3, "question4": 3,
            "question5": 3, "question6": 3, "question7": 3, "question8": 3
        }));
        let result = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq8, &input));
        assert_eq!(result.total, 24);
        assert_eq!(result.severity, Severity::Severe);
    }

    #[test]
    fn test_three_item_variant_keeps_shared_thresholds() {
        let input = answers(json!({ "question1": 3, "question2": 3, "question3": 3 }));
        let result = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq3, &input));
        assert_eq!(result.total, 9);
        assert_eq!(result.severity, Severity::Mild);
        assert_eq!(Questionnaire::Phq3.max_total(), 9);
    }

    #[test]
    fn test_threshold_boundaries() {
        let cases = [
            (0, Severity::Minimal),
            (4, Severity::Minimal),
            (5, Severity::Mild),
            (9, Severity::Mild),
            (10, Severity::Moderate),
            (14, Severity::Moderate),
            (15, Severity::ModeratelySevere),
            (19, Severity::ModeratelySevere),
            (20, Severity::Severe),
            (24, Severity::Severe),
        ];
        for (total, expected) in cases {
            let result = score(&phq8_with_total(total));
            assert_eq!(result.total, total);
            assert_eq!(result.severity, expected, "total {}", total);
        }
    }

    #[test]
    fn test_total_is_sum_within_range() {
        // Every combination of values 0..=3 for both variants.
        for a in 0..=3 {
            for b in 0..=3 {
                for c in 0..=3 {
                    let response = QuestionnaireResponse::new(Questionnaire::Phq3)
                        .with_item(1, a)
                        .with_item(2, b)
                        .with_item(3, c);
                    let result = score(&response);
                    assert_eq!(result.total, (a + b + c) as u32);
                    assert!(result.total <= Questionnaire::Phq3.max_total());
                }
            }
        }

        for code in 0..4i64.pow(8) {
            // Base-4 digits of `code` are the eight item values.
            let values: Vec<i64> = (0..8).map(|i| (code >> (2 * i)) & 3).collect();
            let mut response = QuestionnaireResponse::new(Questionnaire::Phq8);
            for (i, v) in values.iter().enumerate() {
                response = response.with_item(i as u8 + 1, *v);
            }
            let result = score(&response);
            assert_eq!(result.total as i64, values.iter().sum::<i64>());
            assert!(result.total <= Questionnaire::Phq8.max_total());
        }
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let response = phq8_with_total(13);
        assert_eq!(score(&response), score(&response));
    }

    #[test]
    fn test_missing_item_equals_zero() {
        let full = answers(json!({
            "question1": 2, "question2": 0, "question3": 3, "question4": 1,
            "question5": 0, "question6": 2, "question7": 1, "question8": 3
        }));
        for i in 1..=8 {
            let key = format!("question{}", i);
            let mut zeroed = full.clone();
            zeroed.insert(key.clone(), json!(0));
            let mut missing = full.clone();
            missing.remove(&key);

            let with_zero = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq8, &zeroed));
            let without = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq8, &missing));
            assert_eq!(with_zero, without);
        }
    }

    #[test]
    fn test_non_numeric_item_equals_zero() {
        let base = answers(json!({ "question1": 3, "question2": 2, "question3": 1 }));
        let mut zeroed = base.clone();
        zeroed.insert("question2".into(), json!(0));
        let expected = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq3, &zeroed));

        for junk in [json!("often"), json!(null), json!(true), json!([1]), json!({"v": 1}), json!("2.5")] {
            let mut input = base.clone();
            input.insert("question2".into(), junk.clone());
            let result = score(&QuestionnaireResponse::from_answers(Questionnaire::Phq3, &input));
            assert_eq!(result, expected, "value {}", junk);
        }
    }

    #[test]
    fn test_coerce_item() {
        assert_eq!(coerce_item(&json!(2)), 2);
        assert_eq!(coerce_item(&json!("3")), 3);
        assert_eq!(coerce_item(&json!(" 1 ")), 1);
        assert_eq!(coerce_item(&json!(2.9)), 2);
        assert_eq!(coerce_item(&json!(-1)), 0);
        assert_eq!(coerce_item(&json!(4)), 0);
        assert_eq!(coerce_item(&json!("")), 0);
        assert_eq!(coerce_item(&json!(null)), 0);
    }

    #[test]
    fn test_short_keys_match_long_keys() {
        let long = answers(json!({ "question1": 1, "question2": 2, "question3": 3 }));
        let short = answers(json!({ "q1": 1, "q2": 2, "q3": 3 }));
        assert_eq!(
            QuestionnaireResponse::from_answers(Questionnaire::Phq3, &long),
            QuestionnaireResponse::from_answers(Questionnaire::Phq3, &short)
        );

        let both = answers(json!({ "question1": 3, "q1": 0 }));
        let response = QuestionnaireResponse::from_answers(Questionnaire::Phq3, &both);
        assert_eq!(response.item(1), 3);
    }

    #[test]
    fn test_items_beyond_variant_are_ignored() {
        let input = answers(json!({ "question1": 1, "question4": 3, "question8": 3 }));
        let response = QuestionnaireResponse::from_answers(Questionnaire::Phq3, &input);
        assert_eq!(response.values(), vec![1, 0, 0]);
        assert_eq!(score(&response).total, 1);
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(
            serde_json::to_string(&Severity::ModeratelySevere).unwrap(),
            "\"moderately-severe\""
        );
        for sev in Severity::ALL {
            assert_eq!(Severity::from_str(sev.as_str()), Some(sev));
        }
        assert_eq!(Questionnaire::from_str("PHQ8"), Some(Questionnaire::Phq8));
        assert_eq!(Questionnaire::from_str("phq9"), None);
    }
}
