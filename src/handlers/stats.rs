use crate::stats::AssessmentStats;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Dashboard statistics. A failing record store yields empty statistics
/// rather than an error so the dashboard still renders.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<AssessmentStats> {
    match state.records.list(state.config.stats_limit, 0).await {
        Ok(records) => Json(AssessmentStats::from_records(&records)),
        Err(e) => {
            tracing::error!("Failed to load records for stats: {}", e);
            Json(AssessmentStats::from_records(&[]))
        }
    }
}
