use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use smartlease_core::{RerankOutcome, SmartLeaseError};
use tokio::time::Instant;

use crate::models::SearchRequest;
use crate::state::AppState;

/// POST /hybrid-search - Full search chain:
///   1. LLM metadata extraction (degrades to no filter)
///   2. Filter compilation
///   3. Semantic + filtered retrieval, merged and boosted
///   4. LLM re-ranking with pros/cons (malformed output is returned raw)
pub async fn hybrid_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<RerankOutcome>, (StatusCode, String)> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }

    // Waiting for a slot spends the same budget as the search itself
    let deadline = Instant::now() + state.request_timeout;

    let permit = tokio::time::timeout_at(
        deadline,
        state.search_semaphore.clone().acquire_owned(),
    )
    .await;
    let _permit = match permit {
        Ok(Ok(permit)) => permit,
        _ => {
            tracing::warn!(
                "Rejecting search, no free slot within {:?}",
                state.request_timeout
            );
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Too many concurrent searches, retry later".to_string(),
            ));
        }
    };

    state
        .pipeline
        .search_until(&query, deadline)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Search failed: {e}");
            (status_for(&e), e.to_string())
        })
}

fn status_for(err: &SmartLeaseError) -> StatusCode {
    match err {
        SmartLeaseError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        SmartLeaseError::Retrieval { .. } => StatusCode::BAD_GATEWAY,
        SmartLeaseError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
