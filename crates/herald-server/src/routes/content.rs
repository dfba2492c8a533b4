//! Content generation endpoint.

use axum::{extract::State, Json};
use herald_core::{PromptKind, StructuredContent};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GenerateTweetRequest {
    pub query: String,
}

#[derive(Serialize)]
pub struct GenerateTweetResponse {
    pub content: String,
}

/// `POST /generate-twitter-post`: tweet text with hashtags, ready for review
pub async fn generate_tweet(
    State(state): State<AppState>,
    Json(request): Json<GenerateTweetRequest>,
) -> Result<Json<GenerateTweetResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }

    let content = match state
        .generator
        .generate(PromptKind::Tweet, &request.query)
        .await?
    {
        StructuredContent::Tweet(draft) => draft.formatted(),
        other => other.preview(),
    };

    Ok(Json(GenerateTweetResponse { content }))
}
