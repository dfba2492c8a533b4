//! Twitter connect / disconnect / post endpoints.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use herald_core::auth::{CredentialProvider, StaticOAuth1Credentials, StoredTokenCredentials};
use herald_core::{AuthorizationRequest, CallbackParams, TokenStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Deserialize)]
pub struct PostTweetRequest {
    pub content: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// `GET /twitter/auth-url`
pub async fn auth_url(State(state): State<AppState>) -> Result<Json<AuthorizationRequest>, ApiError> {
    Ok(Json(state.oauth.begin_authorization().await?))
}

/// `GET /twitter/callback`: finish the handshake and bounce back to the frontend
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let account = state.oauth.handle_callback(params).await?;
    let target = format!(
        "{}?twitter_connected=true&user_id={}",
        state.frontend_url,
        urlencoding::encode(&account.user_id)
    );
    Ok(Redirect::to(&target))
}

/// `GET /twitter/status/{user_id}`
pub async fn status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let connected = state.store.lookup(&user_id).await?.is_some();
    Ok(Json(StatusResponse {
        connected,
        user_id: connected.then_some(user_id),
    }))
}

/// `DELETE /twitter/disconnect/{user_id}`
pub async fn disconnect(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    if !state.store.delete(&user_id).await? {
        return Err(ApiError::not_found("Twitter connection", &user_id));
    }
    info!("Disconnected Twitter user {}", user_id);
    Ok(Json(ActionResponse {
        success: true,
        message: "Twitter account disconnected".to_string(),
    }))
}

/// `POST /post-twitter-post`
pub async fn post_tweet(
    State(state): State<AppState>,
    Json(request): Json<PostTweetRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    if request.content.trim().is_empty() {
        return Err(ApiError::bad_request("Content cannot be empty"));
    }

    let provider = credential_strategy(&state, request.user_id.as_deref()).await?;
    let credential = provider.credential().await?;
    let receipt = state.poster.post(&request.content, &credential).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: match receipt.url {
            Some(url) => format!("Tweet posted successfully: {}", url),
            None => "Tweet posted successfully".to_string(),
        },
    }))
}

/// Stored token when the user id resolves, else the configured OAuth 1.0a token
async fn credential_strategy(
    state: &AppState,
    user_id: Option<&str>,
) -> Result<Box<dyn CredentialProvider>, ApiError> {
    if let Some(user_id) = user_id.filter(|id| !id.is_empty()) {
        if state.store.lookup(user_id).await?.is_some() {
            return Ok(Box::new(StoredTokenCredentials::new(state.store.clone(), user_id)));
        }
    }
    match &state.static_oauth1 {
        Some(token) => Ok(Box::new(StaticOAuth1Credentials::new(token.clone()))),
        None => Err(ApiError::unauthorized("No valid Twitter access token found")),
    }
}
