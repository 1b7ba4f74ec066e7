use axum::{
    extract::{Query, State},
    http::{header, Method},
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use reqwest::{Client, Url};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::fetcher::StatusFetcher;
use crate::normalize::Normalizer;

const AVATAR_USER_AGENT: &str = "RadioHabblive-Player/1.0";

#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    pub fetcher: Arc<StatusFetcher>,
    pub normalizer: Arc<Normalizer>,
    pub avatar_api_url: String,
    pub page: Arc<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(player_page))
        .route("/api/status", get(radio_status))
        .route("/api/habbo", get(habbo_user))
        .route("/health", get(|| async { "OK" }))
        .layer(cors)
        .with_state(state)
}

async fn player_page(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_str().to_owned())
}

/// Scrapes the upstream status pages and answers with the normalized schema.
async fn radio_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let resolved = state.fetcher.fetch().await.map_err(|e| {
        warn!("Radio status unavailable: {} ({})", e, e.detail());
        e
    })?;
    let status = state.normalizer.normalize(&resolved.fields, &resolved.source);
    let fields = &resolved.fields;
    debug!(
        "Status from {} ({}): {} with {} of {:?} listeners (peak {:?}, unique {:?})",
        resolved.source,
        resolved.format,
        status.locutor,
        status.unicos,
        fields.max_listeners,
        fields.peak_listeners,
        fields.unique_listeners
    );

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(status)))
}

/// Proxies the avatar lookup. Any upstream failure degrades to a stub object.
async fn habbo_user(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let nick = params
        .get("nick")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("Nick parameter is required"))?;

    match lookup_avatar(&state.client, &state.avatar_api_url, nick).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => {
            warn!("Avatar lookup for {} failed: {:#}", nick, e);
            Ok(Json(serde_json::json!({ "avatar": null, "nickname": nick })))
        }
    }
}

async fn lookup_avatar(client: &Client, base_url: &str, nick: &str) -> anyhow::Result<Value> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("avatar API URL cannot carry a path: {}", base_url))?
        .pop_if_empty()
        .push(nick);

    let user = client
        .get(url)
        .header(header::USER_AGENT, AVATAR_USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;

    Ok(user)
}
