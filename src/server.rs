//! Server initialization and the `/match` route

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snapmatch_vision::clip;

use crate::decode;
use crate::error::{ServiceError, ServiceResult};
use crate::fetch;
use crate::matcher::{BestMatch, Outcome};
use crate::state::AppState;

/// Match request body
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Base64-encoded upload, optionally data-URL prefixed
    pub image: String,

    /// Candidates, scanned in order
    pub items: Vec<CandidateItem>,
}

/// One catalog entry to compare the upload against
#[derive(Debug, Deserialize)]
pub struct CandidateItem {
    #[serde(rename = "_id")]
    pub id: String,

    /// Remote image URL; absent or empty means the candidate is skipped
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

/// Match response body
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(rename = "matchId")]
    pub match_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl From<Outcome> for MatchResponse {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Match { id, confidence } => Self {
                match_id: Some(id),
                confidence: Some(confidence),
            },
            Outcome::NoMatch => Self {
                match_id: None,
                confidence: None,
            },
        }
    }
}

/// Match an uploaded image against candidate items.
///
/// Candidates are fetched and embedded strictly in sequence. The first
/// fetch or decode failure aborts the whole request; candidates without an
/// image URL are skipped and never become the best match.
pub async fn match_item(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchRequest>,
) -> ServiceResult<Json<MatchResponse>> {
    let uploaded = decode::image_from_base64(&request.image)?;
    let query = state.encoder.encode(&uploaded)?;

    let mut best = BestMatch::new();
    for item in &request.items {
        let url = match item.image_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => {
                debug!("candidate {} has no image url, skipping", item.id);
                continue;
            }
        };

        let img = fetch::fetch_image(&state.http, url)
            .await
            .map_err(|source| ServiceError::Fetch {
                url: url.to_string(),
                source,
            })?;
        let candidate = state.encoder.encode(&img)?;

        let score = clip::match_embedding(&query, &candidate);
        debug!("candidate {} scored {:.3}", item.id, score);
        best.observe(&item.id, score);
    }

    Ok(Json(best.into_outcome(state.config.threshold).into()))
}

/// Build the router with shared state attached
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/match", post(match_item))
        .with_state(state)
}

/// Run the HTTP service until Ctrl+C or SIGTERM
pub async fn start_server(state: Arc<AppState>, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {bind}"))?;

    let threshold = state.config.threshold;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {} (threshold: {:.2})", addr, threshold);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
