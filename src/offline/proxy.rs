use super::notify::{click_action, ClickAction, Notification, NotificationPayload, Notifier};
use super::{
    CacheController, CachedResponse, DiskCacheStore, FetchRequest, HttpNetwork, Phase, RequestMode,
    Served, SYNC_TAG,
};
use crate::errors::AppError;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, request::Parts, Method, Response, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

const MAX_BODY: usize = 1024 * 1024;
const FORWARDED_HEADERS: [header::HeaderName; 3] = [header::ACCEPT, header::ACCEPT_LANGUAGE, header::CONTENT_TYPE];

pub type LiveController = CacheController<HttpNetwork, DiskCacheStore>;

#[derive(Clone)]
pub struct ProxyState {
    pub controller: Arc<LiveController>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub open_windows: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub tag: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: Phase,
    pub generation: String,
    pub active: Option<String>,
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/__offline/status", get(status))
        .route("/__offline/push", post(push))
        .route("/__offline/click", post(click))
        .route("/__offline/sync", post(sync))
        .fallback(forward)
        .with_state(state)
}

async fn status(State(state): State<ProxyState>) -> Json<StatusResponse> {
    let controller = &state.controller;
    Json(StatusResponse {
        phase: controller.phase().await,
        generation: controller.manifest().generation.clone(),
        active: controller.active_generation().await,
    })
}

async fn push(
    State(state): State<ProxyState>,
    Json(payload): Json<NotificationPayload>,
) -> Json<Notification> {
    let notification = Notification::from(payload);
    state.notifier.show(&notification);
    Json(notification)
}

async fn click(Json(request): Json<ClickRequest>) -> Json<ClickAction> {
    Json(click_action(request.url.as_deref(), &request.open_windows))
}

async fn sync(
    State(state): State<ProxyState>,
    Json(request): Json<SyncRequest>,
) -> Result<StatusCode, AppError> {
    if request.tag != SYNC_TAG {
        return Err(AppError::bad_request(format!("unknown sync tag '{}'", request.tag)));
    }
    state.controller.sync_content().await.map_err(|err| {
        error!("background sync failed: {err}");
        AppError::bad_gateway(err.to_string())
    })?;
    Ok(StatusCode::NO_CONTENT)
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> &'a str {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

fn is_navigation(parts: &Parts) -> bool {
    header_str(parts, "sec-fetch-mode") == "navigate"
        || (parts.method == Method::GET && header_str(parts, "accept").contains("text/html"))
}

async fn forward(State(state): State<ProxyState>, request: Request) -> Result<Response<Body>, AppError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY)
        .await
        .map_err(|err| AppError::bad_request(format!("unreadable request body: {err}")))?;

    let path = parts
        .uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    let url = state
        .controller
        .resolve(path)
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let headers = FORWARDED_HEADERS
        .iter()
        .filter_map(|name| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let mode = if is_navigation(&parts) {
        RequestMode::Navigate
    } else {
        RequestMode::Other
    };
    let fetch = FetchRequest {
        method: parts.method.clone(),
        url,
        mode,
        headers,
        body: body.to_vec(),
    };

    let served = state.controller.handle(&fetch).await.map_err(|err| {
        warn!("{} {} failed: {err}", fetch.method, fetch.url);
        AppError::bad_gateway(err.to_string())
    })?;
    let source = served.source();
    match served {
        Served::PassThrough => Err(AppError::not_found("cross-origin requests are not proxied")),
        Served::Network(response) | Served::Cache(response) | Served::Fallback(response) => {
            into_response(response, source)
        }
    }
}

fn into_response(cached: CachedResponse, source: &str) -> Result<Response<Body>, AppError> {
    let mut builder = Response::builder()
        .status(cached.status)
        .header("x-xuska-source", source);
    for (name, value) in &cached.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(cached.body))
        .map_err(AppError::internal)
}

/// Refreshes the cached content file on a fixed period. The first refresh
/// happens one period after start, since install just fetched it.
pub fn spawn_sync_task(controller: Arc<LiveController>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match controller.sync_content().await {
                Ok(()) => info!("periodic content sync done"),
                Err(err) => error!("periodic content sync failed: {err}"),
            }
        }
    })
}
