//! Offline cache controller.
//!
//! Keeps exactly one named cache generation of the app's assets and answers
//! requests from it when the origin cannot be reached. Lifecycle:
//!
//! 1. [`CacheController::install`] fetches every manifest asset. Any failure
//!    aborts the install and nothing is written.
//! 2. [`CacheController::activate`] makes the new generation current and
//!    deletes every other generation in the store.
//! 3. [`CacheController::handle`] serves requests: navigations go to the
//!    network first, `/api/` calls only ever go to the network, everything
//!    else is cache-first with write-back.

pub mod network;
pub mod notify;
pub mod proxy;
pub mod store;

pub use network::{HttpNetwork, Network};
pub use store::{CacheStore, DiskCacheStore, MemoryCacheStore};

use axum::http::Method;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const ROOT_DOCUMENT: &str = "/index.html";
pub const CONTENT_ASSET: &str = "/data.json";
pub const SYNC_TAG: &str = "update-dhikr";
/// Live counter endpoints. Never read from or written to the cache.
pub const API_PREFIX: &str = "/api/";

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("{url} answered with status {status}")]
    BadStatus { url: String, status: u16 },
    #[error("invalid asset path {path:?}: {message}")]
    InvalidAsset { path: String, message: String },
    #[error("invalid cache generation name {0:?}")]
    InvalidGeneration(String),
    #[error("cache generation {0} has not been installed")]
    NotInstalled(String),
    #[error("{url} did not return valid json: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache io at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt cache index at {path:?}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Other,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Other,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Cache key: the absolute url without its fragment.
    pub fn key(&self) -> String {
        cache_key(&self.url)
    }
}

pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// False when the origin marked the response `Cache-Control: no-store`.
    pub fn is_storable(&self) -> bool {
        !self.header("cache-control").is_some_and(|value| {
            value
                .split(',')
                .any(|directive| directive.trim().eq_ignore_ascii_case("no-store"))
        })
    }
}

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// Cross-origin request the controller does not intercept.
    PassThrough,
    Network(CachedResponse),
    Cache(CachedResponse),
    /// The cached root document, served because the network failed.
    Fallback(CachedResponse),
}

impl Served {
    pub fn source(&self) -> &'static str {
        match self {
            Served::PassThrough => "pass-through",
            Served::Network(_) => "network",
            Served::Cache(_) => "cache",
            Served::Fallback(_) => "fallback",
        }
    }

    pub fn response(&self) -> Option<&CachedResponse> {
        match self {
            Served::PassThrough => None,
            Served::Network(response) | Served::Cache(response) | Served::Fallback(response) => {
                Some(response)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Installing,
    InstallFailed,
    Activated,
    Serving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheManifest {
    pub generation: String,
    pub assets: Vec<String>,
}

impl CacheManifest {
    pub fn new(generation: impl Into<String>, assets: Vec<String>) -> Self {
        Self {
            generation: generation.into(),
            assets,
        }
    }

    /// The page, its content file and every translation file.
    pub fn app_shell(generation: impl Into<String>) -> Self {
        let mut assets = vec!["/".to_string(), ROOT_DOCUMENT.to_string(), CONTENT_ASSET.to_string()];
        assets.extend(
            crate::i18n::Language::ALL
                .iter()
                .map(|lang| format!("/{}", lang.file_name())),
        );
        Self::new(generation, assets)
    }
}

#[derive(Debug)]
struct Status {
    phase: Phase,
    installed: bool,
    active: Option<String>,
}

pub struct CacheController<N, S> {
    origin: Url,
    manifest: CacheManifest,
    root_key: String,
    network: N,
    store: S,
    status: RwLock<Status>,
}

impl<N: Network, S: CacheStore> CacheController<N, S> {
    pub fn new(origin: Url, manifest: CacheManifest, network: N, store: S) -> Result<Self, OfflineError> {
        if !crate::config::is_plain_name(&manifest.generation) {
            return Err(OfflineError::InvalidGeneration(manifest.generation));
        }
        let root_key = cache_key(&resolve(&origin, ROOT_DOCUMENT)?);
        Ok(Self {
            origin,
            manifest,
            root_key,
            network,
            store,
            status: RwLock::new(Status {
                phase: Phase::Installing,
                installed: false,
                active: None,
            }),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn manifest(&self) -> &CacheManifest {
        &self.manifest
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn phase(&self) -> Phase {
        self.status.read().await.phase
    }

    pub async fn active_generation(&self) -> Option<String> {
        self.status.read().await.active.clone()
    }

    pub fn resolve(&self, path: &str) -> Result<Url, OfflineError> {
        resolve(&self.origin, path)
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Fetches the whole manifest and stores it under the new generation.
    /// Returns the number of cached assets.
    pub async fn install(&self) -> Result<usize, OfflineError> {
        {
            let mut status = self.status.write().await;
            status.phase = Phase::Installing;
            status.installed = false;
        }

        let result = self.install_assets().await;
        let mut status = self.status.write().await;
        match result {
            Ok(count) => {
                status.installed = true;
                info!("installed {count} assets into {}", self.manifest.generation);
                Ok(count)
            }
            Err(err) => {
                status.phase = Phase::InstallFailed;
                warn!("install of {} failed: {err}", self.manifest.generation);
                Err(err)
            }
        }
    }

    async fn install_assets(&self) -> Result<usize, OfflineError> {
        let mut fetched = Vec::with_capacity(self.manifest.assets.len());
        for asset in &self.manifest.assets {
            let request = FetchRequest::get(self.resolve(asset)?);
            let response = self.network.fetch(&request).await?;
            if !response.is_ok() {
                return Err(OfflineError::BadStatus {
                    url: request.url.to_string(),
                    status: response.status,
                });
            }
            fetched.push((request.key(), response));
        }

        let generation = &self.manifest.generation;
        let count = fetched.len();
        for (key, response) in fetched {
            if let Err(err) = self.store.put(generation, &key, response).await {
                // Never leave a half-written generation behind unless it is
                // the one already serving.
                if self.active_generation().await.as_deref() != Some(generation.as_str()) {
                    if let Err(cleanup) = self.store.delete(generation).await {
                        warn!("failed to drop partial generation {generation}: {cleanup}");
                    }
                }
                return Err(err);
            }
        }
        Ok(count)
    }

    /// Makes the installed generation current and deletes all others.
    /// Returns the names of the purged generations.
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let generation = self.manifest.generation.clone();
        if !self.status.read().await.installed {
            return Err(OfflineError::NotInstalled(generation));
        }

        let mut purged = Vec::new();
        for name in self.store.names().await? {
            if name != generation && self.store.delete(&name).await? {
                info!("purged cache generation {name}");
                purged.push(name);
            }
        }

        let mut status = self.status.write().await;
        status.active = Some(generation);
        status.phase = Phase::Activated;
        Ok(purged)
    }

    /// Install then activate. When the install fails, a generation that
    /// survived from an earlier run keeps serving.
    pub async fn start(&self) -> Phase {
        match self.install().await {
            Ok(_) => {
                if let Err(err) = self.activate().await {
                    warn!("activation failed: {err}");
                }
            }
            Err(_) => match self.previous_generation().await {
                Some(previous) => {
                    warn!("install failed, still serving {previous}");
                    self.status.write().await.active = Some(previous);
                }
                None => warn!("install failed and no earlier cache exists, offline support is off"),
            },
        }
        self.phase().await
    }

    async fn previous_generation(&self) -> Option<String> {
        let names = match self.store.names().await {
            Ok(names) => names,
            Err(err) => {
                warn!("failed to list cache generations: {err}");
                return None;
            }
        };
        if names.contains(&self.manifest.generation) {
            return Some(self.manifest.generation.clone());
        }
        names.into_iter().last()
    }

    async fn mark_serving(&self) {
        let mut status = self.status.write().await;
        if status.phase == Phase::Activated {
            status.phase = Phase::Serving;
        }
    }

    /// Answers one intercepted request.
    pub async fn handle(&self, request: &FetchRequest) -> Result<Served, OfflineError> {
        if !self.is_same_origin(&request.url) {
            return Ok(Served::PassThrough);
        }
        self.mark_serving().await;
        let active = self.active_generation().await;

        if request.url.path().starts_with(API_PREFIX) {
            return self.network.fetch(request).await.map(Served::Network);
        }

        if request.mode == RequestMode::Navigate {
            return match self.network.fetch(request).await {
                Ok(response) => Ok(Served::Network(response)),
                Err(err) => self.fallback(active.as_deref(), err).await,
            };
        }

        let key = request.key();
        if request.method == Method::GET {
            if let Some(generation) = active.as_deref() {
                if let Some(hit) = self.store.get(generation, &key).await? {
                    return Ok(Served::Cache(hit));
                }
            }
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if request.method == Method::GET && response.status == 200 && response.is_storable() {
                    if let Some(generation) = active.as_deref() {
                        if let Err(err) = self.store.put(generation, &key, response.clone()).await {
                            warn!("failed to cache {key}: {err}");
                        }
                    }
                }
                Ok(Served::Network(response))
            }
            Err(err) => self.fallback(active.as_deref(), err).await,
        }
    }

    async fn fallback(&self, generation: Option<&str>, err: OfflineError) -> Result<Served, OfflineError> {
        warn!("network unavailable: {err}");
        let Some(generation) = generation else {
            return Err(err);
        };
        match self.store.get(generation, &self.root_key).await? {
            Some(root) => Ok(Served::Fallback(root)),
            None => Err(err),
        }
    }

    /// Re-fetches the content file and overwrites its cache entry.
    pub async fn sync_content(&self) -> Result<(), OfflineError> {
        let generation = self
            .active_generation()
            .await
            .ok_or_else(|| OfflineError::NotInstalled(self.manifest.generation.clone()))?;

        let request = FetchRequest::get(self.resolve(CONTENT_ASSET)?);
        let url = request.url.to_string();
        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(OfflineError::BadStatus {
                url,
                status: response.status,
            });
        }

        let data: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|source| OfflineError::InvalidJson { url: url.clone(), source })?;
        let body = serde_json::to_vec(&data).map_err(|source| OfflineError::InvalidJson { url, source })?;

        self.store
            .put(&generation, &request.key(), CachedResponse::new(200, "application/json", body))
            .await?;
        info!("refreshed cached content in {generation}");
        Ok(())
    }
}

fn resolve(origin: &Url, path: &str) -> Result<Url, OfflineError> {
    origin.join(path).map_err(|err| OfflineError::InvalidAsset {
        path: path.to_string(),
        message: err.to_string(),
    })
}
