use super::{CachedResponse, FetchRequest, OfflineError};
use reqwest::{header::HeaderName, redirect::Policy, Client};
use std::future::Future;

// Connection-level headers that must not be replayed from a cached copy.
const HOP_BY_HOP: [&str; 5] = [
    "connection",
    "keep-alive",
    "transfer-encoding",
    "content-length",
    "upgrade",
];

pub trait Network: Send + Sync {
    /// Performs the request. Any HTTP status is a successful fetch; only
    /// transport failures are errors.
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<CachedResponse, OfflineError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self, OfflineError> {
        // Redirects go back to the browser untouched.
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|err| OfflineError::Network {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse, OfflineError> {
        let failed = |err: reqwest::Error| OfflineError::Network {
            url: request.url.to_string(),
            message: err.to_string(),
        };

        let mut builder = self.client.request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            if let Ok(name) = HeaderName::try_from(name.as_str()) {
                builder = builder.header(name, value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(failed)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !HOP_BY_HOP.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(failed)?.to_vec();

        Ok(CachedResponse { status, headers, body })
    }
}
