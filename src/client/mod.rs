// Blocking JSON-over-HTTP client shared by the external service integrations


use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(#[from] ureq::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thin wrapper over a `ureq` agent that speaks JSON to one base URL.
///
/// Non-success statuses are returned as [`ClientError::Status`] with the response
/// body attached. Nothing is retried.
#[derive(Debug, Clone)]
pub struct JsonClient {
    base_url: Url,
    agent: ureq::Agent,
    headers: Vec<(&'static str, String)>,
}

impl JsonClient {
    #[inline]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;

        // Relative joins replace the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            base_url,
            agent,
            headers: Vec::new(),
        })
    }

    /// Send this header with every request
    #[inline]
    pub fn with_header(mut self, name: &'static str, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path relative to the base URL
    #[inline]
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    #[inline]
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let request = self.apply_headers(self.agent.get(url.as_str()));
        Self::read_json(request.call())
    }

    #[inline]
    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        debug!("DELETE {}", url);

        let request = self.apply_headers(self.agent.delete(url.as_str()));
        Self::read_json(request.call())
    }

    #[inline]
    pub fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let body = serde_json::to_string(body)?;
        debug!("POST {} ({} bytes)", url, body.len());

        let request = self
            .apply_headers(self.agent.post(url.as_str()))
            .header("Content-Type", "application/json");
        Self::read_json(request.send(body.as_str()))
    }

    #[inline]
    pub fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(path)?;
        let body = serde_json::to_string(body)?;
        debug!("PUT {} ({} bytes)", url, body.len());

        let request = self
            .apply_headers(self.agent.put(url.as_str()))
            .header("Content-Type", "application/json");
        Self::read_json(request.send(body.as_str()))
    }

    fn apply_headers<B>(&self, mut request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        for (name, value) in &self.headers {
            request = request.header(*name, value.as_str());
        }
        request
    }

    fn read_json<T: DeserializeOwned>(
        result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<T, ClientError> {
        let mut response = result.inspect_err(|e| warn!("Transport error: {}", e))?;
        let status = response.status();
        let body = response.body_mut().read_to_string()?;

        if !status.is_success() {
            warn!("Upstream returned HTTP {}", status.as_u16());
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
