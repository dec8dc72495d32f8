use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use url::Url;

use super::types::{endpoints, ApiRequest, ApiResponse, GatewayError};
use super::HttpGateway;
use crate::settings::Settings;

/// [`HttpGateway`] backed by a pooled `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    base_url: Url,
    client: Client,
}

impl ReqwestGateway {
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url).map_err(|e| {
            warn!("Failed to parse base URL '{base_url}': {e}");
            GatewayError::InvalidEndpoint(format!("{base_url}: {e}"))
        })?;
        // Url::join replaces the last segment unless the path ends with a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base,
            client,
        })
    }

    /// # Errors
    ///
    /// See [`ReqwestGateway::new`].
    pub fn from_settings(settings: &Settings) -> Result<Self, GatewayError> {
        Self::new(&settings.api.base_url, settings.api_timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an endpoint path
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be joined onto the base URL.
    pub fn build_url(&self, endpoint: &str) -> Result<Url, GatewayError> {
        let clean_path = endpoint.trim_start_matches('/');
        self.base_url.join(clean_path).map_err(|e| {
            warn!("Failed to join URL '{}' + '{clean_path}': {e}", self.base_url);
            GatewayError::InvalidEndpoint(format!("{endpoint}: {e}"))
        })
    }

    fn request_builder(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, GatewayError> {
        let url = self.build_url(&request.endpoint)?;
        let mut builder = self.client.request(request.method.clone(), url);

        for (name, value) in request.effective_headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }
        Ok(builder)
    }
}

fn transport_error(endpoint: &str, e: &reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(format!("{endpoint}: {e}"))
    } else {
        GatewayError::Transport(format!("{endpoint}: {e}"))
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        debug!("{} {}", request.method, request.endpoint);
        let response = self
            .request_builder(&request)?
            .send()
            .await
            .map_err(|e| transport_error(&request.endpoint, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&request.endpoint, &e))?;

        let data = serde_json::from_str(&body).map_err(|e| {
            warn!(
                "Unparseable response from {} (status {status}, {} bytes)",
                request.endpoint,
                body.len()
            );
            GatewayError::MalformedResponse(format!("{}: {e}", request.endpoint))
        })?;

        debug!("{} {} -> {status}", request.method, request.endpoint);
        Ok(ApiResponse { status, data })
    }

    // Health endpoints commonly answer with plain text, so only the status counts
    async fn check_server_connection(&self) -> bool {
        let request = ApiRequest::get(endpoints::HEALTH);
        let builder = match self.request_builder(&request) {
            Ok(builder) => builder,
            Err(e) => {
                warn!("Health check not attempted: {e}");
                return false;
            }
        };
        match builder.send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", transport_error(endpoints::HEALTH, &e));
                false
            }
        }
    }
}
