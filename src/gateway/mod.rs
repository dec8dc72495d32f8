//! HTTP Gateway
//!
//! Thin wrapper over the backend's JSON API. The gateway attaches default
//! headers and the bearer credential, parses every body as JSON and reports
//! the status. It deliberately knows nothing about sessions: deciding what a
//! 401 means is left to callers, see [`crate::profile::ProfileFetcher`].

pub mod client;
pub mod types;

pub use client::ReqwestGateway;
pub use types::{endpoints, ApiRequest, ApiResponse, GatewayError, ResponseClass};

use async_trait::async_trait;
use log::debug;

#[async_trait]
pub trait HttpGateway: Send + Sync {
    /// Send a request and parse the response body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, or an unparseable body.
    /// HTTP error statuses are returned as `Ok` and classified by the caller.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError>;

    /// Whether the backend answers its health probe with a 2xx status
    async fn check_server_connection(&self) -> bool {
        match self.send(ApiRequest::get(endpoints::HEALTH)).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!("Health check failed: {e}");
                false
            }
        }
    }
}
