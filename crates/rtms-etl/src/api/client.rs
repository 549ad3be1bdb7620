//! HTTP client for the transaction API

use super::{ApiRequest, ApiResponse, PageFetcher};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

/// Message carried by [`EtlError::Connection`] for non-200 answers
pub const CONNECTION_ERROR_MESSAGE: &str = "API connection error";

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Create a client; `timeout` of `None` waits indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl PageFetcher for ApiClient {
    #[instrument(skip(self, request), fields(url = %request.url, page = request.params.page_no))]
    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.get(&request.url).query(&request.params.to_query());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "API answered with non-200 status");
            return Err(EtlError::Connection {
                status: status.as_u16(),
                message: CONNECTION_ERROR_MESSAGE.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched page");

        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::QueryParams;

    #[test]
    fn test_api_client_creation() {
        assert!(ApiClient::new(None).is_ok());
        assert!(ApiClient::new(Some(Duration::from_secs(30))).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = ApiClient::new(Some(Duration::from_secs(5))).unwrap();
        let request = ApiRequest::new(
            "http://127.0.0.1:9/trades",
            QueryParams::new("key", 10, "11110", "202301"),
        );

        let err = client.fetch(&request).await.unwrap_err();
        assert!(matches!(err, EtlError::Transport(_)));
    }
}
