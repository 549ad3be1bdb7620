//! Transaction API access
//!
//! Request/response types for the paginated open-data endpoint and the
//! [`PageFetcher`] seam the pagination controller drives.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{ApiRequest, ApiResponse, QueryParams, DEFAULT_USER_AGENT};

use crate::error::Result;
use async_trait::async_trait;

/// Issues one GET per request and returns the raw response
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a single page.
    ///
    /// Returns the body only for HTTP 200; any other status is an
    /// [`EtlError::Connection`](crate::EtlError::Connection) and transport
    /// faults surface as [`EtlError::Transport`](crate::EtlError::Transport).
    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse> {
        (**self).fetch(request).await
    }
}
