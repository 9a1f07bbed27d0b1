//! Clients for the third-party APIs behind the dashboard cards.
//!
//! Each client validates the provider's JSON into the typed records from
//! `dashboard_types` before anything else sees it.

pub mod auth;
pub mod calendar;
pub mod transport;
pub mod weather;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::{DashboardError, DashboardResult};

pub use auth::{Authenticator, Token};
pub use calendar::CalendarClient;
pub use transport::TransportClient;
pub use weather::WeatherClient;

/// A source of data for one card
#[async_trait]
pub trait Provider: Send + Sync {
    type Output: Send;

    /// Short name used in logs and validation errors
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> DashboardResult<Self::Output>;
}

/// Send `request`, turning non-success statuses into [`DashboardError::Http`].
pub(crate) async fn send_checked(request: RequestBuilder) -> DashboardResult<Response> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::debug!("Request to {} failed with {}", response.url(), status);
        return Err(DashboardError::http(status));
    }
    Ok(response)
}

/// Read the body of `response` as `T`; shape mismatches become validation errors.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> DashboardResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| DashboardError::validation(provider, e.to_string()))
}
