//! Kide API client implementation

use crate::{
    error::KideError,
    types::{Envelope, ProductModel, ReservationModel, ReservationRequest, ReservedItem},
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Production API root
pub const DEFAULT_API_URL: &str = "https://api.kide.app/api";

/// Browser-like user agent; the reservation endpoint rejects bare clients
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36"
);

/// Kide API client
#[derive(Clone)]
pub struct KideClient {
    client: Client,
    token: String,
    api_url: String,
    user_agent: String,
}

impl std::fmt::Debug for KideClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KideClient")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl KideClient {
    /// Create a new client against the production API
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), token)
    }

    /// Create a client on top of a preconfigured `reqwest::Client`
    /// (timeouts, proxies)
    #[must_use]
    pub fn with_http_client(client: Client, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Point the client at another API root (staging, mock server)
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the `User-Agent` header
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// API root this client talks to
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch a product with its current variant list
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, non-200 statuses, or payloads
    /// that do not match [`ProductModel`].
    pub async fn product(&self, product_id: &str) -> Result<ProductModel, KideError> {
        tracing::trace!(product_id, "GET product");

        let response = self
            .client
            .get(format!("{}/products/{product_id}", self.api_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| KideError::RequestFailed(e.to_string()))?;

        Self::decode::<ProductModel>(response).await
    }

    /// Reserve `quantity` units of one inventory item
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, any non-200 status (sold out,
    /// conflict, over the per-user limit), or a success payload without a
    /// reservation in it.
    pub async fn reserve(
        &self,
        inventory_id: &str,
        quantity: u32,
    ) -> Result<ReservedItem, KideError> {
        tracing::trace!(inventory_id, quantity, "POST reservation");

        let response = self
            .client
            .post(format!("{}/reservations", self.api_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .json(&ReservationRequest::single(inventory_id, quantity))
            .send()
            .await
            .map_err(|e| KideError::RequestFailed(e.to_string()))?;

        Self::decode::<ReservationModel>(response)
            .await?
            .reservations
            .into_iter()
            .next()
            .ok_or(KideError::MissingField("reservations"))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, KideError> {
        match response.status() {
            StatusCode::OK => response
                .json::<Envelope<T>>()
                .await
                .map(|envelope| envelope.model)
                .map_err(|e| KideError::ResponseParseFailed(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(KideError::Unauthorized),
            StatusCode::NOT_FOUND => Err(KideError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => Err(KideError::RateLimited),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(KideError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = KideClient::new("test-token");
        assert_eq!(client.token, "test-token");
        assert_eq!(client.api_url, DEFAULT_API_URL);
        assert_eq!(client.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_api_url_trailing_slash_is_dropped() {
        let client = KideClient::new("t").with_api_url("http://localhost:9000/api/");
        assert_eq!(client.api_url(), "http://localhost:9000/api");
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = KideClient::new("secret-token");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
