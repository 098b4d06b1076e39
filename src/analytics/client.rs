//! bitsCrunch analytics REST client
//!
//! # Security
//!
//! The API key is injected as the `x-api-key` header at request time. It is
//! never logged and never included in error messages.

use async_trait::async_trait;
use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::normalize::{NormalizedRequest, ParamValue};
use crate::config::AnalyticsConfig;
use crate::{Error, Result};

const API_KEY_HEADER: &str = "x-api-key";

/// Anything that can answer a normalized analytics request.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// Fetch the raw JSON payload for `request`
    async fn fetch(&self, request: &NormalizedRequest) -> Result<Value>;
}

/// HTTP client for `GET {base_url}/nft/collection/{endpoint}`
pub struct AnalyticsClient {
    client: Client,
    base_url: String,
}

impl AnalyticsClient {
    /// Create a client from configuration
    pub fn new(config: &AnalyticsConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let api_key = config.resolve_api_key();
        if api_key.is_empty() {
            warn!("No analytics API key configured; upstream calls will be rejected");
        } else {
            let mut value = HeaderValue::from_str(&api_key)
                .map_err(|_| Error::Config("Invalid analytics API key format".to_string()))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build the full request URL. Lists become repeated keys.
    pub fn build_url(&self, request: &NormalizedRequest) -> Result<Url> {
        let raw = format!("{}/nft/collection/{}", self.base_url, request.endpoint());
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::Config(format!("Invalid analytics base URL '{raw}': {e}")))?;

        if !request.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.iter() {
                match value {
                    ParamValue::One(v) => {
                        pairs.append_pair(key, v);
                    }
                    ParamValue::Many(values) => {
                        for v in values {
                            pairs.append_pair(key, v);
                        }
                    }
                }
            }
        }

        Ok(url)
    }

    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AnalyticsApi for AnalyticsClient {
    async fn fetch(&self, request: &NormalizedRequest) -> Result<Value> {
        let url = self.build_url(request)?;
        debug!(endpoint = %request.endpoint(), url = %url, "Calling analytics API");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("analytics endpoint '{}'", request.endpoint()))
            } else {
                Error::Http(e)
            }
        })?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{EndpointName, RawParams, normalize};

    fn client() -> AnalyticsClient {
        let config = AnalyticsConfig {
            base_url: "https://api.example.com/api/v2/".to_string(),
            api_key: "literal-test-key".to_string(),
            ..Default::default()
        };
        AnalyticsClient::new(&config).unwrap()
    }

    #[test]
    fn test_build_url_defaults() {
        let request = normalize(EndpointName::Whales, &RawParams::new());
        let url = client().build_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v2/nft/collection/whales?blockchain=ethereum&offset=0&limit=30&sort_order=desc"
        );
    }

    #[test]
    fn test_build_url_repeats_list_values() {
        let request = NormalizedRequest::new(
            EndpointName::Analytics,
            vec![(
                "contract_address".to_string(),
                ParamValue::Many(vec!["0xa".to_string(), "0xb".to_string()]),
            )],
        );
        let url = client().build_url(&request).unwrap();
        assert_eq!(url.query(), Some("contract_address=0xa&contract_address=0xb"));
    }

    #[test]
    fn test_build_url_without_params() {
        let request = NormalizedRequest::new(EndpointName::Categories, Vec::new());
        let url = client().build_url(&request).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.path(), "/api/v2/nft/collection/categories");
    }
}
