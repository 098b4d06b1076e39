//! Dispatch: validated endpoint + normalized parameters + upstream fetch.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::router::RoutedQuery;
use crate::analytics::{AnalyticsApi, EndpointName, NormalizedRequest, normalize, params_from_json};
use crate::{Error, Result};

/// Raw analytics payload and the endpoint that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// Endpoint that was queried
    pub endpoint: EndpointName,
    /// Provider payload, untouched
    pub data: Value,
}

/// Turns a routing decision into an analytics call.
pub struct Dispatcher {
    api: Arc<dyn AnalyticsApi>,
}

impl Dispatcher {
    /// Create a dispatcher over `api`
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self { api }
    }

    /// Validate the endpoint name and normalize parameters. No I/O.
    pub fn prepare(routed: &RoutedQuery) -> Result<NormalizedRequest> {
        let name = routed.endpoint.as_deref().unwrap_or("undefined");
        let endpoint: EndpointName = name.parse().map_err(|_| {
            warn!(endpoint = %name, "Router named an unsupported endpoint");
            Error::UnsupportedEndpoint(name.to_string())
        })?;

        let raw = params_from_json(&routed.query_params);
        Ok(normalize(endpoint, &raw))
    }

    /// Run the routed query against the analytics provider
    pub async fn dispatch(&self, routed: &RoutedQuery) -> Result<Dispatched> {
        let request = Self::prepare(routed)?;
        let endpoint = request.endpoint();
        info!(endpoint = %endpoint, params = request.len(), "Dispatching to analytics endpoint");

        let data = self.api.fetch(&request).await.inspect_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Analytics request failed");
        })?;

        Ok(Dispatched { endpoint, data })
    }
}
