//! Collection analytics: endpoint table, parameter normalization and the
//! upstream REST client.

mod client;
mod endpoint;
mod normalize;

pub use client::{AnalyticsApi, AnalyticsClient};
pub use endpoint::{DEFAULT_BLOCKCHAIN, ENDPOINTS, EndpointName, EndpointSpec, UnknownEndpoint};
pub use normalize::{NormalizedRequest, ParamValue, RawParams, normalize, params_from_json};
