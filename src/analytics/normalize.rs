//! Query-parameter normalization for analytics endpoints.
//!
//! Input is a loose parameter bag where any value may be a scalar or a list.
//! Output keeps only the parameters the endpoint recognizes, applies its
//! defaults, validates `sort_by` against the allow-list and drops every
//! empty value. Nothing here fails: bad input degrades to an omitted
//! parameter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::endpoint::EndpointName;

/// A single query-parameter value. HTTP query strings allow repeated keys,
/// so any parameter may arrive as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Scalar value
    One(String),
    /// Repeated value
    Many(Vec<String>),
}

impl ParamValue {
    /// First value (lists collapse to their head)
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.first().map(String::as_str),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::One(s) => s.is_empty(),
            Self::Many(v) => v.iter().all(String::is_empty),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

/// Raw, unvalidated parameters
pub type RawParams = HashMap<String, ParamValue>;

/// Convert a JSON object of routed parameters into a raw bag.
///
/// Strings, numbers and booleans become scalars; arrays of those become
/// lists. Nulls and nested objects carry no usable value and are skipped.
#[must_use]
pub fn params_from_json(map: &Map<String, Value>) -> RawParams {
    map.iter()
        .filter_map(|(key, value)| {
            let param = match value {
                Value::Array(items) => {
                    ParamValue::Many(items.iter().filter_map(scalar_to_string).collect())
                }
                other => ParamValue::One(scalar_to_string(other)?),
            };
            Some((key.clone(), param))
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Clean parameters for one endpoint, ready for URL encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRequest {
    endpoint: EndpointName,
    params: Vec<(String, ParamValue)>,
}

impl NormalizedRequest {
    /// Build a request from already-clean parameters. Empty values are
    /// still removed.
    #[must_use]
    pub fn new(endpoint: EndpointName, params: Vec<(String, ParamValue)>) -> Self {
        let params = params.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        Self { endpoint, params }
    }

    /// Target endpoint
    #[must_use]
    pub fn endpoint(&self) -> EndpointName {
        self.endpoint
    }

    /// Look up a parameter
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Parameters in transmission order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters survived normalization
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Normalize `raw` for `endpoint`.
#[must_use]
pub fn normalize(endpoint: EndpointName, raw: &RawParams) -> NormalizedRequest {
    let spec = endpoint.spec();
    let mut params = Vec::with_capacity(spec.params.len() + 1);

    for &key in spec.params {
        let supplied = raw
            .get(key)
            .and_then(ParamValue::first)
            .filter(|v| !v.is_empty());
        if let Some(value) = supplied.or_else(|| spec.default_for(key)) {
            params.push((key.to_string(), ParamValue::from(value)));
        }
    }

    match raw.get("sort_by").and_then(ParamValue::first) {
        Some(sort_by) if spec.allows_sort_by(sort_by) => {
            params.push(("sort_by".to_string(), ParamValue::from(sort_by)));
        }
        Some(sort_by) => {
            tracing::debug!(endpoint = %endpoint, sort_by, "Dropping sort_by outside allow-list");
        }
        None => {}
    }

    NormalizedRequest::new(endpoint, params)
}
